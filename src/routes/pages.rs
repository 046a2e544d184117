//! Page routes. Each returns the JSON model its screen renders, or redirects.

use std::sync::Arc;

use axum::{
  extract::State,
  response::{IntoResponse, Redirect, Response},
  Json,
};
use tracing::instrument;

use crate::domain::{PracticeSettings, QuizMode, MAX_PRACTICE_QUESTIONS, MIN_PRACTICE_QUESTIONS};
use crate::logic::{home_suggestions, leaderboard};
use crate::protocol::*;
use crate::state::AppState;
use crate::storage::{ClientStorage, PRACTICE_SETTINGS_KEY};
use crate::theme::{ThemeProvider, ThemeState};

use super::extract::{Client, PageUser, HOME_URL, LOGIN_URL};

fn theme(storage: &ClientStorage) -> ThemeState {
  ThemeProvider::new(storage).current().into()
}

fn settings(storage: &ClientStorage) -> PracticeSettings {
  storage.load::<PracticeSettings>(PRACTICE_SETTINGS_KEY).unwrap_or_default()
}

pub async fn page_root(State(state): State<Arc<AppState>>, Client(storage): Client) -> Redirect {
  match state.auth.current_user(&storage) {
    Some(_) => Redirect::to(HOME_URL),
    None => Redirect::to(LOGIN_URL),
  }
}

fn auth_page(state: &AppState, storage: &ClientStorage, page: &'static str) -> Response {
  if state.auth.current_user(storage).is_some() {
    return Redirect::to(HOME_URL).into_response();
  }
  Json(AuthPage { page, theme: theme(storage) }).into_response()
}

pub async fn page_login(State(state): State<Arc<AppState>>, Client(storage): Client) -> Response {
  auth_page(&state, &storage, "login")
}

pub async fn page_signup(State(state): State<Arc<AppState>>, Client(storage): Client) -> Response {
  auth_page(&state, &storage, "signup")
}

#[instrument(level = "info", skip_all, fields(client = %page.storage.client_id()))]
pub async fn page_home(State(state): State<Arc<AppState>>, page: PageUser) -> Json<HomePage> {
  let suggested_words = home_suggestions(&state, &page.user).await;
  Json(HomePage { theme: theme(&page.storage), user: page.user, suggested_words })
}

fn quiz_page(state: &AppState, storage: &ClientStorage, mode: QuizMode) -> QuizPage {
  let timing = state.timing(mode);
  QuizPage {
    mode,
    time_limit_seconds: timing.time_limit_secs,
    auto_advance_ms: timing.auto_advance.map(|d| d.as_millis() as u64),
    settings: (mode == QuizMode::Practice).then(|| settings(storage).clamped()),
    theme: theme(storage),
  }
}

pub async fn page_practice(State(state): State<Arc<AppState>>, page: PageUser) -> Json<QuizPage> {
  Json(quiz_page(&state, &page.storage, QuizMode::Practice))
}

pub async fn page_level_test(State(state): State<Arc<AppState>>, page: PageUser) -> Json<QuizPage> {
  Json(quiz_page(&state, &page.storage, QuizMode::LevelTest))
}

pub async fn page_practice_settings(page: PageUser) -> Json<PracticeSettingsPage> {
  Json(PracticeSettingsPage {
    settings: settings(&page.storage),
    min_questions: MIN_PRACTICE_QUESTIONS,
    max_questions: MAX_PRACTICE_QUESTIONS,
    theme: theme(&page.storage),
  })
}

pub async fn page_profile(page: PageUser) -> Json<ProfilePage> {
  Json(ProfilePage { theme: theme(&page.storage), user: page.user })
}

pub async fn page_progress(page: PageUser) -> Json<ProgressPage> {
  Json(ProgressPage { leaderboard: leaderboard(&page.user), theme: theme(&page.storage), user: page.user })
}
