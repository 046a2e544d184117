//! HTTP API handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::auth::Credentials;
use crate::domain::{PracticeSettings, UserProfile};
use crate::error::AppError;
use crate::logic::{analyze_level_test, create_quiz, quiz_result};
use crate::protocol::*;
use crate::questions::{GenerateQuestionsIn, GenerateQuestionsOut, QuestionOrigin};
use crate::quiz::{QuizResult, QuizView};
use crate::runner::QuizHandle;
use crate::state::AppState;
use crate::storage::{ClientStorage, PRACTICE_SETTINGS_KEY};
use crate::theme::{Theme, ThemeProvider, ThemeState};
use crate::vocabulary::{suggest_or_fallback, SuggestionRequest, SuggestionResponse};

use super::extract::{Client, SessionUser};

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

// --- Auth ---

fn sign_in(state: &AppState, storage: &ClientStorage, creds: Credentials) -> Result<Json<SessionOut>, AppError> {
  let user = state.auth.sign_in(storage, &creds).map_err(AppError::BadRequest)?;
  Ok(Json(SessionOut { user }))
}

#[instrument(level = "info", skip(state, storage, body), fields(client = %storage.client_id()))]
pub async fn http_signup(
  State(state): State<Arc<AppState>>,
  Client(storage): Client,
  Json(body): Json<SignupIn>,
) -> Result<Json<SessionOut>, AppError> {
  if body.name.trim().is_empty() {
    return Err(AppError::BadRequest("El nombre no puede estar vacío".into()));
  }
  sign_in(&state, &storage, Credentials { name: Some(body.name), email: body.email, password: body.password })
}

#[instrument(level = "info", skip(state, storage, body), fields(client = %storage.client_id()))]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  Client(storage): Client,
  Json(body): Json<LoginIn>,
) -> Result<Json<SessionOut>, AppError> {
  sign_in(&state, &storage, Credentials { name: None, email: body.email, password: body.password })
}

#[instrument(level = "info", skip(state, storage), fields(client = %storage.client_id()))]
pub async fn http_logout(
  State(state): State<Arc<AppState>>,
  Client(storage): Client,
) -> Result<StatusCode, AppError> {
  state.auth.sign_out(&storage).map_err(AppError::Storage)?;
  Ok(StatusCode::NO_CONTENT)
}

pub async fn http_me(session: SessionUser) -> Json<SessionOut> {
  Json(SessionOut { user: session.user })
}

// --- Theme & settings ---

pub async fn http_get_theme(Client(storage): Client) -> Json<ThemeState> {
  Json(ThemeProvider::new(&storage).current().into())
}

#[instrument(level = "info", skip(storage), fields(client = %storage.client_id(), theme = %body.theme))]
pub async fn http_put_theme(Client(storage): Client, Json(body): Json<ThemeIn>) -> Result<Json<ThemeState>, AppError> {
  let theme = Theme::parse(&body.theme)
    .ok_or_else(|| AppError::BadRequest(format!("Unknown theme: {}", body.theme)))?;
  let theme = ThemeProvider::new(&storage).set(theme).map_err(AppError::Storage)?;
  Ok(Json(theme.into()))
}

pub async fn http_get_practice_settings(Client(storage): Client) -> Json<PracticeSettings> {
  Json(storage.load::<PracticeSettings>(PRACTICE_SETTINGS_KEY).unwrap_or_default())
}

#[instrument(level = "info", skip(storage, body), fields(client = %storage.client_id(), n = body.num_questions))]
pub async fn http_put_practice_settings(
  Client(storage): Client,
  Json(body): Json<PracticeSettings>,
) -> Result<Json<PracticeSettings>, AppError> {
  if body.language.trim().is_empty() {
    return Err(AppError::BadRequest("language is required".into()));
  }
  let settings = body.clamped();
  storage.save(PRACTICE_SETTINGS_KEY, &settings).map_err(AppError::Storage)?;
  Ok(Json(settings))
}

// --- Profile ---

pub async fn http_get_profile(session: SessionUser) -> Json<UserProfile> {
  Json(session.user)
}

#[instrument(level = "info", skip_all, fields(client = %session.storage.client_id()))]
pub async fn http_put_profile(
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Json(body): Json<ProfileUpdateIn>,
) -> Result<Json<UserProfile>, AppError> {
  let SessionUser { storage, mut user } = session;
  if let Some(name) = body.name {
    let name = name.trim();
    if name.is_empty() {
      return Err(AppError::BadRequest("El nombre no puede estar vacío".into()));
    }
    user.name = name.to_string();
  }
  if let Some(url) = body.avatar_url {
    user.avatar_url = url;
  }
  if let Some(goals) = body.learning_goals {
    user.learning_goals = goals.into_iter().map(|g| g.trim().to_string()).filter(|g| !g.is_empty()).collect();
  }
  state.auth.update_profile(&storage, &user).map_err(AppError::Storage)?;
  info!(target: "vocab_backend", user = %user.id, "Profile updated");
  Ok(Json(user))
}

// --- Quiz ---

async fn find_quiz(state: &AppState, storage: &ClientStorage, id: &str) -> Result<Arc<QuizHandle>, AppError> {
  state.quizzes.get(id, storage.client_id()).await.ok_or_else(|| AppError::quiz_not_found(id))
}

#[instrument(level = "info", skip(state, session), fields(client = %session.storage.client_id(), mode = ?body.mode))]
pub async fn http_create_quiz(
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Json(body): Json<CreateQuizIn>,
) -> Result<(StatusCode, Json<QuizCreatedOut>), AppError> {
  let out = create_quiz(&state, &session.storage, body.mode).await?;
  Ok((StatusCode::CREATED, Json(out)))
}

pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Path(id): Path<String>,
) -> Result<Json<QuizView>, AppError> {
  let handle = find_quiz(&state, &session.storage, &id).await?;
  Ok(Json(handle.view().await))
}

#[instrument(level = "info", skip(state, session), fields(client = %session.storage.client_id()))]
pub async fn http_delete_quiz(
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
  if state.quizzes.remove(&id, session.storage.client_id()).await {
    info!(target: "quiz", %id, "Quiz removed");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(AppError::quiz_not_found(&id))
  }
}

#[instrument(level = "info", skip(state, session), fields(client = %session.storage.client_id()))]
pub async fn http_start_quiz(
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Path(id): Path<String>,
) -> Result<Json<QuizView>, AppError> {
  let handle = find_quiz(&state, &session.storage, &id).await?;
  Ok(Json(handle.start().await?))
}

#[instrument(level = "info", skip(state, session, body), fields(client = %session.storage.client_id(), selected = ?body.selected_option))]
pub async fn http_answer(
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>, AppError> {
  let handle = find_quiz(&state, &session.storage, &id).await?;
  let (outcome, quiz) = handle.submit(body.selected_option).await?;
  Ok(Json(AnswerOut { outcome, quiz }))
}

pub async fn http_next(
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Path(id): Path<String>,
) -> Result<Json<QuizView>, AppError> {
  let handle = find_quiz(&state, &session.storage, &id).await?;
  Ok(Json(handle.next().await))
}

#[instrument(level = "info", skip(state, session), fields(client = %session.storage.client_id()))]
pub async fn http_quiz_result(
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Path(id): Path<String>,
) -> Result<Json<QuizResult>, AppError> {
  let handle = find_quiz(&state, &session.storage, &id).await?;
  Ok(Json(quiz_result(&state, &session.storage, &handle).await?))
}

// --- Collaborator endpoints ---

#[instrument(level = "info", skip(state, session, body), fields(quiz = %body.quiz_id))]
pub async fn http_analyze_level_test(
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Json(body): Json<AnalyzeIn>,
) -> Result<Json<LevelTestOut>, AppError> {
  let SessionUser { storage, user } = session;
  Ok(Json(analyze_level_test(&state, &storage, user, &body.quiz_id).await?))
}

pub async fn http_vocabulary_suggestions(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SuggestionRequest>,
) -> Json<SuggestionResponse> {
  Json(suggest_or_fallback(state.suggester.as_ref(), body).await)
}

/// Invalid requests come back with `source: error` and a 400.
#[instrument(level = "info", skip(state, body), fields(count = body.question_count, kind = ?body.question_type))]
pub async fn http_generate_questions(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateQuestionsIn>,
) -> (StatusCode, Json<GenerateQuestionsOut>) {
  let out = state.questions.generate(&body).await;
  let status = match out.source {
    QuestionOrigin::Error => StatusCode::BAD_REQUEST,
    _ => StatusCode::OK,
  };
  info!(target: "collaborator", source = ?out.source, questions = out.questions.len(), "Questions served");
  (status, Json(out))
}
