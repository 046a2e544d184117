//! Page flows shared by HTTP and WebSocket handlers.
//!
//! This includes:
//!   - creating quizzes (level test from the seed set, practice from saved settings)
//!   - crediting a finished quiz to the signed-in profile, once
//!   - level-test analysis with the local fallback
//!   - home suggestions and the progress leaderboard

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::analysis::analyze_with_fallback;
use crate::domain::{level_for_xp, PracticeSettings, QuizMode, UserProfile};
use crate::error::AppError;
use crate::protocol::{LeaderboardEntry, LevelTestOut, QuizCreatedOut};
use crate::questions::{GenerateQuestionsIn, QuestionOrigin};
use crate::quiz::{QuizResult, QuizSession};
use crate::runner::QuizHandle;
use crate::seeds::mock_leaderboard;
use crate::state::AppState;
use crate::storage::{ClientStorage, PRACTICE_SETTINGS_KEY};
use crate::vocabulary::{suggest_or_fallback, SuggestionRequest, DEFAULT_SUGGESTIONS};

#[instrument(level = "info", skip_all, fields(client = %storage.client_id(), mode = ?mode))]
pub async fn create_quiz(state: &AppState, storage: &ClientStorage, mode: QuizMode) -> Result<QuizCreatedOut, AppError> {
  let (questions, source, warning) = match mode {
    QuizMode::LevelTest => (state.level_test_bank.clone(), QuestionOrigin::Mock, None),
    QuizMode::Practice => {
      let settings = storage.load::<PracticeSettings>(PRACTICE_SETTINGS_KEY).unwrap_or_default().clamped();
      let req = GenerateQuestionsIn::from(&settings);
      let out = state.questions.generate(&req).await;
      match out.source {
        QuestionOrigin::Error => {
          let msg = out.message.unwrap_or_else(|| "question generation failed".into());
          return Err(AppError::Upstream(msg));
        }
        QuestionOrigin::Mock => {
          warn!(target: "quiz", message = ?out.message, "Practice quiz uses sample questions");
          (out.questions, QuestionOrigin::Mock, out.message)
        }
        QuestionOrigin::Api => (out.questions, QuestionOrigin::Api, None),
      }
    }
  };

  let timing = state.timing(mode);
  let id = Uuid::new_v4().to_string();
  let session = QuizSession::new(id.clone(), mode, questions, timing.time_limit_secs);
  let handle = QuizHandle::new(storage.client_id(), session, timing.auto_advance);
  let quiz = handle.view().await;
  state.quizzes.insert(handle).await;
  info!(target: "quiz", %id, ?mode, questions = quiz.total_questions, "Quiz created");
  Ok(QuizCreatedOut { quiz, source, warning })
}

/// Add a finished quiz's score to the profile. Only the first call per quiz
/// changes anything.
async fn credit_once(state: &AppState, storage: &ClientStorage, handle: &QuizHandle) -> Result<Option<UserProfile>, AppError> {
  let Some(result) = handle.take_unreported_result().await else { return Ok(None) };
  let Some(mut user) = state.auth.current_user(storage) else { return Ok(None) };
  user.record_quiz(result.score, result.correct_count);
  state.auth.update_profile(storage, &user).map_err(AppError::Storage)?;
  info!(target: "quiz", quiz = %handle.id(), score = result.score, xp = user.xp, "Quiz credited to profile");
  Ok(Some(user))
}

pub async fn quiz_result(state: &AppState, storage: &ClientStorage, handle: &Arc<QuizHandle>) -> Result<QuizResult, AppError> {
  let result = handle
    .result()
    .await
    .ok_or_else(|| AppError::Conflict("the quiz is not completed yet".into()))?;
  credit_once(state, storage, handle).await?;
  Ok(result)
}

#[instrument(level = "info", skip_all, fields(client = %storage.client_id(), quiz = %quiz_id))]
pub async fn analyze_level_test(
  state: &AppState,
  storage: &ClientStorage,
  user: UserProfile,
  quiz_id: &str,
) -> Result<LevelTestOut, AppError> {
  let handle = state
    .quizzes
    .get(quiz_id, storage.client_id())
    .await
    .ok_or_else(|| AppError::quiz_not_found(quiz_id))?;
  let result = handle
    .result()
    .await
    .ok_or_else(|| AppError::Conflict("the level test is not completed yet".into()))?;
  if result.mode != QuizMode::LevelTest {
    return Err(AppError::BadRequest("only level tests can be analyzed".into()));
  }

  let answers = result.answers.clone().unwrap_or_default();
  let report = analyze_with_fallback(state.analyzer.as_ref(), &answers, result.score, result.max_score).await;

  let mut user = credit_once(state, storage, &handle).await?.unwrap_or(user);
  user.current_vocabulary_level = report.level;
  state.auth.update_profile(storage, &user).map_err(AppError::Storage)?;
  info!(target: "quiz", level = %report.level, fallback = report.fallback, score = report.score, "Level test graded");
  Ok(LevelTestOut { report, user })
}

pub async fn home_suggestions(state: &AppState, user: &UserProfile) -> Vec<String> {
  let req = SuggestionRequest {
    user_level: user.current_vocabulary_level.to_string(),
    learning_goals: user.learning_goals.clone(),
    number_of_suggestions: DEFAULT_SUGGESTIONS,
  };
  suggest_or_fallback(state.suggester.as_ref(), req).await.suggested_words
}

/// Mock learners plus the current user, by xp descending, ranked from 1.
pub fn leaderboard(user: &UserProfile) -> Vec<LeaderboardEntry> {
  let mut entries: Vec<LeaderboardEntry> = mock_leaderboard()
    .into_iter()
    .map(|(name, xp)| LeaderboardEntry { rank: 0, name: name.to_string(), xp, level: level_for_xp(xp), is_current_user: false })
    .collect();
  entries.push(LeaderboardEntry {
    rank: 0,
    name: user.name.clone(),
    xp: user.xp,
    level: user.level,
    is_current_user: true,
  });
  // Stable sort: on ties the mock learner stays ahead.
  entries.sort_by(|a, b| b.xp.cmp(&a.xp));
  for (i, e) in entries.iter_mut().enumerate() {
    e.rank = i as u32 + 1;
  }
  entries
}
