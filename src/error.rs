//! HTTP-boundary error type. Handlers return `Result<_, AppError>`; everything
//! below the routes keeps plain `Result<_, String>` or domain errors.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use tracing::error;

use crate::quiz::QuizError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("Not signed in")]
  Unauthorized,
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Conflict(String),
  #[error("{0}")]
  Upstream(String),
  #[error("storage error: {0}")]
  Storage(String),
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::Unauthorized => StatusCode::UNAUTHORIZED,
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
      AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub fn quiz_not_found(id: &str) -> Self {
    AppError::NotFound(format!("Unknown quiz: {id}"))
  }
}

impl From<QuizError> for AppError {
  fn from(e: QuizError) -> Self {
    match e {
      QuizError::NoSelection | QuizError::UnknownOption(_) => AppError::BadRequest(e.to_string()),
      QuizError::NoQuestions | QuizError::NotStarted | QuizError::AlreadyStarted => AppError::Conflict(e.to_string()),
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "vocab_backend", %status, error = %self, "Request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
