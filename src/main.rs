//! Vocabulary Trainer Backend
//!
//! - Axum HTTP + WebSocket API
//! - Optional OpenAI integration (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables OpenAI integration if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_FAST_MODEL   : default "gpt-4o-mini"
//!   OPENAI_STRONG_MODEL : default "gpt-4o"
//!   APP_CONFIG_PATH     : path to TOML config (prompts, quiz timing, extra questions)
//!   STORAGE_PATH        : JSON file for client storage (in-memory if unset)
//!   QUESTION_API_URL    : remote backend serving /api/practice/generate-questions
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{info, warn};

use vocab_backend::{build_router, telemetry, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::from_env());
  let app = build_router(state.clone());
  let janitor = state.quizzes.spawn_janitor(Duration::from_secs(60));

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "vocab_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  janitor.abort();
  info!(target: "vocab_backend", running_quizzes = state.quizzes.len().await, "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "vocab_backend", error = %e, "Could not listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "vocab_backend", "Shutdown requested");
}
