//! Router assembly: pages, JSON API, quiz WebSocket, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::questions::GENERATE_QUESTIONS_PATH;
use crate::state::AppState;

pub mod extract;
pub mod http;
pub mod pages;
pub mod ws;

/// Build the application router with:
/// - page models at `/`, `/login`, `/home`, ... (protected ones redirect to `/login`)
/// - JSON API under `/api/v1/...` (protected ones answer 401)
/// - question generation at `/api/practice/generate-questions`
/// - quiz WebSocket at `/ws/quiz/:id`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // Pages
        .route("/", get(pages::page_root))
        .route("/login", get(pages::page_login))
        .route("/signup", get(pages::page_signup))
        .route("/home", get(pages::page_home))
        .route("/practice", get(pages::page_practice))
        .route("/practice-settings", get(pages::page_practice_settings))
        .route("/level-test", get(pages::page_level_test))
        .route("/profile", get(pages::page_profile))
        .route("/progress", get(pages::page_progress))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/auth/signup", post(http::http_signup))
        .route("/api/v1/auth/login", post(http::http_login))
        .route("/api/v1/auth/logout", post(http::http_logout))
        .route("/api/v1/auth/me", get(http::http_me))
        .route("/api/v1/theme", get(http::http_get_theme).put(http::http_put_theme))
        .route(
            "/api/v1/practice-settings",
            get(http::http_get_practice_settings).put(http::http_put_practice_settings),
        )
        .route("/api/v1/profile", get(http::http_get_profile).put(http::http_put_profile))
        .route("/api/v1/quiz", post(http::http_create_quiz))
        .route("/api/v1/quiz/:id", get(http::http_get_quiz).delete(http::http_delete_quiz))
        .route("/api/v1/quiz/:id/start", post(http::http_start_quiz))
        .route("/api/v1/quiz/:id/answer", post(http::http_answer))
        .route("/api/v1/quiz/:id/next", post(http::http_next))
        .route("/api/v1/quiz/:id/result", get(http::http_quiz_result))
        .route("/api/v1/level-test/analyze", post(http::http_analyze_level_test))
        .route("/api/v1/vocabulary/suggestions", post(http::http_vocabulary_suggestions))
        .route(GENERATE_QUESTIONS_PATH, post(http::http_generate_questions))
        // WebSocket
        .route("/ws/quiz/:id", get(ws::ws_quiz_upgrade))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
