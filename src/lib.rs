//! Vocabulary trainer backend: quiz sessions with a server-side countdown,
//! mock auth, themes, practice settings and AI-assisted level tests and
//! vocabulary suggestions, all over HTTP + WebSocket.

pub mod analysis;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod logic;
pub mod openai;
pub mod protocol;
pub mod questions;
pub mod quiz;
pub mod routes;
pub mod runner;
pub mod seeds;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod theme;
pub mod util;
pub mod vocabulary;

pub use routes::build_router;
pub use state::AppState;
