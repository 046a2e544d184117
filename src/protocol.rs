//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::analysis::LevelTestReport;
use crate::domain::{PracticeSettings, QuizMode, UserProfile};
use crate::questions::QuestionOrigin;
use crate::quiz::{AnswerOutcome, QuizView};
use crate::theme::ThemeState;

/// Messages the client can send over the quiz WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Start,
    Answer {
        #[serde(rename = "selectedOption", default)]
        selected_option: Option<String>,
    },
    Next,
}

/// Messages the server sends over the quiz WebSocket. `State` is pushed on
/// every session change; the others answer a client message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    State {
        quiz: QuizView,
    },
    AnswerResult {
        #[serde(flatten)]
        outcome: AnswerOutcome,
    },
    Error {
        message: String,
    },
}

// --- HTTP DTOs ---

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct SignupIn {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionOut {
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct ThemeIn {
    pub theme: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateIn {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub learning_goals: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuizIn {
    pub mode: QuizMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizCreatedOut {
    pub quiz: QuizView,
    pub source: QuestionOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
    #[serde(default)]
    pub selected_option: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswerOut {
    #[serde(flatten)]
    pub outcome: AnswerOutcome,
    pub quiz: QuizView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeIn {
    pub quiz_id: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub name: String,
    pub xp: u32,
    pub level: u32,
    pub is_current_user: bool,
}

// --- Page models ---

/// Where a public page sends a visitor who is already signed in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPage {
    pub page: &'static str,
    pub theme: ThemeState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub user: UserProfile,
    pub suggested_words: Vec<String>,
    pub theme: ThemeState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSettingsPage {
    pub settings: PracticeSettings,
    pub min_questions: u32,
    pub max_questions: u32,
    pub theme: ThemeState,
}

/// Quiz pages describe the quiz the client should create, plus its timing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPage {
    pub mode: QuizMode,
    pub time_limit_seconds: u32,
    pub auto_advance_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<PracticeSettings>,
    pub theme: ThemeState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePage {
    pub user: UserProfile,
    pub theme: ThemeState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPage {
    pub user: UserProfile,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub theme: ThemeState,
}

/// Level-test result as shown to the user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelTestOut {
    #[serde(flatten)]
    pub report: LevelTestReport,
    pub user: UserProfile,
}
