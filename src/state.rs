//! Application state: config, client storage, auth provider, AI collaborators
//! and the registry of running quizzes.
//!
//! This module owns:
//!   - the key/value store behind per-client "local storage"
//!   - the question banks (level test, practice extras from TOML)
//!   - the collaborator seams (analyzer, suggester, question source)
//!   - optional OpenAI client, shared by the AI-backed collaborators
//!
//! Without OPENAI_API_KEY every collaborator has a local stand-in, so the whole
//! app works offline.

use std::{sync::Arc, time::Duration};

use tracing::{error, info, instrument, warn};

use crate::analysis::{LevelTestAnalyzer, OpenAiLevelAnalyzer, UnavailableAnalyzer};
use crate::auth::{AuthProvider, MockAuth};
use crate::config::{load_app_config_from_env, AppConfig};
use crate::domain::{Question, QuizMode};
use crate::openai::OpenAI;
use crate::questions::{HttpQuestionSource, LocalQuestionSource, QuestionSource};
use crate::runner::QuizRegistry;
use crate::seeds::{level_test_questions, practice_bank};
use crate::storage::{ClientStorage, FileStore, KeyValueStore, MemoryStore};
use crate::vocabulary::{OpenAiSuggester, StaticSuggester, VocabularySuggester};

/// Timing applied to a new quiz of a given mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuizTiming {
    pub time_limit_secs: u32,
    pub auto_advance: Option<Duration>,
}

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub analyzer: Arc<dyn LevelTestAnalyzer>,
    pub suggester: Arc<dyn VocabularySuggester>,
    pub questions: Arc<dyn QuestionSource>,
    pub quizzes: Arc<QuizRegistry>,
    pub level_test_bank: Vec<Question>,
}

impl AppState {
    /// Build state from env: load config, open storage, init OpenAI and pick
    /// the question source (remote when QUESTION_API_URL is set).
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let config = load_app_config_from_env().unwrap_or_default();

        let storage_path = std::env::var("STORAGE_PATH").ok().or_else(|| config.storage.path.clone());
        let store: Arc<dyn KeyValueStore> = match storage_path {
            Some(path) => {
                info!(target: "vocab_backend", %path, "Client storage backed by file");
                Arc::new(FileStore::open(path))
            }
            None => {
                info!(target: "vocab_backend", "Client storage in memory (lost on restart)");
                Arc::new(MemoryStore::new())
            }
        };

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "vocab_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        } else {
            info!(target: "vocab_backend", "OpenAI disabled (no OPENAI_API_KEY). Using local fallbacks.");
        }

        let remote_url = std::env::var("QUESTION_API_URL")
            .ok()
            .or_else(|| config.questions_api.base_url.clone());

        let mut state = Self::new(config, store, openai);
        if let Some(url) = remote_url {
            match HttpQuestionSource::new(&url) {
                Ok(source) => {
                    info!(target: "vocab_backend", %url, "Practice questions served by remote endpoint");
                    state.questions = Arc::new(source);
                }
                Err(e) => {
                    error!(target: "vocab_backend", %url, error = %e, "Could not build remote question client; using local source");
                }
            }
        }
        state
    }

    /// State with explicit config and store. Collaborators are AI-backed when
    /// `openai` is given, local otherwise.
    pub fn new(config: AppConfig, store: Arc<dyn KeyValueStore>, openai: Option<OpenAI>) -> Self {
        let mut bank = practice_bank();
        for cfg in config.questions.iter().cloned() {
            let id = cfg.id.clone();
            match cfg.into_question() {
                Ok(q) if bank.iter().any(|b| b.id == q.id) => {
                    warn!(target: "vocab_backend", %id, "Skipping config question: duplicate id");
                }
                Ok(q) => bank.push(q),
                Err(e) => {
                    error!(target: "vocab_backend", %id, error = %e, "Skipping invalid config question");
                }
            }
        }
        info!(target: "vocab_backend", practice = bank.len(), "Practice bank ready");

        let analyzer: Arc<dyn LevelTestAnalyzer> = match &openai {
            Some(oa) => Arc::new(OpenAiLevelAnalyzer::new(oa.clone(), config.prompts.clone())),
            None => Arc::new(UnavailableAnalyzer),
        };
        let suggester: Arc<dyn VocabularySuggester> = match (&openai, config.vocabulary.use_ai) {
            (Some(oa), true) => Arc::new(OpenAiSuggester::new(oa.clone(), config.prompts.clone())),
            (None, true) => {
                warn!(target: "vocab_backend", "vocabulary.use_ai is set but OpenAI is disabled; using placeholder list");
                Arc::new(StaticSuggester)
            }
            _ => Arc::new(StaticSuggester),
        };
        let questions: Arc<dyn QuestionSource> =
            Arc::new(LocalQuestionSource::new(openai, config.prompts.clone(), bank));

        Self {
            config,
            store,
            auth: Arc::new(MockAuth),
            analyzer,
            suggester,
            questions,
            quizzes: Arc::new(QuizRegistry::default()),
            level_test_bank: level_test_questions(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn LevelTestAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_question_source(mut self, questions: Arc<dyn QuestionSource>) -> Self {
        self.questions = questions;
        self
    }

    pub fn storage_for(&self, client_id: &str) -> ClientStorage {
        ClientStorage::new(self.store.clone(), client_id)
    }

    pub fn timing(&self, mode: QuizMode) -> QuizTiming {
        let q = &self.config.quiz;
        let (time_limit_secs, ms) = match mode {
            QuizMode::LevelTest => (q.level_test_time_limit_secs, q.level_test_auto_advance_ms),
            QuizMode::Practice => (q.practice_time_limit_secs, q.practice_auto_advance_ms),
        };
        QuizTiming {
            time_limit_secs,
            auto_advance: (ms > 0).then(|| Duration::from_millis(ms)),
        }
    }
}
