//! Loading application configuration (prompts, quiz timing, storage, extra
//! practice questions) from TOML.
//!
//! See `AppConfig` and `Prompts` for the expected schema. Every section is
//! optional; missing values fall back to defaults.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{AnswerOption, Question, QuestionType};
use crate::quiz::DEFAULT_TIME_LIMIT_SECS;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub quiz: QuizConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub vocabulary: VocabularyConfig,
  #[serde(default)]
  pub questions_api: QuestionsApiConfig,
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuizConfig {
  #[serde(default = "default_time_limit")]
  pub level_test_time_limit_secs: u32,
  #[serde(default = "default_time_limit")]
  pub practice_time_limit_secs: u32,
  /// Delay before moving on after feedback in level-test mode. 0 disables it.
  #[serde(default = "default_auto_advance_ms")]
  pub level_test_auto_advance_ms: u64,
  /// Same for practice; practice waits for an explicit "next" by default.
  #[serde(default)]
  pub practice_auto_advance_ms: u64,
}

fn default_time_limit() -> u32 { DEFAULT_TIME_LIMIT_SECS }
fn default_auto_advance_ms() -> u64 { 1500 }

impl Default for QuizConfig {
  fn default() -> Self {
    Self {
      level_test_time_limit_secs: default_time_limit(),
      practice_time_limit_secs: default_time_limit(),
      level_test_auto_advance_ms: default_auto_advance_ms(),
      practice_auto_advance_ms: 0,
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StorageConfig {
  /// JSON file backing client storage; in-memory when absent.
  #[serde(default)]
  pub path: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct VocabularyConfig {
  /// Use the AI suggester instead of the placeholder list (requires OPENAI_API_KEY).
  #[serde(default)]
  pub use_ai: bool,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuestionsApiConfig {
  /// Base URL of an external backend serving /api/practice/generate-questions.
  #[serde(default)]
  pub base_url: Option<String>,
}

/// Practice question accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub text: String,
  pub options: Vec<String>,
  pub correct: String,
  #[serde(default)] pub translation: Option<String>,
  #[serde(default)] pub explanation: Option<String>,
}

impl QuestionCfg {
  pub fn into_question(self) -> Result<Question, String> {
    let options = self
      .options
      .iter()
      .map(|o| AnswerOption { text: o.clone(), is_correct: *o == self.correct })
      .collect();
    let mut q = Question::new(self.id, self.kind, self.text, options)?;
    q.translation = self.translation;
    q.explanation = self.explanation;
    Ok(q)
  }
}

/// Prompts used by the OpenAI client. You can override them in TOML to tune
/// tone or structure.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Placement test grading
  pub level_test_system: String,
  pub level_test_user_template: String,
  // Vocabulary suggestions
  pub vocabulary_system: String,
  pub vocabulary_user_template: String,
  // Practice question generation
  pub questions_system: String,
  pub questions_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      level_test_system: "You are an English placement examiner for Spanish speakers. Respond ONLY with strict JSON.".into(),
      level_test_user_template: "Grade this placement test. For each question award 2 points if it was answered correctly on the first attempt, 1 point if correct on the second attempt, 0 otherwise.\nAnswers (JSON): {answers_json}\nReturn JSON {\"level\": \"Novato\"|\"Intermedio\"|\"Experto\", \"score\": number, \"summary\": string}. Write the summary in Spanish, at most 3 sentences.".into(),
      vocabulary_system: "You are a vocabulary coach. Respond ONLY with strict JSON.".into(),
      vocabulary_user_template: "Suggest {count} English words for a learner at level '{level}' with these goals: {goals}. Return JSON {\"suggestedWords\": [string]}.".into(),
      questions_system: "You write multiple-choice language exercises. Respond ONLY with strict JSON.".into(),
      questions_user_template: "Create {count} {question_type} questions in {language} for level '{level}' about '{topic}'. Return JSON {\"questions\": [{\"id\": string, \"type\": \"vocabulary\"|\"grammar\", \"text\": string, \"options\": [string], \"correctAnswer\": string, \"translation\": string, \"explanation\": string}]}. Exactly one option must equal correctAnswer.".into(),
    }
  }
}

/// Attempt to load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "vocab_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "vocab_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "vocab_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_partial_config_with_defaults() {
    let cfg: AppConfig = toml::from_str(
      r#"
        [quiz]
        level_test_time_limit_secs = 120

        [vocabulary]
        use_ai = true

        [[questions]]
        id = "cfg-1"
        type = "vocabulary"
        text = "Pick the word for \"perro\""
        options = ["Dog", "Cat"]
        correct = "Dog"
        translation = "perro = dog"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.quiz.level_test_time_limit_secs, 120);
    assert_eq!(cfg.quiz.practice_time_limit_secs, DEFAULT_TIME_LIMIT_SECS);
    assert_eq!(cfg.quiz.level_test_auto_advance_ms, 1500);
    assert!(cfg.vocabulary.use_ai);
    assert!(cfg.prompts.level_test_user_template.contains("{answers_json}"));

    let q = cfg.questions.into_iter().next().unwrap().into_question().unwrap();
    assert_eq!(q.correct_text(), "Dog");
    assert_eq!(q.max_attempts(), 2);
  }

  #[test]
  fn config_question_needs_matching_correct_option() {
    let cfg = QuestionCfg {
      id: "x".into(),
      kind: QuestionType::Grammar,
      text: "?".into(),
      options: vec!["a".into(), "b".into()],
      correct: "c".into(),
      translation: None,
      explanation: None,
    };
    assert!(cfg.into_question().is_err());
  }
}
