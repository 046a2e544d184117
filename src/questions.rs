//! Practice question generation.
//!
//! The wire contract is `POST /api/practice/generate-questions` returning
//! `{source: api|mock|error, questions, message?}`. We serve it ourselves
//! (`LocalQuestionSource`) and can also consume an external backend exposing the
//! same endpoint (`HttpQuestionSource`).
//!
//! Question payloads from an API come in several shapes (plain string options
//! with `correctOptionId`/`correctAnswer`, `{id, text}` options, `{text,
//! isCorrect}` options). `normalize` maps all of them to the canonical
//! `Question` with a boolean `isCorrect` per option.

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{
  AnswerOption, PracticeQuestionType, PracticeSettings, Question, QuestionType, MAX_PRACTICE_QUESTIONS,
  MIN_PRACTICE_QUESTIONS,
};
use crate::openai::OpenAI;

pub const GENERATE_QUESTIONS_PATH: &str = "/api/practice/generate-questions";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsIn {
  pub language: String,
  pub level: String,
  pub topic: String,
  pub question_count: u32,
  #[serde(default)]
  pub question_type: PracticeQuestionType,
}

impl From<&PracticeSettings> for GenerateQuestionsIn {
  fn from(s: &PracticeSettings) -> Self {
    Self {
      language: s.language.clone(),
      level: s.level.clone(),
      topic: s.topic.clone(),
      question_count: s.num_questions,
      question_type: s.question_type,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionOrigin {
  Api,
  Mock,
  Error,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct GenerateQuestionsOut {
  pub source: QuestionOrigin,
  pub questions: Vec<Question>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl GenerateQuestionsOut {
  pub fn error(message: impl Into<String>) -> Self {
    Self { source: QuestionOrigin::Error, questions: Vec::new(), message: Some(message.into()) }
  }
}

// --- API question shapes ---

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OptionKey {
  Text(String),
  Index(u64),
}

impl OptionKey {
  fn matches(&self, position: usize, key: Option<&OptionKey>) -> bool {
    match (self, key) {
      (wanted, Some(k)) => wanted == k,
      (OptionKey::Index(i), None) => *i as usize == position,
      (OptionKey::Text(s), None) => s.trim().parse::<usize>().map(|i| i == position).unwrap_or(false),
    }
  }

  fn render(&self) -> String {
    match self {
      OptionKey::Text(s) => s.clone(),
      OptionKey::Index(i) => i.to_string(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiOption {
  Flagged {
    text: String,
    #[serde(rename = "isCorrect")]
    is_correct: bool,
  },
  Keyed {
    id: OptionKey,
    text: String,
  },
  Text(String),
}

impl ApiOption {
  fn text(&self) -> &str {
    match self {
      ApiOption::Flagged { text, .. } | ApiOption::Keyed { text, .. } | ApiOption::Text(text) => text,
    }
  }

  fn key(&self) -> Option<&OptionKey> {
    match self {
      ApiOption::Keyed { id, .. } => Some(id),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiQuestion {
  #[serde(default)]
  pub id: Option<OptionKey>,
  #[serde(default, rename = "type")]
  pub kind: Option<QuestionType>,
  #[serde(alias = "question")]
  pub text: String,
  pub options: Vec<ApiOption>,
  #[serde(default)]
  pub correct_option_id: Option<OptionKey>,
  #[serde(default)]
  pub correct_answer: Option<String>,
  #[serde(default)]
  pub translation: Option<String>,
  #[serde(default)]
  pub explanation: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Map one API question to the canonical model. `position` names questions
/// that arrive without an id; `fallback_kind` types the untyped ones.
pub fn normalize(api: ApiQuestion, position: usize, fallback_kind: QuestionType) -> Result<Question, String> {
  let id = api.id.as_ref().map(OptionKey::render).unwrap_or_else(|| format!("gen-{}", position + 1));
  let flagged = api.options.iter().any(|o| matches!(o, ApiOption::Flagged { .. }));

  let options: Vec<AnswerOption> = api
    .options
    .iter()
    .enumerate()
    .map(|(i, o)| {
      let is_correct = if flagged {
        matches!(o, ApiOption::Flagged { is_correct: true, .. })
      } else if let Some(wanted) = &api.correct_option_id {
        wanted.matches(i, o.key())
      } else if let Some(answer) = &api.correct_answer {
        o.text().trim().eq_ignore_ascii_case(answer.trim())
      } else {
        false
      };
      AnswerOption { text: o.text().trim().to_string(), is_correct }
    })
    .collect();

  let mut q = Question::new(id, api.kind.unwrap_or(fallback_kind), api.text.trim(), options)?;
  q.translation = non_empty(api.translation);
  q.explanation = non_empty(api.explanation);
  Ok(q)
}

/// Normalize a batch, dropping (and logging) questions that do not resolve to
/// exactly one correct option.
pub fn normalize_all(api: Vec<ApiQuestion>, fallback_kind: QuestionType) -> Vec<Question> {
  api
    .into_iter()
    .enumerate()
    .filter_map(|(i, q)| match normalize(q, i, fallback_kind) {
      Ok(q) => Some(q),
      Err(e) => {
        warn!(target: "collaborator", error = %e, "Dropping malformed generated question");
        None
      }
    })
    .collect()
}

fn fallback_kind(t: PracticeQuestionType) -> QuestionType {
  match t {
    PracticeQuestionType::Grammar => QuestionType::Grammar,
    _ => QuestionType::Vocabulary,
  }
}

// --- Sources ---

pub trait QuestionSource: Send + Sync {
  fn generate<'a>(&'a self, req: &'a GenerateQuestionsIn) -> BoxFuture<'a, GenerateQuestionsOut>;
}

/// Generates with OpenAI when configured, otherwise draws from the built-in bank.
pub struct LocalQuestionSource {
  openai: Option<OpenAI>,
  prompts: Prompts,
  bank: Vec<Question>,
}

impl LocalQuestionSource {
  pub fn new(openai: Option<OpenAI>, prompts: Prompts, bank: Vec<Question>) -> Self {
    Self { openai, prompts, bank }
  }

  fn validate(req: &GenerateQuestionsIn) -> Result<(), String> {
    if req.language.trim().is_empty() {
      return Err("language is required".into());
    }
    if !(MIN_PRACTICE_QUESTIONS..=MAX_PRACTICE_QUESTIONS).contains(&req.question_count) {
      return Err(format!(
        "questionCount must be between {} and {}",
        MIN_PRACTICE_QUESTIONS, MAX_PRACTICE_QUESTIONS
      ));
    }
    Ok(())
  }

  fn mock(&self, req: &GenerateQuestionsIn, message: String) -> GenerateQuestionsOut {
    let mut picked: Vec<Question> =
      self.bank.iter().filter(|q| req.question_type.accepts(q.kind)).cloned().collect();
    picked.shuffle(&mut rand::thread_rng());
    picked.truncate(req.question_count as usize);
    GenerateQuestionsOut { source: QuestionOrigin::Mock, questions: picked, message: Some(message) }
  }

  #[instrument(level = "info", skip(self), fields(count = req.question_count, ai = self.openai.is_some()))]
  async fn run(&self, req: &GenerateQuestionsIn) -> GenerateQuestionsOut {
    if let Err(e) = Self::validate(req) {
      warn!(target: "collaborator", error = %e, "Rejected question generation request");
      return GenerateQuestionsOut::error(e);
    }

    let Some(oa) = &self.openai else {
      return self.mock(req, "AI generation is not configured; using sample questions.".into());
    };

    match oa.generate_questions(&self.prompts, req).await {
      Ok(api) => {
        let mut questions = normalize_all(api, fallback_kind(req.question_type));
        questions.retain(|q| req.question_type.accepts(q.kind));
        questions.truncate(req.question_count as usize);
        if questions.is_empty() {
          error!(target: "collaborator", "AI returned no usable questions; using sample questions");
          return self.mock(req, "AI returned no usable questions; using sample questions.".into());
        }
        info!(target: "collaborator", generated = questions.len(), "Generated practice questions");
        GenerateQuestionsOut { source: QuestionOrigin::Api, questions, message: None }
      }
      Err(e) => {
        error!(target: "collaborator", error = %e, "AI question generation failed; using sample questions");
        self.mock(req, "AI generation failed; using sample questions.".into())
      }
    }
  }
}

impl QuestionSource for LocalQuestionSource {
  fn generate<'a>(&'a self, req: &'a GenerateQuestionsIn) -> BoxFuture<'a, GenerateQuestionsOut> {
    self.run(req).boxed()
  }
}

/// Client for an external backend serving the same endpoint.
pub struct HttpQuestionSource {
  client: reqwest::Client,
  base_url: String,
}

#[derive(Deserialize)]
struct RemoteOut {
  source: QuestionOrigin,
  #[serde(default)]
  questions: Vec<ApiQuestion>,
  #[serde(default)]
  message: Option<String>,
}

impl HttpQuestionSource {
  pub fn new(base_url: impl Into<String>) -> Result<Self, String> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| e.to_string())?;
    Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
  }

  #[instrument(level = "info", skip(self), fields(base_url = %self.base_url, count = req.question_count))]
  async fn run(&self, req: &GenerateQuestionsIn) -> GenerateQuestionsOut {
    let url = format!("{}{}", self.base_url, GENERATE_QUESTIONS_PATH);
    let res = match self.client.post(&url).json(req).send().await {
      Ok(r) => r,
      Err(e) => {
        error!(target: "collaborator", error = %e, "Question API unreachable");
        return GenerateQuestionsOut::error(format!("question API unreachable: {e}"));
      }
    };
    if !res.status().is_success() {
      let status = res.status();
      error!(target: "collaborator", %status, "Question API returned an error status");
      return GenerateQuestionsOut::error(format!("question API returned HTTP {status}"));
    }
    match res.json::<RemoteOut>().await {
      Ok(out) => GenerateQuestionsOut {
        source: out.source,
        questions: normalize_all(out.questions, fallback_kind(req.question_type)),
        message: out.message,
      },
      Err(e) => {
        error!(target: "collaborator", error = %e, "Question API returned a malformed body");
        GenerateQuestionsOut::error(format!("malformed question API response: {e}"))
      }
    }
  }
}

impl QuestionSource for HttpQuestionSource {
  fn generate<'a>(&'a self, req: &'a GenerateQuestionsIn) -> BoxFuture<'a, GenerateQuestionsOut> {
    self.run(req).boxed()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::practice_bank;

  fn api(json: &str) -> ApiQuestion {
    serde_json::from_str(json).unwrap()
  }

  fn req(count: u32, t: PracticeQuestionType) -> GenerateQuestionsIn {
    GenerateQuestionsIn {
      language: "english".into(),
      level: "beginner".into(),
      topic: "food".into(),
      question_count: count,
      question_type: t,
    }
  }

  #[test]
  fn normalizes_flagged_options() {
    let q = normalize(
      api(r#"{"id":"x","type":"grammar","text":"?","options":[{"text":"a","isCorrect":false},{"text":"b","isCorrect":true}],"explanation":"because"}"#),
      0,
      QuestionType::Vocabulary,
    )
    .unwrap();
    assert_eq!(q.kind, QuestionType::Grammar);
    assert_eq!(q.correct_text(), "b");
    assert_eq!(q.max_attempts(), 2);
  }

  #[test]
  fn normalizes_keyed_options_with_correct_option_id() {
    let q = normalize(
      api(r#"{"question":"?","options":[{"id":"a","text":"one"},{"id":"b","text":"two"}],"correctOptionId":"b"}"#),
      4,
      QuestionType::Vocabulary,
    )
    .unwrap();
    assert_eq!(q.id, "gen-5");
    assert_eq!(q.correct_text(), "two");
    assert_eq!(q.max_attempts(), 1);
  }

  #[test]
  fn normalizes_string_options_by_index_or_answer() {
    let by_index = normalize(
      api(r#"{"id":7,"text":"?","options":["x","y","z"],"correctOptionId":2}"#),
      0,
      QuestionType::Vocabulary,
    )
    .unwrap();
    assert_eq!(by_index.id, "7");
    assert_eq!(by_index.correct_text(), "z");

    let by_answer = normalize(
      api(r#"{"text":"?","options":["Dog","Cat"],"correctAnswer":" dog ","translation":"  "}"#),
      0,
      QuestionType::Vocabulary,
    )
    .unwrap();
    assert_eq!(by_answer.correct_text(), "Dog");
    assert_eq!(by_answer.translation, None);
  }

  #[test]
  fn drops_questions_without_a_single_correct_option() {
    let out = normalize_all(
      vec![
        api(r#"{"text":"?","options":["a","b"]}"#),
        api(r#"{"text":"?","options":["a","a"],"correctAnswer":"a"}"#),
        api(r#"{"text":"ok","options":["a","b"],"correctAnswer":"b"}"#),
      ],
      QuestionType::Vocabulary,
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].text, "ok");
  }

  #[test]
  fn drops_questions_with_repeated_or_blank_options() {
    let out = normalize_all(
      vec![
        api(r#"{"text":"dup","options":[{"text":"run","isCorrect":false},{"text":"run ","isCorrect":true},{"text":"ran","isCorrect":false}]}"#),
        api(r#"{"text":"blank","options":["", "walk"],"correctAnswer":"walk"}"#),
        api(r#"{"text":"ok","options":[{"text":"ran","isCorrect":false},{"text":"run","isCorrect":true}]}"#),
      ],
      QuestionType::Vocabulary,
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].text, "ok");

    let mut session = crate::quiz::QuizSession::new("s", crate::domain::QuizMode::Practice, out, 60);
    session.start().unwrap();
    let outcome = session.submit(Some("run")).unwrap();
    assert_eq!(outcome, crate::quiz::AnswerOutcome::Correct { points: 10, attempt: 1 });
  }

  #[tokio::test]
  async fn local_source_without_ai_serves_mock_filtered_by_type() {
    let src = LocalQuestionSource::new(None, Prompts::default(), practice_bank());
    let out = src.generate(&req(3, PracticeQuestionType::Grammar)).await;
    assert_eq!(out.source, QuestionOrigin::Mock);
    assert_eq!(out.questions.len(), 3);
    assert!(out.questions.iter().all(|q| q.kind == QuestionType::Grammar));
    assert!(out.message.is_some());
  }

  #[tokio::test]
  async fn local_source_rejects_invalid_requests() {
    let src = LocalQuestionSource::new(None, Prompts::default(), practice_bank());
    let out = src.generate(&req(0, PracticeQuestionType::Mixed)).await;
    assert_eq!(out.source, QuestionOrigin::Error);
    assert!(out.questions.is_empty());

    let mut r = req(3, PracticeQuestionType::Mixed);
    r.language = " ".into();
    assert_eq!(src.generate(&r).await.source, QuestionOrigin::Error);
  }

  #[tokio::test]
  async fn unreachable_remote_is_reported_as_error() {
    let src = HttpQuestionSource::new("http://127.0.0.1:9").unwrap();
    let out = src.generate(&req(3, PracticeQuestionType::Mixed)).await;
    assert_eq!(out.source, QuestionOrigin::Error);
  }

  #[test]
  fn response_serializes_canonical_options() {
    let out = GenerateQuestionsOut { source: QuestionOrigin::Mock, questions: practice_bank()[..1].to_vec(), message: None };
    let v = serde_json::to_value(&out).unwrap();
    assert_eq!(v["source"], "mock");
    assert!(v.get("message").is_none());
    assert_eq!(v["questions"][0]["options"][1]["isCorrect"], true);
    assert_eq!(v["questions"][0]["type"], "vocabulary");
  }
}
