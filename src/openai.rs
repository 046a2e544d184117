//! Minimal OpenAI client for our use-cases.
//!
//! We only call chat.completions and always request a JSON object, optionally
//! constrained by a JSON schema. Calls are instrumented and log model names,
//! latencies and token usage (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::analysis::LevelTestAnalysisResult;
use crate::config::Prompts;
use crate::questions::{ApiQuestion, GenerateQuestionsIn};
use crate::quiz::LevelTestAnswer;
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    Self::new(api_key, base_url, fast_model, strong_model).ok()
  }

  pub fn new(api_key: String, base_url: String, fast_model: String, strong_model: String) -> Result<Self, String> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .map_err(|e| e.to_string())?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), fast_model, strong_model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip_all, fields(model = %model, temperature = temperature, max_tokens = ?max_tokens))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
    format: ResponseFormat,
    max_tokens: Option<u32>,
  ) -> Result<T, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(format),
      max_tokens,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "vocab-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      error!(elapsed = ?start.elapsed(), %status, "OpenAI call failed");
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(elapsed = ?start.elapsed(), prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text)
      .map_err(|e| format!("JSON parse error: {} (body: {})", e, trunc_for_log(&text, 120)))
  }

  // --- High-level helpers (domain-specialized) ---

  /// Grade the placement test. The reply must match the analysis schema; a
  /// level outside Novato/Intermedio/Experto fails deserialization.
  #[instrument(level = "info", skip(self, prompts, answers), fields(answers = answers.len(), model = %self.strong_model))]
  pub async fn analyze_level_test(
    &self,
    prompts: &Prompts,
    answers: &[LevelTestAnswer],
  ) -> Result<LevelTestAnalysisResult, String> {
    let answers_json = serde_json::to_string(answers).map_err(|e| e.to_string())?;
    let user = fill_template(&prompts.level_test_user_template, &[("answers_json", &answers_json)]);
    let schema = json!({
      "type": "object",
      "properties": {
        "level": { "type": "string", "enum": ["Novato", "Intermedio", "Experto"] },
        "score": { "type": "integer", "minimum": 0 },
        "summary": { "type": "string" }
      },
      "required": ["level", "score", "summary"],
      "additionalProperties": false
    });
    self
      .chat_json(&self.strong_model, &prompts.level_test_system, &user, 0.2, ResponseFormat::schema("level_test_analysis", schema), None)
      .await
  }

  #[instrument(level = "info", skip_all, fields(level = %level, count = count, model = %self.fast_model))]
  pub async fn suggest_words(
    &self,
    prompts: &Prompts,
    level: &str,
    goals: &[String],
    count: usize,
  ) -> Result<Vec<String>, String> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Suggestions { suggested_words: Vec<String> }

    let goals = if goals.is_empty() { "general vocabulary".to_string() } else { goals.join(", ") };
    let count_s = count.to_string();
    let user = fill_template(
      &prompts.vocabulary_user_template,
      &[("count", &count_s), ("level", level), ("goals", &goals)],
    );
    let s: Suggestions = self
      .chat_json(
        &self.fast_model,
        &prompts.vocabulary_system,
        &user,
        0.7,
        ResponseFormat::object(),
        Some(suggestion_token_budget(count)),
      )
      .await?;
    Ok(s.suggested_words.into_iter().take(count).collect())
  }

  #[instrument(level = "info", skip(self, prompts, req), fields(count = req.question_count, model = %self.strong_model))]
  pub async fn generate_questions(
    &self,
    prompts: &Prompts,
    req: &GenerateQuestionsIn,
  ) -> Result<Vec<ApiQuestion>, String> {
    #[derive(Deserialize)]
    struct Generated { questions: Vec<ApiQuestion> }

    let count_s = req.question_count.to_string();
    let question_type = serde_json::to_value(req.question_type)
      .ok()
      .and_then(|v| v.as_str().map(str::to_string))
      .unwrap_or_else(|| "mixed".into());
    let user = fill_template(
      &prompts.questions_user_template,
      &[
        ("count", &count_s),
        ("question_type", &question_type),
        ("language", &req.language),
        ("level", &req.level),
        ("topic", &req.topic),
      ],
    );
    let g: Generated = self
      .chat_json(&self.strong_model, &prompts.questions_system, &user, 0.8, ResponseFormat::object(), None)
      .await?;
    Ok(g.questions)
  }
}

/// Completion cap for a word list: a short JSON envelope plus a few tokens per word.
fn suggestion_token_budget(count: usize) -> u32 {
  let count = u32::try_from(count).unwrap_or(u32::MAX);
  count.saturating_mul(16).saturating_add(64)
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Serialize, Debug)]
struct ResponseFormat {
  #[serde(rename = "type")] r#type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  json_schema: Option<JsonSchemaFormat>,
}

#[derive(Serialize, Debug)]
struct JsonSchemaFormat { name: String, schema: serde_json::Value, strict: bool }

impl ResponseFormat {
  fn object() -> Self {
    Self { r#type: "json_object".into(), json_schema: None }
  }

  fn schema(name: &str, schema: serde_json::Value) -> Self {
    Self {
      r#type: "json_schema".into(),
      json_schema: Some(JsonSchemaFormat { name: name.into(), schema, strict: true }),
    }
  }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
