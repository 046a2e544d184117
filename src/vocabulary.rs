//! Vocabulary suggestions behind a swappable collaborator.

use futures_util::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::config::Prompts;
use crate::openai::OpenAI;
use crate::seeds::PLACEHOLDER_WORDS;

pub const DEFAULT_SUGGESTIONS: usize = 5;
pub const MAX_SUGGESTIONS: usize = 20;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
  pub user_level: String,
  #[serde(default)]
  pub learning_goals: Vec<String>,
  #[serde(default = "default_count")]
  pub number_of_suggestions: usize,
}

fn default_count() -> usize { DEFAULT_SUGGESTIONS }

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
  pub suggested_words: Vec<String>,
}

pub trait VocabularySuggester: Send + Sync {
  fn suggest<'a>(&'a self, req: &'a SuggestionRequest) -> BoxFuture<'a, Result<Vec<String>, String>>;
}

/// Placeholder list, first `n` words.
pub struct StaticSuggester;

fn static_words(n: usize) -> Vec<String> {
  PLACEHOLDER_WORDS.iter().take(n).map(|w| w.to_string()).collect()
}

impl VocabularySuggester for StaticSuggester {
  fn suggest<'a>(&'a self, req: &'a SuggestionRequest) -> BoxFuture<'a, Result<Vec<String>, String>> {
    future::ready(Ok(static_words(req.number_of_suggestions))).boxed()
  }
}

pub struct OpenAiSuggester {
  client: OpenAI,
  prompts: Prompts,
}

impl OpenAiSuggester {
  pub fn new(client: OpenAI, prompts: Prompts) -> Self {
    Self { client, prompts }
  }
}

impl VocabularySuggester for OpenAiSuggester {
  fn suggest<'a>(&'a self, req: &'a SuggestionRequest) -> BoxFuture<'a, Result<Vec<String>, String>> {
    self
      .client
      .suggest_words(&self.prompts, &req.user_level, &req.learning_goals, req.number_of_suggestions)
      .boxed()
  }
}

/// Callers always get words back; collaborator errors degrade to the static list.
#[instrument(level = "info", skip_all, fields(level = %req.user_level, n = req.number_of_suggestions))]
pub async fn suggest_or_fallback(suggester: &dyn VocabularySuggester, req: SuggestionRequest) -> SuggestionResponse {
  let req = SuggestionRequest {
    number_of_suggestions: req.number_of_suggestions.clamp(1, MAX_SUGGESTIONS),
    ..req
  };
  let suggested_words = match suggester.suggest(&req).await {
    Ok(words) if !words.is_empty() => words,
    Ok(_) => static_words(req.number_of_suggestions),
    Err(e) => {
      error!(target: "collaborator", error = %e, "Vocabulary suggestion failed; using placeholder list");
      static_words(req.number_of_suggestions)
    }
  };
  SuggestionResponse { suggested_words }
}
