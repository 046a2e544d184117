//! Level-test analysis: the collaborator seam and the fallback the level-test
//! page applies when the collaborator fails.

use futures_util::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::ProficiencyLevel;
use crate::openai::OpenAI;
use crate::quiz::LevelTestAnswer;

/// Level assigned when the analysis cannot be obtained.
pub const FALLBACK_LEVEL: ProficiencyLevel = ProficiencyLevel::Intermedio;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelTestAnalysisResult {
  pub level: ProficiencyLevel,
  pub score: u32,
  pub summary: String,
}

pub trait LevelTestAnalyzer: Send + Sync {
  fn analyze<'a>(&'a self, answers: &'a [LevelTestAnswer]) -> BoxFuture<'a, Result<LevelTestAnalysisResult, String>>;
}

pub struct OpenAiLevelAnalyzer {
  client: OpenAI,
  prompts: Prompts,
}

impl OpenAiLevelAnalyzer {
  pub fn new(client: OpenAI, prompts: Prompts) -> Self {
    Self { client, prompts }
  }
}

impl LevelTestAnalyzer for OpenAiLevelAnalyzer {
  fn analyze<'a>(&'a self, answers: &'a [LevelTestAnswer]) -> BoxFuture<'a, Result<LevelTestAnalysisResult, String>> {
    self.client.analyze_level_test(&self.prompts, answers).boxed()
  }
}

/// Stand-in when no AI key is configured; always fails so callers fall back.
pub struct UnavailableAnalyzer;

impl LevelTestAnalyzer for UnavailableAnalyzer {
  fn analyze<'a>(&'a self, _answers: &'a [LevelTestAnswer]) -> BoxFuture<'a, Result<LevelTestAnalysisResult, String>> {
    future::ready(Err("level-test analysis is not configured (no OPENAI_API_KEY)".to_string())).boxed()
  }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelTestReport {
  pub level: ProficiencyLevel,
  pub score: u32,
  pub max_score: u32,
  pub summary: String,
  pub fallback: bool,
}

pub fn fallback_summary(score: u32, max_score: u32) -> String {
  format!(
    "No pudimos analizar tu prueba en este momento. Obtuviste {score} de {max_score} puntos; \
     te asignamos el nivel {FALLBACK_LEVEL} de forma provisional."
  )
}

/// Ask the collaborator, never failing: any error yields the fallback level
/// and a locally written summary. The score shown is always `local_score`,
/// computed by the quiz itself.
#[instrument(level = "info", skip_all, fields(answers = answers.len(), local_score = local_score, max_score = max_score))]
pub async fn analyze_with_fallback(
  analyzer: &dyn LevelTestAnalyzer,
  answers: &[LevelTestAnswer],
  local_score: u32,
  max_score: u32,
) -> LevelTestReport {
  match analyzer.analyze(answers).await {
    Ok(r) => {
      if r.score != local_score {
        warn!(target: "collaborator", ai_score = r.score, local_score, "AI score differs from quiz score; keeping quiz score");
      }
      info!(target: "collaborator", level = %r.level, "Level test analyzed");
      LevelTestReport { level: r.level, score: local_score, max_score, summary: r.summary, fallback: false }
    }
    Err(e) => {
      error!(target: "collaborator", error = %e, "Level-test analysis failed; using fallback level");
      LevelTestReport {
        level: FALLBACK_LEVEL,
        score: local_score,
        max_score,
        summary: fallback_summary(local_score, max_score),
        fallback: true,
      }
    }
  }
}
