//! Domain models: questions and their options, quiz modes, proficiency levels,
//! the mock user profile and persisted practice settings.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// What a question exercises.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  Vocabulary,
  Grammar,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
  pub text: String,
  pub is_correct: bool,
}

impl AnswerOption {
  pub fn right(text: impl Into<String>) -> Self {
    Self { text: text.into(), is_correct: true }
  }

  pub fn wrong(text: impl Into<String>) -> Self {
    Self { text: text.into(), is_correct: false }
  }
}

/// A multiple-choice question. Exactly one option is correct; `Question::new`
/// is the only constructor that checks it, so built-in banks and normalized
/// API payloads both go through it.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub text: String,
  pub options: Vec<AnswerOption>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub translation: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

impl Question {
  pub fn new(
    id: impl Into<String>,
    kind: QuestionType,
    text: impl Into<String>,
    options: Vec<AnswerOption>,
  ) -> Result<Self, String> {
    let id = id.into();
    let correct = options.iter().filter(|o| o.is_correct).count();
    if correct != 1 {
      return Err(format!("question {id}: expected exactly one correct option, found {correct}"));
    }
    // Answers are matched by text, so option texts must be distinct and non-blank.
    let mut seen = HashSet::new();
    for o in &options {
      let option = o.text.trim();
      if option.is_empty() {
        return Err(format!("question {id}: option text is empty"));
      }
      if !seen.insert(option) {
        return Err(format!("question {id}: duplicate option \"{option}\""));
      }
    }
    Ok(Self { id, kind, text: text.into(), options, translation: None, explanation: None })
  }

  pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
    self.translation = Some(translation.into());
    self
  }

  pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
    self.explanation = Some(explanation.into());
    self
  }

  /// Text of the correct option, empty if the question has none.
  pub fn correct_text(&self) -> &str {
    self.options.iter().find(|o| o.is_correct).map_or("", |o| o.text.as_str())
  }

  /// A second attempt is only offered when there is something to reveal afterwards.
  pub fn max_attempts(&self) -> u8 {
    if self.translation.is_some() || self.explanation.is_some() { 2 } else { 1 }
  }
}

/// Which flow is running the quiz. Scoring and reporting differ per mode.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
  LevelTest,
  Practice,
}

impl QuizMode {
  /// Points for a correct answer on the given (1-based) attempt.
  pub fn points_for(self, attempt: u8) -> u32 {
    match (self, attempt) {
      (QuizMode::LevelTest, 1) => 2,
      (QuizMode::LevelTest, 2) => 1,
      (QuizMode::Practice, 1) => 10,
      (QuizMode::Practice, 2) => 5,
      _ => 0,
    }
  }

  pub fn max_points_per_question(self) -> u32 {
    self.points_for(1)
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProficiencyLevel {
  Novato,
  Intermedio,
  Experto,
}

impl Default for ProficiencyLevel {
  fn default() -> Self { ProficiencyLevel::Novato }
}

impl std::fmt::Display for ProficiencyLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      ProficiencyLevel::Novato => "Novato",
      ProficiencyLevel::Intermedio => "Intermedio",
      ProficiencyLevel::Experto => "Experto",
    };
    f.write_str(s)
  }
}

/// Mock user, persisted as a whole under the session key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id: String,
  pub name: String,
  pub email: String,
  pub avatar_url: String,
  pub level: u32,
  pub xp: u32,
  pub words_learned: u32,
  pub consecutive_days: u32,
  pub current_vocabulary_level: ProficiencyLevel,
  #[serde(default)]
  pub learning_goals: Vec<String>,
}

impl UserProfile {
  /// Credit a finished quiz. Level is derived from xp (100 xp per level).
  pub fn record_quiz(&mut self, score: u32, correct_count: u32) {
    self.xp = self.xp.saturating_add(score);
    self.words_learned = self.words_learned.saturating_add(correct_count);
    self.level = level_for_xp(self.xp);
  }
}

pub const XP_PER_LEVEL: u32 = 100;

/// Level reached with the given xp; everyone starts at level 1.
pub fn level_for_xp(xp: u32) -> u32 {
  1 + xp / XP_PER_LEVEL
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PracticeQuestionType {
  Vocabulary,
  Grammar,
  #[default]
  Mixed,
}

impl PracticeQuestionType {
  pub fn accepts(self, kind: QuestionType) -> bool {
    match self {
      PracticeQuestionType::Mixed => true,
      PracticeQuestionType::Vocabulary => kind == QuestionType::Vocabulary,
      PracticeQuestionType::Grammar => kind == QuestionType::Grammar,
    }
  }
}

pub const MIN_PRACTICE_QUESTIONS: u32 = 1;
pub const MAX_PRACTICE_QUESTIONS: u32 = 20;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSettings {
  pub language: String,
  pub level: String,
  pub topic: String,
  pub num_questions: u32,
  pub question_type: PracticeQuestionType,
}

impl Default for PracticeSettings {
  fn default() -> Self {
    Self {
      language: "english".into(),
      level: "beginner".into(),
      topic: "general".into(),
      num_questions: 5,
      question_type: PracticeQuestionType::Mixed,
    }
  }
}

impl PracticeSettings {
  pub fn clamped(mut self) -> Self {
    self.num_questions = self.num_questions.clamp(MIN_PRACTICE_QUESTIONS, MAX_PRACTICE_QUESTIONS);
    self
  }
}
