//! Quiz session state machine.
//!
//! NotStarted -> InProgress -> ShowingFeedback (per question) -> Completed,
//! plus the terminal NoQuestions state for an empty question list.
//!
//! This module is synchronous and clock-free: the runner drives `tick` once per
//! second and schedules auto-advance. Everything here is deterministic.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Question, QuestionType, QuizMode};

pub const DEFAULT_TIME_LIMIT_SECS: u32 = 180;
pub const NO_QUESTIONS_MESSAGE: &str = "No hay preguntas disponibles para este quiz.";

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  NoQuestions,
  NotStarted,
  InProgress,
  ShowingFeedback,
  Completed,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
  Finished,
  Timeout,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
  #[error("this quiz has no questions")]
  NoQuestions,
  #[error("the quiz has not been started")]
  NotStarted,
  #[error("the quiz has already been started")]
  AlreadyStarted,
  #[error("Please select an answer")]
  NoSelection,
  #[error("unknown option: {0}")]
  UnknownOption(String),
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerAttempt {
  pub question_id: String,
  pub selected_option_text: String,
  pub attempt_number: u8,
  pub is_correct: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizSessionState {
  pub current_question_index: usize,
  pub score: u32,
  pub time_left_seconds: u32,
  pub answers: Vec<AnswerAttempt>,
  pub completed: bool,
}

/// What the learner sees once a question is resolved.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
  pub question_id: String,
  pub correct: bool,
  pub points_awarded: u32,
  pub correct_answer: String,
  pub translation: Option<String>,
  pub explanation: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AnswerOutcome {
  Correct { points: u32, attempt: u8 },
  TryAgain { attempts_left: u8 },
  Incorrect { correct_answer: String },
  /// Selection had no effect (feedback showing, option already tried, quiz over).
  Ignored,
}

/// One record per question, the shape the level-test analysis consumes.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelTestAnswer {
  pub question: String,
  pub selected_answer: Option<String>,
  pub correct_answer: String,
  pub attempts: u8,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
  pub quiz_id: String,
  pub mode: QuizMode,
  pub score: u32,
  pub max_score: u32,
  pub correct_count: u32,
  pub answered_count: u32,
  pub total_questions: u32,
  pub reason: CompletionReason,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub answers: Option<Vec<LevelTestAnswer>>,
}

/// Public projection of a question: the correct flag never leaves the server
/// before feedback.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub text: String,
  pub options: Vec<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
  pub quiz_id: String,
  pub mode: QuizMode,
  pub phase: Phase,
  pub reason: Option<CompletionReason>,
  pub current_question_index: usize,
  pub total_questions: usize,
  pub score: u32,
  pub time_left_seconds: u32,
  pub attempts_left: u8,
  pub question: Option<QuestionView>,
  pub tried_options: Vec<String>,
  pub feedback: Option<Feedback>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

#[derive(Debug)]
pub struct QuizSession {
  id: String,
  mode: QuizMode,
  questions: Vec<Question>,
  time_limit: u32,
  state: QuizSessionState,
  phase: Phase,
  reason: Option<CompletionReason>,
  tried_on_current: Vec<String>,
  feedback: Option<Feedback>,
  resolved: u32,
}

impl QuizSession {
  pub fn new(id: impl Into<String>, mode: QuizMode, questions: Vec<Question>, time_limit: u32) -> Self {
    let phase = if questions.is_empty() { Phase::NoQuestions } else { Phase::NotStarted };
    Self {
      id: id.into(),
      mode,
      questions,
      time_limit,
      state: QuizSessionState {
        current_question_index: 0,
        score: 0,
        time_left_seconds: time_limit,
        answers: Vec::new(),
        completed: false,
      },
      phase,
      reason: None,
      tried_on_current: Vec::new(),
      feedback: None,
      resolved: 0,
    }
  }

  pub fn id(&self) -> &str { &self.id }
  pub fn mode(&self) -> QuizMode { self.mode }
  pub fn phase(&self) -> Phase { self.phase }
  pub fn state(&self) -> &QuizSessionState { &self.state }
  pub fn is_completed(&self) -> bool { self.phase == Phase::Completed }

  pub fn current_question(&self) -> Option<&Question> {
    match self.phase {
      Phase::InProgress | Phase::ShowingFeedback => self.questions.get(self.state.current_question_index),
      _ => None,
    }
  }

  pub fn start(&mut self) -> Result<(), QuizError> {
    match self.phase {
      Phase::NoQuestions => Err(QuizError::NoQuestions),
      Phase::NotStarted => {
        self.state.time_left_seconds = self.time_limit;
        self.phase = Phase::InProgress;
        Ok(())
      }
      _ => Err(QuizError::AlreadyStarted),
    }
  }

  /// One countdown second. Returns true if the state changed.
  pub fn tick(&mut self) -> bool {
    if !matches!(self.phase, Phase::InProgress | Phase::ShowingFeedback) {
      return false;
    }
    self.state.time_left_seconds = self.state.time_left_seconds.saturating_sub(1);
    if self.state.time_left_seconds == 0 {
      self.complete(CompletionReason::Timeout);
    }
    true
  }

  pub fn submit(&mut self, selection: Option<&str>) -> Result<AnswerOutcome, QuizError> {
    match self.phase {
      Phase::NoQuestions => return Err(QuizError::NoQuestions),
      Phase::NotStarted => return Err(QuizError::NotStarted),
      Phase::ShowingFeedback | Phase::Completed => return Ok(AnswerOutcome::Ignored),
      Phase::InProgress => {}
    }
    let text = selection.map(str::trim).filter(|s| !s.is_empty()).ok_or(QuizError::NoSelection)?;

    let idx = self.state.current_question_index;
    let question = &self.questions[idx];
    let option = question
      .options
      .iter()
      .find(|o| o.text == text)
      .ok_or_else(|| QuizError::UnknownOption(text.to_string()))?;

    if self.tried_on_current.iter().any(|t| t == text) {
      return Ok(AnswerOutcome::Ignored);
    }

    let attempt = self.tried_on_current.len() as u8 + 1;
    let is_correct = option.is_correct;
    let max_attempts = question.max_attempts();
    let question_id = question.id.clone();

    self.tried_on_current.push(text.to_string());
    self.state.answers.push(AnswerAttempt {
      question_id,
      selected_option_text: text.to_string(),
      attempt_number: attempt,
      is_correct,
    });

    if is_correct {
      let points = self.mode.points_for(attempt);
      self.state.score += points;
      self.resolve(true, points);
      Ok(AnswerOutcome::Correct { points, attempt })
    } else if attempt < max_attempts {
      Ok(AnswerOutcome::TryAgain { attempts_left: max_attempts - attempt })
    } else {
      self.resolve(false, 0);
      Ok(AnswerOutcome::Incorrect { correct_answer: self.questions[idx].correct_text().to_string() })
    }
  }

  /// Explicit "next question". Returns true if the quiz moved on.
  pub fn next(&mut self) -> bool {
    if self.phase != Phase::ShowingFeedback {
      return false;
    }
    let next = self.state.current_question_index + 1;
    self.feedback = None;
    self.tried_on_current.clear();
    if next >= self.questions.len() {
      self.complete(CompletionReason::Finished);
    } else {
      self.state.current_question_index = next;
      self.phase = Phase::InProgress;
    }
    true
  }

  /// Auto-advance guard: only moves on if feedback is still showing for `index`.
  pub fn advance_from(&mut self, index: usize) -> bool {
    if self.phase == Phase::ShowingFeedback && self.state.current_question_index == index {
      self.next()
    } else {
      false
    }
  }

  pub fn answer_log(&self) -> Vec<LevelTestAnswer> {
    self
      .questions
      .iter()
      .map(|q| {
        let attempts: Vec<&AnswerAttempt> = self.state.answers.iter().filter(|a| a.question_id == q.id).collect();
        LevelTestAnswer {
          question: q.text.clone(),
          selected_answer: attempts.last().map(|a| a.selected_option_text.clone()),
          correct_answer: q.correct_text().to_string(),
          attempts: attempts.len() as u8,
        }
      })
      .collect()
  }

  pub fn correct_count(&self) -> u32 {
    self.state.answers.iter().filter(|a| a.is_correct).count() as u32
  }

  /// Final report; None until the session is completed.
  pub fn result(&self) -> Option<QuizResult> {
    let reason = self.reason?;
    Some(QuizResult {
      quiz_id: self.id.clone(),
      mode: self.mode,
      score: self.state.score,
      max_score: self.mode.max_points_per_question() * self.questions.len() as u32,
      correct_count: self.correct_count(),
      answered_count: self.resolved,
      total_questions: self.questions.len() as u32,
      reason,
      answers: (self.mode == QuizMode::LevelTest).then(|| self.answer_log()),
    })
  }

  pub fn view(&self) -> QuizView {
    let attempts_left = self
      .current_question()
      .filter(|_| self.phase == Phase::InProgress)
      .map(|q| q.max_attempts().saturating_sub(self.tried_on_current.len() as u8))
      .unwrap_or(0);
    QuizView {
      quiz_id: self.id.clone(),
      mode: self.mode,
      phase: self.phase,
      reason: self.reason,
      current_question_index: self.state.current_question_index,
      total_questions: self.questions.len(),
      score: self.state.score,
      time_left_seconds: self.state.time_left_seconds,
      attempts_left,
      question: self.current_question().map(|q| QuestionView {
        id: q.id.clone(),
        kind: q.kind,
        text: q.text.clone(),
        options: q.options.iter().map(|o| o.text.clone()).collect(),
      }),
      tried_options: self.tried_on_current.clone(),
      feedback: self.feedback.clone(),
      message: (self.phase == Phase::NoQuestions).then(|| NO_QUESTIONS_MESSAGE.to_string()),
    }
  }

  fn resolve(&mut self, correct: bool, points: u32) {
    let q = &self.questions[self.state.current_question_index];
    self.feedback = Some(Feedback {
      question_id: q.id.clone(),
      correct,
      points_awarded: points,
      correct_answer: q.correct_text().to_string(),
      translation: q.translation.clone(),
      explanation: q.explanation.clone(),
    });
    self.resolved += 1;
    self.phase = Phase::ShowingFeedback;
  }

  fn complete(&mut self, reason: CompletionReason) {
    self.phase = Phase::Completed;
    self.reason = Some(reason);
    self.state.completed = true;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::AnswerOption;
  use crate::seeds::level_test_questions;

  fn two_attempt(id: &str) -> Question {
    Question::new(id, QuestionType::Vocabulary, format!("{id}?"), vec![
      AnswerOption::right("yes"),
      AnswerOption::wrong("no"),
      AnswerOption::wrong("maybe"),
    ])
    .unwrap()
    .with_translation("¿sí?")
  }

  fn one_attempt(id: &str) -> Question {
    Question::new(id, QuestionType::Grammar, format!("{id}?"), vec![
      AnswerOption::right("yes"),
      AnswerOption::wrong("no"),
    ])
    .unwrap()
  }

  fn started(mode: QuizMode, questions: Vec<Question>) -> QuizSession {
    let mut s = QuizSession::new("quiz-1", mode, questions, DEFAULT_TIME_LIMIT_SECS);
    s.start().unwrap();
    s
  }

  #[test]
  fn empty_question_list_never_starts() {
    let mut s = QuizSession::new("q", QuizMode::Practice, vec![], 60);
    assert_eq!(s.phase(), Phase::NoQuestions);
    assert_eq!(s.start(), Err(QuizError::NoQuestions));
    assert!(!s.tick());
    assert_eq!(s.view().message.as_deref(), Some(NO_QUESTIONS_MESSAGE));
  }

  #[test]
  fn submit_before_start_is_rejected() {
    let mut s = QuizSession::new("q", QuizMode::Practice, vec![one_attempt("a")], 60);
    assert_eq!(s.submit(Some("yes")), Err(QuizError::NotStarted));
    assert!(s.state().answers.is_empty());
  }

  #[test]
  fn start_twice_is_rejected() {
    let mut s = started(QuizMode::Practice, vec![one_attempt("a")]);
    assert_eq!(s.start(), Err(QuizError::AlreadyStarted));
  }

  #[test]
  fn missing_selection_is_rejected_without_recording() {
    let mut s = started(QuizMode::Practice, vec![one_attempt("a")]);
    assert_eq!(s.submit(None), Err(QuizError::NoSelection));
    assert_eq!(s.submit(Some("  ")), Err(QuizError::NoSelection));
    assert!(s.state().answers.is_empty());
    assert_eq!(s.phase(), Phase::InProgress);
  }

  #[test]
  fn unknown_option_is_rejected() {
    let mut s = started(QuizMode::Practice, vec![one_attempt("a")]);
    assert!(matches!(s.submit(Some("nope")), Err(QuizError::UnknownOption(_))));
  }

  #[test]
  fn question_with_translation_allows_two_attempts() {
    let mut s = started(QuizMode::LevelTest, vec![two_attempt("a")]);
    assert_eq!(s.submit(Some("no")), Ok(AnswerOutcome::TryAgain { attempts_left: 1 }));
    assert_eq!(s.phase(), Phase::InProgress);
    assert_eq!(s.submit(Some("maybe")), Ok(AnswerOutcome::Incorrect { correct_answer: "yes".into() }));
    assert_eq!(s.phase(), Phase::ShowingFeedback);
    let fb = s.view().feedback.unwrap();
    assert!(!fb.correct);
    assert_eq!(fb.translation.as_deref(), Some("¿sí?"));
  }

  #[test]
  fn question_without_reveal_locks_after_one_attempt() {
    let mut s = started(QuizMode::Practice, vec![one_attempt("a"), one_attempt("b")]);
    assert_eq!(s.submit(Some("no")), Ok(AnswerOutcome::Incorrect { correct_answer: "yes".into() }));
    assert_eq!(s.phase(), Phase::ShowingFeedback);
    assert_eq!(s.state().score, 0);
  }

  #[test]
  fn second_attempt_scores_reduced_points() {
    let mut s = started(QuizMode::Practice, vec![two_attempt("a")]);
    s.submit(Some("no")).unwrap();
    assert_eq!(s.submit(Some("yes")), Ok(AnswerOutcome::Correct { points: 5, attempt: 2 }));
    assert_eq!(s.state().score, 5);

    let mut s = started(QuizMode::LevelTest, vec![two_attempt("a")]);
    s.submit(Some("no")).unwrap();
    assert_eq!(s.submit(Some("yes")), Ok(AnswerOutcome::Correct { points: 1, attempt: 2 }));
    assert_eq!(s.state().score, 1);
  }

  #[test]
  fn reselecting_a_tried_option_is_a_noop() {
    let mut s = started(QuizMode::LevelTest, vec![two_attempt("a")]);
    s.submit(Some("no")).unwrap();
    let before = s.view();
    assert_eq!(s.submit(Some("no")), Ok(AnswerOutcome::Ignored));
    assert_eq!(s.view(), before);
    assert_eq!(s.state().answers.len(), 1);
  }

  #[test]
  fn selecting_while_feedback_is_shown_is_a_noop() {
    let mut s = started(QuizMode::Practice, vec![two_attempt("a"), two_attempt("b")]);
    s.submit(Some("yes")).unwrap();
    let before = s.view();
    assert_eq!(s.submit(Some("no")), Ok(AnswerOutcome::Ignored));
    assert_eq!(s.submit(Some("yes")), Ok(AnswerOutcome::Ignored));
    assert_eq!(s.view(), before);

    assert!(s.next());
    assert_eq!(s.phase(), Phase::InProgress);
    assert_eq!(s.state().current_question_index, 1);
    assert_eq!(s.submit(Some("yes")), Ok(AnswerOutcome::Correct { points: 10, attempt: 1 }));
  }

  #[test]
  fn next_is_ignored_until_feedback() {
    let mut s = started(QuizMode::Practice, vec![two_attempt("a"), two_attempt("b")]);
    assert!(!s.next());
    assert_eq!(s.state().current_question_index, 0);
  }

  #[test]
  fn last_next_completes_with_finished() {
    let mut s = started(QuizMode::Practice, vec![one_attempt("a")]);
    s.submit(Some("yes")).unwrap();
    assert!(s.next());
    assert!(s.is_completed());
    let r = s.result().unwrap();
    assert_eq!(r.reason, CompletionReason::Finished);
    assert_eq!(r.score, 10);
    assert_eq!(r.max_score, 10);
    assert!(r.answers.is_none(), "practice mode only reports the aggregate");
  }

  #[test]
  fn advance_from_ignores_stale_index() {
    let mut s = started(QuizMode::LevelTest, vec![two_attempt("a"), two_attempt("b")]);
    s.submit(Some("yes")).unwrap();
    assert!(!s.advance_from(1));
    assert!(s.advance_from(0));
    assert!(!s.advance_from(0));
    assert_eq!(s.state().current_question_index, 1);
  }

  #[test]
  fn timeout_completes_with_partial_score_and_freezes() {
    let mut s = QuizSession::new("q", QuizMode::LevelTest, vec![two_attempt("a"), two_attempt("b"), two_attempt("c")], 3);
    s.start().unwrap();
    s.submit(Some("yes")).unwrap();
    s.next();
    s.tick();
    s.tick();
    assert_eq!(s.phase(), Phase::InProgress);
    s.tick();
    assert!(s.is_completed());
    assert_eq!(s.state().time_left_seconds, 0);

    let r = s.result().unwrap();
    assert_eq!(r.reason, CompletionReason::Timeout);
    assert_eq!(r.score, 2);
    assert_eq!(r.answered_count, 1);

    assert!(!s.tick());
    assert_eq!(s.submit(Some("yes")), Ok(AnswerOutcome::Ignored));
    assert!(!s.next());
    assert_eq!(s.state().score, 2);
    assert_eq!(s.result().unwrap(), r);
  }

  #[test]
  fn countdown_keeps_running_during_feedback() {
    let mut s = QuizSession::new("q", QuizMode::Practice, vec![one_attempt("a"), one_attempt("b")], 10);
    s.start().unwrap();
    s.submit(Some("yes")).unwrap();
    assert!(s.tick());
    assert_eq!(s.state().time_left_seconds, 9);
    assert_eq!(s.phase(), Phase::ShowingFeedback);
  }

  #[test]
  fn perfect_level_test_scores_twenty_and_logs_every_question() {
    let questions = level_test_questions();
    let mut s = started(QuizMode::LevelTest, questions.clone());
    for q in &questions {
      let right = q.correct_text().to_string();
      assert!(matches!(s.submit(Some(&right)), Ok(AnswerOutcome::Correct { points: 2, attempt: 1 })));
      s.next();
    }
    let r = s.result().unwrap();
    assert_eq!(r.score, 20);
    assert_eq!(r.max_score, 20);
    assert_eq!(r.correct_count, 10);
    let log = r.answers.unwrap();
    assert_eq!(log.len(), 10);
    assert!(log.iter().all(|a| a.attempts == 1 && a.selected_answer.as_deref() == Some(a.correct_answer.as_str())));
  }

  #[test]
  fn score_is_sum_of_allowed_per_question_points() {
    // correct first, correct second, exhausted, single-attempt miss
    let qs = vec![two_attempt("a"), two_attempt("b"), two_attempt("c"), one_attempt("d")];
    let mut s = started(QuizMode::LevelTest, qs);
    s.submit(Some("yes")).unwrap();
    s.next();
    s.submit(Some("no")).unwrap();
    s.submit(Some("yes")).unwrap();
    s.next();
    s.submit(Some("no")).unwrap();
    s.submit(Some("maybe")).unwrap();
    s.next();
    s.submit(Some("no")).unwrap();
    s.next();
    let r = s.result().unwrap();
    assert_eq!(r.score, 2 + 1);
    assert_eq!(r.answered_count, 4);
    let log = r.answers.unwrap();
    assert_eq!(log.iter().map(|a| a.attempts).collect::<Vec<_>>(), vec![1, 2, 2, 1]);
  }

  #[test]
  fn unanswered_questions_appear_in_log_after_timeout() {
    let mut s = QuizSession::new("q", QuizMode::LevelTest, vec![two_attempt("a"), two_attempt("b")], 1);
    s.start().unwrap();
    s.tick();
    let log = s.result().unwrap().answers.unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|a| a.selected_answer.is_none() && a.attempts == 0));
  }

  #[test]
  fn view_hides_correct_flags() {
    let s = started(QuizMode::Practice, vec![two_attempt("a")]);
    let json = serde_json::to_value(s.view()).unwrap();
    assert_eq!(json["question"]["options"], serde_json::json!(["yes", "no", "maybe"]));
    assert_eq!(json["attemptsLeft"], 2);
    assert_eq!(json["phase"], "in_progress");
  }
}
