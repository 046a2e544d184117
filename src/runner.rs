//! Running quizzes: owns each `QuizSession`, drives its countdown and
//! auto-advance timers, and publishes every state change.
//!
//! Timer tasks only hold a `Weak` reference to their handle. Removing a quiz
//! from the registry (or dropping the last handle) aborts them, so no task
//! ever mutates a session nobody can observe.
//!
//! The registry keeps one quiz per client and mode. Completed quizzes stay
//! readable for a grace period; idle ones (never started, or abandoned after
//! completion) are swept on insert and by the periodic janitor.

use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex as StdMutex,
  },
  time::Duration,
};

use tokio::{
  sync::{watch, Mutex, RwLock},
  task::JoinHandle,
  time::{interval_at, sleep, Instant},
};
use tracing::{debug, info};

use crate::domain::QuizMode;
use crate::quiz::{AnswerOutcome, Phase, QuizError, QuizResult, QuizSession, QuizView};

const TICK: Duration = Duration::from_secs(1);
/// How long a completed quiz stays available for its result and analysis.
pub const COMPLETED_TTL: Duration = Duration::from_secs(10 * 60);
/// How long a quiz with no state change (e.g. never started) is kept.
pub const IDLE_TTL: Duration = Duration::from_secs(30 * 60);

pub struct QuizHandle {
  id: String,
  owner: String,
  mode: QuizMode,
  session: Mutex<QuizSession>,
  updates: watch::Sender<QuizView>,
  auto_advance: Option<Duration>,
  tasks: StdMutex<Vec<JoinHandle<()>>>,
  reported: AtomicBool,
  last_change: StdMutex<Instant>,
}

impl QuizHandle {
  pub fn new(owner: impl Into<String>, session: QuizSession, auto_advance: Option<Duration>) -> Arc<Self> {
    let (updates, _) = watch::channel(session.view());
    Arc::new(Self {
      id: session.id().to_string(),
      owner: owner.into(),
      mode: session.mode(),
      session: Mutex::new(session),
      updates,
      auto_advance: auto_advance.filter(|d| !d.is_zero()),
      tasks: StdMutex::new(Vec::new()),
      reported: AtomicBool::new(false),
      last_change: StdMutex::new(Instant::now()),
    })
  }

  pub fn id(&self) -> &str { &self.id }
  pub fn owner(&self) -> &str { &self.owner }
  pub fn mode(&self) -> QuizMode { self.mode }

  pub fn subscribe(&self) -> watch::Receiver<QuizView> {
    self.updates.subscribe()
  }

  pub async fn view(&self) -> QuizView {
    self.session.lock().await.view()
  }

  pub async fn result(&self) -> Option<QuizResult> {
    self.session.lock().await.result()
  }

  /// The final result, handed out once. Later calls get None.
  pub async fn take_unreported_result(&self) -> Option<QuizResult> {
    let result = self.result().await?;
    if self.reported.swap(true, Ordering::SeqCst) { None } else { Some(result) }
  }

  pub async fn start(self: &Arc<Self>) -> Result<QuizView, QuizError> {
    let view = {
      let mut s = self.session.lock().await;
      s.start()?;
      s.view()
    };
    info!(target: "quiz", quiz = %self.id, time_left = view.time_left_seconds, "Quiz started");
    self.publish(view.clone());
    self.spawn_countdown();
    Ok(view)
  }

  pub async fn submit(self: &Arc<Self>, selection: Option<String>) -> Result<(AnswerOutcome, QuizView), QuizError> {
    let (outcome, view) = {
      let mut s = self.session.lock().await;
      let outcome = s.submit(selection.as_deref())?;
      (outcome, s.view())
    };
    if outcome == AnswerOutcome::Ignored {
      debug!(target: "quiz", quiz = %self.id, "Selection ignored");
      return Ok((outcome, view));
    }
    debug!(target: "quiz", quiz = %self.id, ?outcome, score = view.score, "Answer recorded");
    self.publish(view.clone());
    if view.phase == Phase::ShowingFeedback {
      if let Some(delay) = self.auto_advance {
        self.spawn_advance(view.current_question_index, delay);
      }
    }
    Ok((outcome, view))
  }

  pub async fn next(&self) -> QuizView {
    let (moved, view) = {
      let mut s = self.session.lock().await;
      let moved = s.next();
      (moved, s.view())
    };
    if moved {
      self.publish(view.clone());
      self.log_if_finished(&view);
    }
    view
  }

  /// Abort timers. The session itself is left as-is.
  pub fn stop(&self) {
    let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
    for t in tasks.drain(..) {
      t.abort();
    }
  }

  fn publish(&self, view: QuizView) {
    *self.last_change.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    self.updates.send_replace(view);
  }

  /// True once the quiz has sat unchanged past its time-to-live.
  fn is_expired(&self, now: Instant) -> bool {
    let last = *self.last_change.lock().unwrap_or_else(|e| e.into_inner());
    let ttl = if self.updates.borrow().phase == Phase::Completed { COMPLETED_TTL } else { IDLE_TTL };
    now.saturating_duration_since(last) >= ttl
  }

  fn log_if_finished(&self, view: &QuizView) {
    if view.phase == Phase::Completed {
      info!(target: "quiz", quiz = %self.id, score = view.score, reason = ?view.reason, "Quiz completed");
    }
  }

  fn track(&self, task: JoinHandle<()>) {
    let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
    tasks.retain(|t| !t.is_finished());
    tasks.push(task);
  }

  /// Returns true once the session is completed and the countdown should end.
  async fn tick(&self) -> bool {
    let (changed, view) = {
      let mut s = self.session.lock().await;
      let changed = s.tick();
      (changed, s.view())
    };
    if changed {
      self.publish(view.clone());
      self.log_if_finished(&view);
    }
    view.phase == Phase::Completed
  }

  async fn advance_from(&self, index: usize) {
    let (moved, view) = {
      let mut s = self.session.lock().await;
      let moved = s.advance_from(index);
      (moved, s.view())
    };
    if moved {
      debug!(target: "quiz", quiz = %self.id, from = index, "Auto-advanced");
      self.publish(view.clone());
      self.log_if_finished(&view);
    }
  }

  fn spawn_countdown(self: &Arc<Self>) {
    let weak = Arc::downgrade(self);
    let task = tokio::spawn(async move {
      let mut ticker = interval_at(Instant::now() + TICK, TICK);
      loop {
        ticker.tick().await;
        let Some(handle) = weak.upgrade() else { break };
        if handle.tick().await {
          break;
        }
      }
    });
    self.track(task);
  }

  fn spawn_advance(self: &Arc<Self>, index: usize, delay: Duration) {
    let weak = Arc::downgrade(self);
    let task = tokio::spawn(async move {
      sleep(delay).await;
      if let Some(handle) = weak.upgrade() {
        handle.advance_from(index).await;
      }
    });
    self.track(task);
  }
}

impl Drop for QuizHandle {
  fn drop(&mut self) {
    self.stop();
  }
}

/// All live quizzes, keyed by quiz id.
#[derive(Default)]
pub struct QuizRegistry {
  quizzes: RwLock<HashMap<String, Arc<QuizHandle>>>,
}

impl QuizRegistry {
  /// Register a new quiz. It replaces the owner's previous quiz of the same
  /// mode, and expired quizzes are swept on the way.
  pub async fn insert(&self, handle: Arc<QuizHandle>) {
    let mut quizzes = self.quizzes.write().await;
    let now = Instant::now();
    quizzes.retain(|id, h| {
      let replaced = h.owner() == handle.owner() && h.mode() == handle.mode();
      let keep = !replaced && !h.is_expired(now);
      if !keep {
        h.stop();
        debug!(target: "quiz", quiz = %id, replaced, "Quiz evicted");
      }
      keep
    });
    quizzes.insert(handle.id().to_string(), handle);
  }

  /// Drop every expired quiz. Returns how many were removed.
  pub async fn sweep(&self) -> usize {
    let mut quizzes = self.quizzes.write().await;
    let before = quizzes.len();
    let now = Instant::now();
    quizzes.retain(|_, h| {
      let expired = h.is_expired(now);
      if expired {
        h.stop();
      }
      !expired
    });
    let removed = before - quizzes.len();
    if removed > 0 {
      info!(target: "quiz", removed, live = quizzes.len(), "Expired quizzes swept");
    }
    removed
  }

  /// Sweep once per `every` until the registry is dropped.
  pub fn spawn_janitor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(self);
    tokio::spawn(async move {
      let mut ticker = interval_at(Instant::now() + every, every);
      loop {
        ticker.tick().await;
        let Some(registry) = weak.upgrade() else { break };
        registry.sweep().await;
      }
    })
  }

  /// Lookup scoped to the owning client; other clients see nothing.
  pub async fn get(&self, id: &str, owner: &str) -> Option<Arc<QuizHandle>> {
    self.quizzes.read().await.get(id).filter(|h| h.owner() == owner).cloned()
  }

  pub async fn remove(&self, id: &str, owner: &str) -> bool {
    let mut quizzes = self.quizzes.write().await;
    match quizzes.get(id) {
      Some(h) if h.owner() == owner => {
        h.stop();
        quizzes.remove(id);
        true
      }
      _ => false,
    }
  }

  pub async fn len(&self) -> usize {
    self.quizzes.read().await.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{AnswerOption, Question, QuestionType};
  use crate::quiz::CompletionReason;

  fn question(id: &str) -> Question {
    Question::new(id, QuestionType::Vocabulary, "?", vec![AnswerOption::right("yes"), AnswerOption::wrong("no")])
      .unwrap()
      .with_explanation("because")
  }

  fn handle(mode: QuizMode, limit: u32, auto: Option<Duration>) -> Arc<QuizHandle> {
    QuizHandle::new("client", QuizSession::new("quiz", mode, vec![question("a"), question("b")], limit), auto)
  }

  fn owned(owner: &str, id: &str, mode: QuizMode, limit: u32) -> Arc<QuizHandle> {
    QuizHandle::new(owner, QuizSession::new(id, mode, vec![question("a"), question("b")], limit), None)
  }

  async fn finish(h: &Arc<QuizHandle>) {
    h.start().await.unwrap();
    for _ in 0..2 {
      h.submit(Some("yes".into())).await.unwrap();
      h.next().await;
    }
    assert_eq!(h.view().await.phase, Phase::Completed);
  }

  #[tokio::test(start_paused = true)]
  async fn countdown_forces_timeout() {
    let h = handle(QuizMode::Practice, 3, None);
    h.start().await.unwrap();
    h.submit(Some("yes".into())).await.unwrap();

    sleep(Duration::from_millis(3500)).await;
    let v = h.view().await;
    assert_eq!(v.phase, Phase::Completed);
    assert_eq!(v.reason, Some(CompletionReason::Timeout));
    assert_eq!(v.score, 10);
    assert_eq!(v.time_left_seconds, 0);
  }

  #[tokio::test(start_paused = true)]
  async fn countdown_does_not_run_before_start() {
    let h = handle(QuizMode::Practice, 3, None);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.view().await.time_left_seconds, 3);
    assert_eq!(h.view().await.phase, Phase::NotStarted);
  }

  #[tokio::test(start_paused = true)]
  async fn stop_clears_timers() {
    let h = handle(QuizMode::Practice, 10, None);
    h.start().await.unwrap();
    sleep(Duration::from_millis(1500)).await;
    h.stop();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.view().await.time_left_seconds, 9);
  }

  #[tokio::test(start_paused = true)]
  async fn auto_advance_moves_on_after_delay() {
    let h = handle(QuizMode::LevelTest, 60, Some(Duration::from_millis(1500)));
    h.start().await.unwrap();
    h.submit(Some("yes".into())).await.unwrap();
    assert_eq!(h.view().await.phase, Phase::ShowingFeedback);

    sleep(Duration::from_millis(1600)).await;
    let v = h.view().await;
    assert_eq!(v.phase, Phase::InProgress);
    assert_eq!(v.current_question_index, 1);
  }

  #[tokio::test(start_paused = true)]
  async fn stale_auto_advance_does_not_skip_a_question() {
    let h = handle(QuizMode::LevelTest, 60, Some(Duration::from_millis(1500)));
    h.start().await.unwrap();
    h.submit(Some("yes".into())).await.unwrap();
    h.next().await;
    h.submit(Some("yes".into())).await.unwrap();
    sleep(Duration::from_millis(1000)).await;
    // first timer fires at 1.5s for index 0, must not touch question 1's feedback
    sleep(Duration::from_millis(600)).await;
    let v = h.view().await;
    assert!(v.phase == Phase::Completed || v.phase == Phase::ShowingFeedback);
    assert_eq!(v.score, 4);
  }

  #[tokio::test(start_paused = true)]
  async fn subscribers_see_ticks() {
    let h = handle(QuizMode::Practice, 30, None);
    let mut rx = h.subscribe();
    h.start().await.unwrap();
    sleep(Duration::from_millis(1100)).await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().time_left_seconds, 29);
  }

  #[tokio::test]
  async fn result_is_reported_once() {
    let h = handle(QuizMode::Practice, 30, None);
    h.start().await.unwrap();
    assert!(h.take_unreported_result().await.is_none());
    for _ in 0..2 {
      h.submit(Some("yes".into())).await.unwrap();
      h.next().await;
    }
    let r = h.take_unreported_result().await.unwrap();
    assert_eq!(r.score, 20);
    assert!(h.take_unreported_result().await.is_none());
    assert_eq!(h.result().await.unwrap().score, 20);
  }

  #[tokio::test]
  async fn registry_scopes_by_owner() {
    let reg = QuizRegistry::default();
    let h = handle(QuizMode::Practice, 30, None);
    reg.insert(h.clone()).await;
    assert!(reg.get("quiz", "client").await.is_some());
    assert!(reg.get("quiz", "intruder").await.is_none());
    assert!(!reg.remove("quiz", "intruder").await);
    assert!(reg.remove("quiz", "client").await);
    assert_eq!(reg.len().await, 0);
  }

  #[tokio::test(start_paused = true)]
  async fn new_quiz_replaces_previous_one_of_same_mode() {
    let reg = QuizRegistry::default();
    for i in 0..50 {
      let h = owned("client", &format!("p-{i}"), QuizMode::Practice, 30);
      reg.insert(h.clone()).await;
      finish(&h).await;
    }
    reg.insert(owned("client", "lt", QuizMode::LevelTest, 30)).await;
    reg.insert(owned("other", "p-other", QuizMode::Practice, 30)).await;

    assert_eq!(reg.len().await, 3);
    assert!(reg.get("p-49", "client").await.is_some());
    assert!(reg.get("p-48", "client").await.is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn sweep_expires_completed_and_idle_quizzes() {
    let reg = QuizRegistry::default();
    let done = owned("a", "done", QuizMode::Practice, 3600);
    let idle = owned("b", "idle", QuizMode::Practice, 3600);
    let running = owned("c", "running", QuizMode::Practice, 3600);
    for h in [&done, &idle, &running] {
      reg.insert(h.clone()).await;
    }
    finish(&done).await;
    running.start().await.unwrap();

    sleep(COMPLETED_TTL + TICK).await;
    assert_eq!(reg.sweep().await, 1);
    assert!(reg.get("done", "a").await.is_none());
    assert!(reg.get("idle", "b").await.is_some());

    sleep(IDLE_TTL).await;
    assert_eq!(reg.sweep().await, 1);
    assert!(reg.get("idle", "b").await.is_none());
    // The countdown keeps the running quiz fresh.
    assert!(reg.get("running", "c").await.is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn janitor_sweeps_periodically() {
    let reg = Arc::new(QuizRegistry::default());
    let h = owned("a", "idle", QuizMode::Practice, 30);
    reg.insert(h).await;
    let janitor = reg.spawn_janitor(Duration::from_secs(60));

    sleep(IDLE_TTL + Duration::from_secs(61)).await;
    assert_eq!(reg.len().await, 0);
    janitor.abort();
  }
}
