//! Execution Context
//!
//! The shared state machine of a single run. Actions report progress into it,
//! structural actions record which exercise/set/repetition is current, and the
//! caller drives it through [`ExecutionContext::cancel`] and
//! [`ExecutionContext::set_paused`].
//!
//! Observers either read the latest [`ContextState`] (through
//! [`ExecutionContext::snapshot`] or a `watch` receiver) or consume the ordered
//! stream of [`ContextEvent`]s from [`ExecutionContext::subscribe_events`].

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::debug;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::error::ExecutionError;
use crate::program::ExerciseRef;

/// Observable values of an execution context at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextState {
    pub is_cancelled: bool,
    pub is_paused: bool,
    pub current_exercise: Option<ExerciseRef>,
    pub current_set: u32,
    pub current_repetition: u32,
    /// Sum of every progress delta reported so far
    pub progress: Duration,
    /// Sum of deltas since `current_exercise` last changed
    pub current_exercise_progress: Duration,
    /// Remaining fast-forward budget
    pub skip_ahead: Duration,
}

/// A single change to the context, delivered in the order it was applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContextEvent {
    Progressed {
        delta: Duration,
        progress: Duration,
        current_exercise_progress: Duration,
        skip_ahead: Duration,
    },
    ExerciseChanged {
        exercise: Option<ExerciseRef>,
    },
    SetChanged {
        set: u32,
    },
    RepetitionChanged {
        repetition: u32,
    },
    PauseChanged {
        is_paused: bool,
    },
    Cancelled,
}

impl ContextState {
    /// Folds one event into this state.
    ///
    /// Applying every event of a context, in order, to a state that started
    /// equal to the context's yields the context's current state.
    pub fn apply(&mut self, event: &ContextEvent) {
        match event {
            ContextEvent::Progressed {
                progress,
                current_exercise_progress,
                skip_ahead,
                ..
            } => {
                self.progress = *progress;
                self.current_exercise_progress = *current_exercise_progress;
                self.skip_ahead = *skip_ahead;
            }
            ContextEvent::ExerciseChanged { exercise } => {
                self.current_exercise = exercise.clone();
                self.current_exercise_progress = Duration::ZERO;
            }
            ContextEvent::SetChanged { set } => self.current_set = *set,
            ContextEvent::RepetitionChanged { repetition } => self.current_repetition = *repetition,
            ContextEvent::PauseChanged { is_paused } => self.is_paused = *is_paused,
            ContextEvent::Cancelled => self.is_cancelled = true,
        }
    }
}

/// Mutable run state shared by an executing action tree and its observers.
///
/// One context is created per run. It is `Sync`, so the caller can keep an
/// `Arc` to pause or cancel while the tree executes on another task.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use workoutrunner::execution::ExecutionContext;
///
/// let context = ExecutionContext::with_skip_ahead(Duration::from_secs(90));
/// assert_eq!(context.skip_ahead(), Duration::from_secs(90));
///
/// context.set_paused(true);
/// context.cancel();
/// assert!(context.is_cancelled());
/// ```
#[derive(Debug)]
pub struct ExecutionContext {
    cancellation: CancellationToken,
    state: watch::Sender<ContextState>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<ContextEvent>>>,
}

impl ExecutionContext {
    /// Creates a context that starts from the beginning.
    pub fn new() -> Self {
        Self::with_skip_ahead(Duration::ZERO)
    }

    /// Creates a context that fast-forwards through the first `skip_ahead`
    /// of the program, used to resume a previously started session.
    pub fn with_skip_ahead(skip_ahead: Duration) -> Self {
        let (state, _) = watch::channel(ContextState {
            skip_ahead,
            ..ContextState::default()
        });

        Self {
            cancellation: CancellationToken::new(),
            state,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn is_paused(&self) -> bool {
        self.state.borrow().is_paused
    }

    pub fn current_exercise(&self) -> Option<ExerciseRef> {
        self.state.borrow().current_exercise.clone()
    }

    pub fn current_set(&self) -> u32 {
        self.state.borrow().current_set
    }

    pub fn current_repetition(&self) -> u32 {
        self.state.borrow().current_repetition
    }

    pub fn progress(&self) -> Duration {
        self.state.borrow().progress
    }

    pub fn current_exercise_progress(&self) -> Duration {
        self.state.borrow().current_exercise_progress
    }

    pub fn skip_ahead(&self) -> Duration {
        self.state.borrow().skip_ahead
    }

    /// Returns a copy of every observable value.
    pub fn snapshot(&self) -> ContextState {
        self.state.borrow().clone()
    }

    /// Returns a receiver that always holds the latest state.
    pub fn subscribe(&self) -> watch::Receiver<ContextState> {
        self.state.subscribe()
    }

    /// Returns a receiver of every change from now on, in order.
    ///
    /// The stream ends when the context is closed or dropped.
    pub fn subscribe_events(&self) -> mpsc::UnboundedReceiver<ContextEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Requests cancellation. Idempotent and permanent.
    pub fn cancel(&self) {
        self.update(|state| {
            if state.is_cancelled {
                return Vec::new();
            }
            state.is_cancelled = true;
            vec![ContextEvent::Cancelled]
        });

        if !self.cancellation.is_cancelled() {
            debug!("Execution context cancelled");
            self.cancellation.cancel();
        }
    }

    /// Pauses or resumes the run.
    pub fn set_paused(&self, is_paused: bool) {
        self.update(|state| {
            if state.is_paused == is_paused {
                return Vec::new();
            }
            state.is_paused = is_paused;
            vec![ContextEvent::PauseChanged { is_paused }]
        });
    }

    /// Completes once the context is neither paused nor cancelled.
    ///
    /// Fails with [`ExecutionError::Cancelled`] if cancellation happens first,
    /// including while suspended here.
    pub async fn wait_while_paused(&self) -> Result<(), ExecutionError> {
        self.check_cancelled()?;

        let mut changes = self.state.subscribe();
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(ExecutionError::Cancelled),
            resumed = async { changes.wait_for(|state| !state.is_paused).await.is_ok() } => {
                if !resumed {
                    return Err(ExecutionError::Cancelled);
                }
                self.check_cancelled()
            }
        }
    }

    /// Completes when the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Drops every event subscription so their streams end.
    pub fn close(&self) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        debug!("Closing {} context subscription(s)", listeners.len());
        listeners.clear();
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), ExecutionError> {
        if self.is_cancelled() {
            Err(ExecutionError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Records elapsed time reported by an action.
    pub(crate) fn add_progress(&self, delta: Duration) {
        self.update(|state| {
            state.progress += delta;
            state.current_exercise_progress += delta;
            state.skip_ahead = state.skip_ahead.saturating_sub(delta);

            vec![ContextEvent::Progressed {
                delta,
                progress: state.progress,
                current_exercise_progress: state.current_exercise_progress,
                skip_ahead: state.skip_ahead,
            }]
        });
    }

    pub(crate) fn set_current_exercise(&self, exercise: Option<ExerciseRef>) {
        self.update(|state| {
            if state.current_exercise == exercise {
                return Vec::new();
            }
            state.current_exercise_progress = Duration::ZERO;
            state.current_exercise = exercise.clone();
            vec![ContextEvent::ExerciseChanged { exercise }]
        });
    }

    pub(crate) fn set_current_set(&self, set: u32) {
        self.update(|state| {
            if state.current_set == set {
                return Vec::new();
            }
            state.current_set = set;
            vec![ContextEvent::SetChanged { set }]
        });
    }

    pub(crate) fn set_current_repetition(&self, repetition: u32) {
        self.update(|state| {
            if state.current_repetition == repetition {
                return Vec::new();
            }
            state.current_repetition = repetition;
            vec![ContextEvent::RepetitionChanged { repetition }]
        });
    }

    /// Applies a change and publishes its events while the state lock is held,
    /// so event order always matches application order.
    fn update<F>(&self, modify: F)
    where
        F: FnOnce(&mut ContextState) -> Vec<ContextEvent>,
    {
        self.state.send_if_modified(|state| {
            let events = modify(state);
            if events.is_empty() {
                return false;
            }
            self.publish(&events);
            true
        });
    }

    fn publish(&self, events: &[ContextEvent]) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        listeners.retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::timeout;

    fn exercise(index: usize, name: &str) -> ExerciseRef {
        ExerciseRef::new(index, name)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ContextEvent>) -> Vec<ContextEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_context_defaults() {
        let context = ExecutionContext::new();

        assert!(!context.is_cancelled());
        assert!(!context.is_paused());
        assert!(context.current_exercise().is_none());
        assert_eq!(context.current_set(), 0);
        assert_eq!(context.current_repetition(), 0);
        assert_eq!(context.progress(), Duration::ZERO);
        assert_eq!(context.current_exercise_progress(), Duration::ZERO);
        assert_eq!(context.skip_ahead(), Duration::ZERO);
    }

    #[test]
    fn test_skip_ahead_is_taken_from_constructor() {
        let context = ExecutionContext::with_skip_ahead(Duration::from_secs(42));
        assert_eq!(context.skip_ahead(), Duration::from_secs(42));
    }

    #[test]
    fn test_add_progress_accumulates() {
        let context = ExecutionContext::new();

        context.add_progress(Duration::from_secs(1));
        context.add_progress(Duration::from_secs(3));

        assert_eq!(context.progress(), Duration::from_secs(4));
        assert_eq!(context.current_exercise_progress(), Duration::from_secs(4));
    }

    #[test]
    fn test_skip_ahead_decreases_and_floors_at_zero() {
        let context = ExecutionContext::with_skip_ahead(Duration::from_secs(5));

        context.add_progress(Duration::from_secs(2));
        assert_eq!(context.skip_ahead(), Duration::from_secs(3));

        context.add_progress(Duration::from_secs(10));
        assert_eq!(context.skip_ahead(), Duration::ZERO);

        context.add_progress(Duration::from_secs(1));
        assert_eq!(context.skip_ahead(), Duration::ZERO);
    }

    #[test]
    fn test_progress_is_monotonic_and_skip_ahead_non_increasing() {
        let context = ExecutionContext::with_skip_ahead(Duration::from_millis(2500));
        let mut events = context.subscribe_events();

        for millis in [400, 0, 900, 1200, 300, 700] {
            context.add_progress(Duration::from_millis(millis));
        }

        let mut last_progress = Duration::ZERO;
        let mut last_skip = Duration::from_millis(2500);
        for event in drain(&mut events) {
            if let ContextEvent::Progressed {
                progress,
                skip_ahead,
                ..
            } = event
            {
                assert!(progress >= last_progress);
                assert!(skip_ahead <= last_skip);
                last_progress = progress;
                last_skip = skip_ahead;
            }
        }

        assert_eq!(last_progress, Duration::from_millis(3500));
        assert_eq!(last_skip, Duration::ZERO);
    }

    #[test]
    fn test_changing_exercise_resets_exercise_progress() {
        let context = ExecutionContext::new();

        context.set_current_exercise(Some(exercise(0, "Squats")));
        context.add_progress(Duration::from_secs(3));
        assert_eq!(context.current_exercise_progress(), Duration::from_secs(3));

        context.set_current_exercise(Some(exercise(1, "Lunges")));
        assert_eq!(context.current_exercise_progress(), Duration::ZERO);

        context.add_progress(Duration::from_secs(2));
        assert_eq!(context.current_exercise_progress(), Duration::from_secs(2));
        assert_eq!(context.progress(), Duration::from_secs(5));

        context.set_current_exercise(None);
        assert_eq!(context.current_exercise_progress(), Duration::ZERO);
        assert_eq!(context.progress(), Duration::from_secs(5));
    }

    #[test]
    fn test_setting_same_exercise_keeps_progress() {
        let context = ExecutionContext::new();
        let mut events = context.subscribe_events();

        context.set_current_exercise(Some(exercise(0, "Squats")));
        context.add_progress(Duration::from_secs(3));
        context.set_current_exercise(Some(exercise(0, "Squats")));

        assert_eq!(context.current_exercise_progress(), Duration::from_secs(3));
        let exercise_changes = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, ContextEvent::ExerciseChanged { .. }))
            .count();
        assert_eq!(exercise_changes, 1);
    }

    #[test]
    fn test_set_and_repetition_setters() {
        let context = ExecutionContext::new();

        context.set_current_set(2);
        context.set_current_repetition(7);

        assert_eq!(context.current_set(), 2);
        assert_eq!(context.current_repetition(), 7);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let context = ExecutionContext::new();
        let mut events = context.subscribe_events();

        context.cancel();
        context.cancel();

        assert!(context.is_cancelled());
        assert!(context.snapshot().is_cancelled);
        assert_eq!(drain(&mut events), vec![ContextEvent::Cancelled]);
    }

    #[test]
    fn test_events_are_delivered_in_order() {
        let context = ExecutionContext::new();
        let mut events = context.subscribe_events();

        context.set_current_exercise(Some(exercise(0, "Plank")));
        context.set_current_set(1);
        context.set_current_repetition(1);
        context.add_progress(Duration::from_secs(1));
        context.set_paused(true);
        context.set_paused(true);
        context.set_paused(false);

        assert_eq!(
            drain(&mut events),
            vec![
                ContextEvent::ExerciseChanged {
                    exercise: Some(exercise(0, "Plank"))
                },
                ContextEvent::SetChanged { set: 1 },
                ContextEvent::RepetitionChanged { repetition: 1 },
                ContextEvent::Progressed {
                    delta: Duration::from_secs(1),
                    progress: Duration::from_secs(1),
                    current_exercise_progress: Duration::from_secs(1),
                    skip_ahead: Duration::ZERO,
                },
                ContextEvent::PauseChanged { is_paused: true },
                ContextEvent::PauseChanged { is_paused: false },
            ]
        );
    }

    #[test]
    fn test_applying_events_reproduces_state() {
        let context = ExecutionContext::with_skip_ahead(Duration::from_secs(2));
        let mut events = context.subscribe_events();
        let mut replayed = context.snapshot();

        context.set_current_exercise(Some(exercise(0, "Squats")));
        context.add_progress(Duration::from_secs(3));
        context.set_current_exercise(Some(exercise(1, "Lunges")));
        context.set_current_set(2);
        context.set_current_repetition(4);
        context.add_progress(Duration::from_secs(1));
        context.set_paused(true);
        context.cancel();

        for event in drain(&mut events) {
            replayed.apply(&event);
        }

        assert_eq!(replayed, context.snapshot());
    }

    #[test]
    fn test_close_ends_event_streams() {
        let context = ExecutionContext::new();
        let mut events = context.subscribe_events();

        context.add_progress(Duration::from_secs(1));
        context.close();
        context.add_progress(Duration::from_secs(1));

        assert!(matches!(
            events.try_recv(),
            Ok(ContextEvent::Progressed { .. })
        ));
        assert!(matches!(
            events.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_watch_receiver_sees_latest_state() {
        let context = ExecutionContext::new();
        let changes = context.subscribe();

        context.add_progress(Duration::from_secs(4));
        context.set_paused(true);

        let state = changes.borrow();
        assert_eq!(state.progress, Duration::from_secs(4));
        assert!(state.is_paused);
    }

    #[test]
    fn test_state_serializes_to_json() {
        let context = ExecutionContext::new();
        context.set_current_exercise(Some(exercise(3, "Burpees")));

        let json = serde_json::to_value(context.snapshot()).unwrap();
        assert_eq!(json["current_exercise"]["name"], "Burpees");
        assert_eq!(json["is_paused"], false);
    }

    #[tokio::test]
    async fn test_wait_while_paused_resolves_immediately_when_not_paused() {
        let context = ExecutionContext::new();
        assert_eq!(context.wait_while_paused().await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_while_paused_resolves_after_unpause() {
        let context = Arc::new(ExecutionContext::new());
        context.set_paused(true);

        let waiter = {
            let context = Arc::clone(&context);
            tokio::spawn(async move { context.wait_while_paused().await })
        };

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!waiter.is_finished());

        context.set_paused(false);
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_while_paused_stays_pending_while_paused() {
        let context = ExecutionContext::new();
        context.set_paused(true);

        let result = timeout(Duration::from_secs(5), context.wait_while_paused()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_paused_resolves_as_cancelled() {
        let context = Arc::new(ExecutionContext::new());
        context.set_paused(true);

        let waiter = {
            let context = Arc::clone(&context);
            tokio::spawn(async move { context.wait_while_paused().await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        context.cancel();

        assert_eq!(waiter.await.unwrap(), Err(ExecutionError::Cancelled));
    }

    #[tokio::test]
    async fn test_wait_while_paused_after_cancel_fails() {
        let context = ExecutionContext::new();
        context.cancel();

        assert_eq!(
            context.wait_while_paused().await,
            Err(ExecutionError::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_cancelled_completes_after_cancel() {
        let context = ExecutionContext::new();
        context.cancel();
        timeout(Duration::from_secs(1), context.cancelled())
            .await
            .expect("cancelled() should resolve");
    }
}
