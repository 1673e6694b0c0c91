//! Leaf Actions
//!
//! Timed waits. Every wait first consumes the context's skip-ahead budget:
//! a wait that fits entirely inside it completes instantly, reporting its
//! whole duration, and never touches a service. Otherwise the remaining time
//! is waited in short ticks so that pausing and cancelling take effect
//! promptly and progress is reported as it elapses.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::execution::{ExecutionContext, ExecutionError};
use crate::services::{DelayService, SpeechService};

/// Longest single delay; also the granularity of progress reports.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Prompt spoken by [`PrepareAction`].
pub const PREPARE_PROMPT: &str = "prepare";

/// Waits for a fixed duration.
#[derive(Clone)]
pub struct WaitAction {
    delay: Arc<dyn DelayService>,
    duration: Duration,
}

impl WaitAction {
    pub fn new(delay: Arc<dyn DelayService>, duration: Duration) -> Self {
        Self { delay, duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub async fn execute(&self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        let Some(remaining) = fast_forward(self.duration, context)? else {
            return Ok(());
        };

        debug!("Waiting {:?}", remaining);
        wait_for(self.delay.as_ref(), remaining, context).await
    }
}

impl fmt::Debug for WaitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitAction")
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

/// Speaks a prompt and waits for a fixed duration.
///
/// The prompt is spoken alongside the wait, so it does not lengthen the
/// action. A wait that is skipped entirely is never prompted.
#[derive(Clone)]
pub struct WaitWithPromptAction {
    delay: Arc<dyn DelayService>,
    speech: Arc<dyn SpeechService>,
    duration: Duration,
    prompt: String,
}

impl WaitWithPromptAction {
    pub fn new(
        delay: Arc<dyn DelayService>,
        speech: Arc<dyn SpeechService>,
        duration: Duration,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            delay,
            speech,
            duration,
            prompt: prompt.into(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub async fn execute(&self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        let Some(remaining) = fast_forward(self.duration, context)? else {
            return Ok(());
        };

        context.wait_while_paused().await?;

        debug!("Prompting '{}' and waiting {:?}", self.prompt, remaining);
        let speak = async {
            self.speech
                .speak(&self.prompt)
                .await
                .map_err(ExecutionError::from)
        };
        tokio::try_join!(speak, wait_for(self.delay.as_ref(), remaining, context))?;

        Ok(())
    }
}

impl fmt::Debug for WaitWithPromptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitWithPromptAction")
            .field("duration", &self.duration)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

/// A prompt-wait that announces "prepare".
#[derive(Debug, Clone)]
pub struct PrepareAction {
    inner: WaitWithPromptAction,
}

impl PrepareAction {
    pub fn new(
        delay: Arc<dyn DelayService>,
        speech: Arc<dyn SpeechService>,
        duration: Duration,
    ) -> Self {
        Self {
            inner: WaitWithPromptAction::new(delay, speech, duration, PREPARE_PROMPT),
        }
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration()
    }

    pub async fn execute(&self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        self.inner.execute(context).await
    }
}

/// Consumes skip-ahead for a wait of `duration`.
///
/// Returns `None` when the whole wait was skipped, otherwise the part that
/// still has to be waited.
///
/// A fully skipped wait completes even on a cancelled context; a partial one
/// reports nothing once cancelled.
fn fast_forward(
    duration: Duration,
    context: &ExecutionContext,
) -> Result<Option<Duration>, ExecutionError> {
    let skip_ahead = context.skip_ahead();

    if skip_ahead >= duration {
        debug!("Skipping {:?} wait", duration);
        context.add_progress(duration);
        return Ok(None);
    }

    if !skip_ahead.is_zero() {
        context.check_cancelled()?;
        debug!("Resuming {:?} wait after {:?}", duration, skip_ahead);
        context.add_progress(skip_ahead);
    }

    Ok(Some(duration - skip_ahead))
}

/// Waits `remaining` in ticks, honouring pause and cancellation between them.
async fn wait_for(
    delay: &dyn DelayService,
    mut remaining: Duration,
    context: &ExecutionContext,
) -> Result<(), ExecutionError> {
    while !remaining.is_zero() {
        context.wait_while_paused().await?;

        let tick = remaining.min(PROGRESS_INTERVAL);
        tokio::select! {
            biased;
            _ = context.cancelled() => return Err(ExecutionError::Cancelled),
            result = delay.delay(tick) => result?,
        }

        // A pause engaged during the tick holds back its progress.
        context.wait_while_paused().await?;
        context.add_progress(tick);
        remaining -= tick;
    }

    Ok(())
}
