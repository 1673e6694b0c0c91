//! Capability Services
//!
//! The effects leaf actions depend on, behind narrow async traits so they can
//! be swapped for tests or other backends.
//!
//! - [`delay`]: timed waits ([`TokioDelayService`])
//! - [`speech`]: spoken prompts ([`LogSpeechService`], [`CommandSpeechService`])

pub mod delay;
pub mod speech;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::execution::ServiceError;

pub use delay::TokioDelayService;
pub use speech::{CommandSpeechService, LogSpeechService, SPEECH_COMMAND};

/// Waits for a span of time.
#[async_trait]
pub trait DelayService: Send + Sync {
    /// Completes after `duration` has elapsed.
    ///
    /// Callers may drop the returned future to abort the wait.
    async fn delay(&self, duration: Duration) -> Result<(), ServiceError>;
}

/// Speaks a prompt to the user.
#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), ServiceError>;
}

/// The capabilities injected into leaf actions when a program is built.
#[derive(Clone)]
pub struct Services {
    pub delay: Arc<dyn DelayService>,
    pub speech: Arc<dyn SpeechService>,
}

impl Services {
    pub fn new(delay: Arc<dyn DelayService>, speech: Arc<dyn SpeechService>) -> Self {
        Self { delay, speech }
    }

    /// Replaces the speech backend, keeping the delay backend.
    pub fn with_speech(mut self, speech: Arc<dyn SpeechService>) -> Self {
        self.speech = speech;
        self
    }
}

impl Default for Services {
    /// Real-time delays and prompts written to the log.
    fn default() -> Self {
        Self::new(Arc::new(TokioDelayService), Arc::new(LogSpeechService))
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
