//! Recording service doubles shared by unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{DelayService, Services, SpeechService};
use crate::execution::ServiceError;

/// Completes every delay immediately and records what was asked for.
#[derive(Default)]
pub(crate) struct RecordingDelay {
    calls: Mutex<Vec<Duration>>,
    fail_with: Option<ServiceError>,
}

impl RecordingDelay {
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(ServiceError::delay(message)),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn total(&self) -> Duration {
        self.calls().into_iter().sum()
    }
}

#[async_trait]
impl DelayService for RecordingDelay {
    async fn delay(&self, duration: Duration) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(duration);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

type SpeakHook = Box<dyn Fn(&str) + Send + Sync>;

/// Records every prompt and optionally runs a hook when one is spoken.
#[derive(Default)]
pub(crate) struct RecordingSpeech {
    prompts: Mutex<Vec<String>>,
    on_speak: Option<SpeakHook>,
    fail_with: Option<ServiceError>,
}

impl RecordingSpeech {
    pub(crate) fn with_hook(hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            on_speak: Some(Box::new(hook)),
            ..Self::default()
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(ServiceError::speech(message)),
            ..Self::default()
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechService for RecordingSpeech {
    async fn speak(&self, text: &str) -> Result<(), ServiceError> {
        self.prompts.lock().unwrap().push(text.to_string());
        if let Some(hook) = &self.on_speak {
            hook(text);
        }
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Builds a [`Services`] bundle around the given doubles.
pub(crate) fn services(delay: &Arc<RecordingDelay>, speech: &Arc<RecordingSpeech>) -> Services {
    Services::new(delay.clone(), speech.clone())
}
