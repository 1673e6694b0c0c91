//! Execution Errors
//!
//! Failures that can end a run. Cancellation is modelled as an error value so
//! it short-circuits every enclosing sequence through `?`, but callers are
//! expected to treat it as a normal stop.

use thiserror::Error;

/// Failure reported by a delay or speech backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{service} service failed: {message}")]
pub struct ServiceError {
    /// Which capability failed ("delay", "speech", ...)
    pub service: &'static str,
    /// Backend-specific description
    pub message: String,
}

impl ServiceError {
    /// Creates an error for the delay capability.
    pub fn delay(message: impl Into<String>) -> Self {
        Self {
            service: "delay",
            message: message.into(),
        }
    }

    /// Creates an error for the speech capability.
    pub fn speech(message: impl Into<String>) -> Self {
        Self {
            service: "speech",
            message: message.into(),
        }
    }
}

/// Reasons an action tree stops before completing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// The context was cancelled.
    #[error("execution was cancelled")]
    Cancelled,

    /// A capability backend failed; the run is aborted without retry.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ExecutionError {
    /// Returns true if this is a cancellation rather than a real failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
