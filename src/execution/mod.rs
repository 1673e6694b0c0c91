//! Program Execution Module
//!
//! Provides the run-time machinery for executing workout programs,
//! including shared run state, pause/resume and cancellation.
//!
//! # Architecture
//!
//! - [`context`]: Shared state of a single run and its event stream
//! - [`engine`]: Main execution engine orchestrating program runs
//! - [`error`]: Failure types raised while executing actions

pub mod context;
pub mod engine;
pub mod error;

pub use context::{ContextEvent, ContextState, ExecutionContext};
pub use engine::{format_duration, Engine, RunOutcome, RunSummary};
pub use error::{ExecutionError, ServiceError};
