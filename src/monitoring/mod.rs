//! Run Monitoring Module
//!
//! Provides utilities for observing a workout while it runs and
//! summarising it afterwards.
//!
//! # Components
//!
//! - [`ExerciseProgress`]: Per-exercise progress derived from context snapshots
//! - [`ExecutionTimeline`]: Exercise start/end timing for Gantt charts

pub mod progress;
pub mod timeline;

pub use progress::{overall_ratio, ExerciseProgress};
pub use timeline::{EventType, ExecutionTimeline, TimelineEvent};
