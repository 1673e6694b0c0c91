//! WorkoutRunner - Timed Workout Execution Engine
//!
//! Runs structured workout programs (exercises made of sets, repetitions,
//! timed waits and spoken prompts) with pause/resume, cancellation and
//! resuming part-way through via skip-ahead.
//!
//! # Architecture
//!
//! The library is organized into five main modules:
//!
//! - [`program`]: Program data model and the text format parser
//! - [`actions`]: The executable action tree (waits, sequences, groupings)
//! - [`execution`]: Shared run state and the execution engine
//! - [`services`]: Delay and speech capabilities injected into actions
//! - [`monitoring`]: Progress tracking and execution timeline
//!
//! # Example
//!
//! ```rust,no_run
//! use workoutrunner::execution::{Engine, RunOutcome};
//! use workoutrunner::load_program;
//! use workoutrunner::services::Services;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a program, wiring in real-time delays
//!     let program = load_program("morning.workout", &Services::default())?;
//!
//!     // Create execution engine
//!     let mut engine = Engine::new(program);
//!     engine.set_pause_flag_path("/tmp/workout.pause");
//!
//!     // Execute the program
//!     let summary = engine.run().await?;
//!     assert_eq!(summary.outcome, RunOutcome::Completed);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod execution;
pub mod monitoring;
pub mod program;
pub mod services;

// Re-export commonly used types
pub use actions::Action;
pub use execution::{Engine, ExecutionContext, ExecutionError};
pub use program::{load_program, parse_program, Exercise, ExerciseProgram};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "WorkoutRunner";
