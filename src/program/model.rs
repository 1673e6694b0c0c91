//! Program Data Model
//!
//! An [`ExerciseProgram`] is a named list of [`Exercise`]s; each exercise owns
//! the action tree that performs it. Both are built by the parser and never
//! change afterwards.
//!
//! # Example Program
//!
//! ```text
//! # Morning Routine
//!
//! ## Push Ups
//! 3 sets x 10 reps
//! Prepare for 10s
//! Wait for 2s saying down
//! Wait for 1s
//! Rest for 1m
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actions::{Action, SequenceAction};
use crate::execution::{ExecutionContext, ExecutionError};

/// Identifies an exercise within its program.
///
/// This is what the execution context records as the current exercise.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExerciseRef {
    /// Position of the exercise in the program (0-based)
    pub index: usize,

    /// Name from the `## <name>` header
    pub name: String,
}

impl ExerciseRef {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

/// A single exercise and the actions that perform it.
#[derive(Debug, Clone)]
pub struct Exercise {
    reference: ExerciseRef,
    set_count: u32,
    repetition_count: u32,
    action: Action,
}

impl Exercise {
    /// Creates an exercise around its root action.
    pub fn new(reference: ExerciseRef, set_count: u32, repetition_count: u32, action: Action) -> Self {
        Self {
            reference,
            set_count,
            repetition_count,
            action,
        }
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }

    pub fn reference(&self) -> &ExerciseRef {
        &self.reference
    }

    pub fn set_count(&self) -> u32 {
        self.set_count
    }

    pub fn repetition_count(&self) -> u32 {
        self.repetition_count
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn duration(&self) -> Duration {
        self.action.duration()
    }

    pub async fn execute(&self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        self.action.execute(context).await
    }
}

/// A complete workout: a name and its exercises, run in order.
#[derive(Debug, Clone)]
pub struct ExerciseProgram {
    name: String,
    exercises: Vec<Exercise>,
    root: Action,
}

impl ExerciseProgram {
    pub fn new(name: impl Into<String>, exercises: Vec<Exercise>) -> Self {
        let root = SequenceAction::new(exercises.iter().map(|e| e.action().clone())).into();

        Self {
            name: name.into().trim().to_string(),
            exercises,
            root,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    /// Sequence of every exercise's action.
    pub fn root(&self) -> &Action {
        &self.root
    }

    pub fn duration(&self) -> Duration {
        self.root.duration()
    }

    /// Returns the exercise that would be running `offset` into the program.
    pub fn exercise_at(&self, offset: Duration) -> Option<&Exercise> {
        let mut start = Duration::ZERO;
        for exercise in &self.exercises {
            let end = start + exercise.duration();
            if offset < end {
                return Some(exercise);
            }
            start = end;
        }
        None
    }

    /// Returns the number of exercises.
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    /// Returns true if the program has no exercises.
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub async fn execute(&self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        self.root.execute(context).await
    }
}
