//! Structural Actions
//!
//! Sequences that also record where the run currently is: which exercise,
//! which set and which repetition. They add no timing of their own.

use std::time::Duration;

use log::debug;

use super::SequenceAction;
use crate::execution::{ExecutionContext, ExecutionError};
use crate::program::ExerciseRef;

/// Marks an exercise as current, then runs its actions.
#[derive(Debug, Clone)]
pub struct ExerciseGroupAction {
    exercise: ExerciseRef,
    inner: SequenceAction,
}

impl ExerciseGroupAction {
    pub fn new(exercise: ExerciseRef, inner: SequenceAction) -> Self {
        Self { exercise, inner }
    }

    pub fn exercise(&self) -> &ExerciseRef {
        &self.exercise
    }

    pub fn inner(&self) -> &SequenceAction {
        &self.inner
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration()
    }

    pub async fn execute(&self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        debug!("Entering exercise '{}'", self.exercise.name);
        context.set_current_exercise(Some(self.exercise.clone()));
        self.inner.execute(context).await
    }
}

/// Marks a set (1-based) as current, then runs its repetitions.
#[derive(Debug, Clone)]
pub struct SetGroupAction {
    set: u32,
    inner: SequenceAction,
}

impl SetGroupAction {
    pub fn new(set: u32, inner: SequenceAction) -> Self {
        Self { set, inner }
    }

    pub fn set(&self) -> u32 {
        self.set
    }

    pub fn inner(&self) -> &SequenceAction {
        &self.inner
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration()
    }

    pub async fn execute(&self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        context.set_current_set(self.set);
        self.inner.execute(context).await
    }
}

/// Marks a repetition (1-based) as current, then runs its actions.
#[derive(Debug, Clone)]
pub struct RepetitionGroupAction {
    repetition: u32,
    inner: SequenceAction,
}

impl RepetitionGroupAction {
    pub fn new(repetition: u32, inner: SequenceAction) -> Self {
        Self { repetition, inner }
    }

    pub fn repetition(&self) -> u32 {
        self.repetition
    }

    pub fn inner(&self) -> &SequenceAction {
        &self.inner
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration()
    }

    pub async fn execute(&self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        context.set_current_repetition(self.repetition);
        self.inner.execute(context).await
    }
}
