//! Sequential composition of actions.

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use super::Action;
use crate::execution::{ExecutionContext, ExecutionError};

/// Runs child actions one after another.
///
/// Skipping is left to the children: each one consumes the context's
/// skip-ahead itself, so a sequence only has to keep calling them in order.
#[derive(Debug, Clone, Default)]
pub struct SequenceAction {
    children: Arc<[Action]>,
    duration: Duration,
}

impl SequenceAction {
    pub fn new(children: impl IntoIterator<Item = Action>) -> Self {
        let children: Arc<[Action]> = children.into_iter().collect();
        let duration = children.iter().map(Action::duration).sum();

        Self { children, duration }
    }

    /// Sum of the children's durations.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn children(&self) -> &[Action] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Executes every child in order, stopping at the first failure or as
    /// soon as the context is cancelled.
    pub async fn execute(&self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        for (index, child) in self.children.iter().enumerate() {
            if context.is_cancelled() {
                debug!(
                    "Sequence cancelled before child {} of {}",
                    index + 1,
                    self.children.len()
                );
                return Err(ExecutionError::Cancelled);
            }

            child.execute(context).await?;
        }

        Ok(())
    }
}
