//! Actions
//!
//! The executable units of a workout program. An [`Action`] is either a leaf
//! that waits (optionally with a spoken prompt) or a composite that runs its
//! children in order.
//!
//! Action trees are immutable: all run state lives in the
//! [`ExecutionContext`] passed to [`Action::execute`], so one tree can be
//! executed again against a fresh context.
//!
//! # Variants
//!
//! - [`wait`]: [`WaitAction`], [`WaitWithPromptAction`], [`PrepareAction`]
//! - [`sequence`]: [`SequenceAction`]
//! - [`structural`]: exercise, set and repetition groupings

pub mod sequence;
pub mod structural;
pub mod wait;

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use crate::execution::{ExecutionContext, ExecutionError};

pub use sequence::SequenceAction;
pub use structural::{ExerciseGroupAction, RepetitionGroupAction, SetGroupAction};
pub use wait::{PrepareAction, WaitAction, WaitWithPromptAction};

/// A node in an action tree.
#[derive(Debug, Clone)]
pub enum Action {
    Wait(WaitAction),
    WaitWithPrompt(WaitWithPromptAction),
    Prepare(PrepareAction),
    Sequence(SequenceAction),
    Exercise(ExerciseGroupAction),
    Set(SetGroupAction),
    Repetition(RepetitionGroupAction),
}

impl Action {
    /// Total time this action takes when run without skipping or pausing.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Wait(action) => action.duration(),
            Self::WaitWithPrompt(action) => action.duration(),
            Self::Prepare(action) => action.duration(),
            Self::Sequence(action) => action.duration(),
            Self::Exercise(action) => action.duration(),
            Self::Set(action) => action.duration(),
            Self::Repetition(action) => action.duration(),
        }
    }

    /// Runs the action against `context`.
    ///
    /// Fails with [`ExecutionError::Cancelled`] once the context is cancelled,
    /// or with the first capability failure.
    pub fn execute<'a>(
        &'a self,
        context: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<(), ExecutionError>> {
        match self {
            Self::Wait(action) => action.execute(context).boxed(),
            Self::WaitWithPrompt(action) => action.execute(context).boxed(),
            Self::Prepare(action) => action.execute(context).boxed(),
            Self::Sequence(action) => action.execute(context).boxed(),
            Self::Exercise(action) => action.execute(context).boxed(),
            Self::Set(action) => action.execute(context).boxed(),
            Self::Repetition(action) => action.execute(context).boxed(),
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Wait(_) => "wait",
            Self::WaitWithPrompt(_) => "wait-with-prompt",
            Self::Prepare(_) => "prepare",
            Self::Sequence(_) => "sequence",
            Self::Exercise(_) => "exercise",
            Self::Set(_) => "set",
            Self::Repetition(_) => "repetition",
        }
    }
}

impl From<WaitAction> for Action {
    fn from(action: WaitAction) -> Self {
        Self::Wait(action)
    }
}

impl From<WaitWithPromptAction> for Action {
    fn from(action: WaitWithPromptAction) -> Self {
        Self::WaitWithPrompt(action)
    }
}

impl From<PrepareAction> for Action {
    fn from(action: PrepareAction) -> Self {
        Self::Prepare(action)
    }
}

impl From<SequenceAction> for Action {
    fn from(action: SequenceAction) -> Self {
        Self::Sequence(action)
    }
}

impl From<ExerciseGroupAction> for Action {
    fn from(action: ExerciseGroupAction) -> Self {
        Self::Exercise(action)
    }
}

impl From<SetGroupAction> for Action {
    fn from(action: SetGroupAction) -> Self {
        Self::Set(action)
    }
}

impl From<RepetitionGroupAction> for Action {
    fn from(action: RepetitionGroupAction) -> Self {
        Self::Repetition(action)
    }
}
