//! Exercise Progress
//!
//! Derived, display-oriented values computed from [`ContextState`] snapshots.

use std::time::Duration;

use serde::Serialize;

use crate::execution::ContextState;
use crate::program::{Exercise, ExerciseProgram, ExerciseRef};

/// Progress of one exercise as seen by an observer of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseProgress {
    exercise: ExerciseRef,
    duration: Duration,
    elapsed: Duration,
    is_active: bool,
}

impl ExerciseProgress {
    pub fn new(exercise: &Exercise) -> Self {
        Self {
            exercise: exercise.reference().clone(),
            duration: exercise.duration(),
            elapsed: Duration::ZERO,
            is_active: false,
        }
    }

    /// One entry per exercise of `program`, in order.
    pub fn for_program(program: &ExerciseProgram) -> Vec<Self> {
        program.exercises().iter().map(Self::new).collect()
    }

    /// Folds a new context snapshot into this exercise's values.
    ///
    /// `elapsed` follows the context while this exercise is current and
    /// keeps its last value once another exercise takes over.
    pub fn update(&mut self, state: &ContextState) {
        let is_current = state.current_exercise.as_ref() == Some(&self.exercise);

        self.is_active = is_current && state.skip_ahead.is_zero();
        if is_current {
            self.elapsed = state.current_exercise_progress;
        }
    }

    pub fn exercise(&self) -> &ExerciseRef {
        &self.exercise
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// True while this exercise is current and no longer being skipped.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Fraction of the exercise done, in `[0, 1]`.
    pub fn ratio(&self) -> f64 {
        ratio(self.elapsed, self.duration)
    }
}

/// Fraction of the whole program done, in `[0, 1]`.
pub fn overall_ratio(state: &ContextState, total: Duration) -> f64 {
    ratio(state.progress, total)
}

fn ratio(elapsed: Duration, total: Duration) -> f64 {
    let value = elapsed.as_secs_f64() / total.as_secs_f64();
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ExerciseGroupAction, SequenceAction, WaitAction};
    use crate::services::testing::RecordingDelay;
    use std::sync::Arc;

    fn exercise(index: usize, name: &str, secs: u64) -> Exercise {
        let delay = Arc::new(RecordingDelay::default());
        let reference = ExerciseRef::new(index, name);
        let action = ExerciseGroupAction::new(
            reference.clone(),
            SequenceAction::new(vec![WaitAction::new(delay, Duration::from_secs(secs)).into()]),
        );
        Exercise::new(reference, 1, 1, action.into())
    }

    fn state(current: Option<ExerciseRef>, elapsed: u64, skip_ahead: u64) -> ContextState {
        ContextState {
            current_exercise: current,
            current_exercise_progress: Duration::from_secs(elapsed),
            skip_ahead: Duration::from_secs(skip_ahead),
            ..ContextState::default()
        }
    }

    #[test]
    fn test_initial_progress() {
        let progress = ExerciseProgress::new(&exercise(0, "Plank", 60));

        assert!(!progress.is_active());
        assert_eq!(progress.elapsed(), Duration::ZERO);
        assert_eq!(progress.duration(), Duration::from_secs(60));
        assert_eq!(progress.ratio(), 0.0);
    }

    #[test]
    fn test_tracks_current_exercise() {
        let plank = exercise(0, "Plank", 60);
        let mut progress = ExerciseProgress::new(&plank);

        progress.update(&state(Some(plank.reference().clone()), 15, 0));

        assert!(progress.is_active());
        assert_eq!(progress.elapsed(), Duration::from_secs(15));
        assert_eq!(progress.ratio(), 0.25);
    }

    #[test]
    fn test_not_active_while_skipping() {
        let plank = exercise(0, "Plank", 60);
        let mut progress = ExerciseProgress::new(&plank);

        progress.update(&state(Some(plank.reference().clone()), 30, 10));

        assert!(!progress.is_active());
        assert_eq!(progress.elapsed(), Duration::from_secs(30));
    }

    #[test]
    fn test_keeps_elapsed_after_exercise_changes() {
        let plank = exercise(0, "Plank", 60);
        let dips = exercise(1, "Dips", 30);
        let mut progress = ExerciseProgress::new(&plank);

        progress.update(&state(Some(plank.reference().clone()), 60, 0));
        progress.update(&state(Some(dips.reference().clone()), 5, 0));

        assert!(!progress.is_active());
        assert_eq!(progress.elapsed(), Duration::from_secs(60));
        assert_eq!(progress.ratio(), 1.0);
    }

    #[test]
    fn test_ratio_is_zero_for_empty_exercise() {
        let empty = exercise(0, "Breathe", 0);
        let mut progress = ExerciseProgress::new(&empty);

        progress.update(&state(Some(empty.reference().clone()), 0, 0));

        assert_eq!(progress.ratio(), 0.0);
    }

    #[test]
    fn test_overall_ratio() {
        let mut snapshot = ContextState::default();
        snapshot.progress = Duration::from_secs(30);

        assert_eq!(overall_ratio(&snapshot, Duration::from_secs(120)), 0.25);
        assert_eq!(overall_ratio(&snapshot, Duration::from_secs(10)), 1.0);
        assert_eq!(overall_ratio(&snapshot, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_for_program() {
        let program = ExerciseProgram::new(
            "Core",
            vec![exercise(0, "Plank", 60), exercise(1, "Dips", 30)],
        );

        let entries = ExerciseProgress::for_program(&program);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].exercise().name, "Dips");
    }
}
