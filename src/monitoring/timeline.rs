//! Execution Timeline
//!
//! Tracks exercise start/end times for generating run
//! reports and Gantt charts.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::program::ExerciseRef;

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Exercise became current
    Started,
    /// Exercise ran to its end
    Completed,
    /// Run was cancelled while the exercise was current
    Cancelled,
    /// A service failed while the exercise was current
    Failed,
}

impl EventType {
    fn is_terminal(self) -> bool {
        !matches!(self, Self::Started)
    }
}

/// A single event in the execution timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// The exercise the event belongs to
    pub exercise: ExerciseRef,
    /// Type of event
    pub event_type: EventType,
    /// When the event occurred
    pub timestamp: Instant,
}

/// Tracks the execution timeline of a run.
///
/// Records when each exercise starts and how it ends,
/// enabling generation of Gantt charts and timing reports.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
}

impl ExecutionTimeline {
    /// Creates a new timeline starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Records an event for an exercise.
    pub fn add_event(&mut self, exercise: ExerciseRef, event_type: EventType) {
        self.events.push(TimelineEvent {
            exercise,
            event_type,
            timestamp: Instant::now(),
        });
    }

    /// Returns all recorded events.
    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Returns the exercise that has started but not yet ended, if any.
    pub fn open_exercise(&self) -> Option<&ExerciseRef> {
        let last = self.events.last()?;
        (last.event_type == EventType::Started).then_some(&last.exercise)
    }

    /// Returns the total elapsed time since timeline creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Generates an ASCII Gantt chart representation.
    ///
    /// Each exercise is shown as a bar indicating when it ran
    /// relative to the total run time.
    pub fn gantt_chart(&self) -> String {
        let mut output = String::from("\nExecution Timeline:\n\n");

        let total_time = Instant::now().duration_since(self.start_time).as_millis();

        if total_time == 0 {
            return output;
        }

        // Scale to 50 characters width
        let scale = 50.0 / total_time as f64;

        let mut sorted: Vec<_> = self.spans().into_iter().collect();
        sorted.sort_by_key(|(_, (start, _))| *start);

        for (exercise, (start, end)) in sorted {
            if end > start {
                let start_pos = (start as f64 * scale) as usize;
                let width = ((end - start) as f64 * scale).max(1.0) as usize;

                let mut bar = " ".repeat(start_pos);
                bar.push_str(&"#".repeat(width));

                output.push_str(&format!(
                    "{:12} |{}| ({} ms)\n",
                    truncate(&exercise.name, 12),
                    bar,
                    end - start
                ));
            }
        }

        output.push_str(&format!("\nTotal: {} ms\n", total_time));
        output
    }

    /// Returns exercise durations in milliseconds.
    ///
    /// Keyed by [`ExerciseRef`], so exercises sharing a name stay apart.
    pub fn get_durations(&self) -> HashMap<ExerciseRef, u128> {
        self.spans()
            .into_iter()
            .map(|(exercise, (start, end))| (exercise, end - start))
            .collect()
    }

    /// Start and end offsets (ms) of every exercise that has ended.
    fn spans(&self) -> HashMap<ExerciseRef, (u128, u128)> {
        let mut starts: HashMap<&ExerciseRef, u128> = HashMap::new();
        let mut spans = HashMap::new();

        for event in &self.events {
            let elapsed = event.timestamp.duration_since(self.start_time).as_millis();

            if event.event_type.is_terminal() {
                if let Some(start) = starts.get(&event.exercise) {
                    spans.insert(event.exercise.clone(), (*start, elapsed));
                }
            } else {
                starts.insert(&event.exercise, elapsed);
            }
        }

        spans
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncates a string to a maximum length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:width$}", s, width = max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
