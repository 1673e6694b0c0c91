//! Program Execution Engine
//!
//! The engine that drives a single run of a program, including:
//! - Fast-forwarding to a resume offset (skip-ahead)
//! - Pause/resume functionality via file-based signaling
//! - Cancellation on Ctrl-C
//! - A monitor task that reports progress and builds the timeline

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use log::{debug, error, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use super::context::{ContextEvent, ContextState, ExecutionContext};
use super::error::ExecutionError;
use crate::monitoring::{overall_ratio, EventType, ExecutionTimeline, ExerciseProgress};
use crate::program::ExerciseProgram;

/// Interval for checking the pause flag file.
const PAUSE_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// How a run ended when no service failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every action ran to its end
    Completed,
    /// The run was cancelled before the end
    Cancelled,
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Program time covered, including skipped time
    pub progress: Duration,
    /// Wall-clock time the run took
    pub elapsed: Duration,
    pub timeline: ExecutionTimeline,
    pub exercises: Vec<ExerciseProgress>,
}

/// How the monitor reports events while the run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Text,
    Json,
}

/// Program execution engine.
///
/// Owns a parsed program and runs it once per call to [`Engine::run`],
/// each time against a fresh [`ExecutionContext`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use workoutrunner::execution::Engine;
/// use workoutrunner::load_program;
/// use workoutrunner::services::Services;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let program = load_program("morning.workout", &Services::default())?;
///     let mut engine = Engine::new(program);
///     engine.set_skip_ahead(Duration::from_secs(90));
///     engine.set_pause_flag_path("/tmp/workout.pause");
///
///     let summary = engine.run().await?;
///     println!("{:?}", summary.outcome);
///     Ok(())
/// }
/// ```
pub struct Engine {
    program: ExerciseProgram,
    skip_ahead: Duration,
    pause_flag_path: Option<PathBuf>,
    output: OutputMode,
    handle_ctrl_c: bool,
}

impl Engine {
    /// Creates a new execution engine for a program.
    pub fn new(program: ExerciseProgram) -> Self {
        Self {
            program,
            skip_ahead: Duration::ZERO,
            pause_flag_path: None,
            output: OutputMode::Text,
            handle_ctrl_c: false,
        }
    }

    pub fn program(&self) -> &ExerciseProgram {
        &self.program
    }

    /// Sets how much of the program to fast-forward through.
    pub fn set_skip_ahead(&mut self, skip_ahead: Duration) {
        self.skip_ahead = skip_ahead;
    }

    /// Sets the path for pause/resume signaling.
    pub fn set_pause_flag_path(&mut self, path: impl Into<PathBuf>) {
        self.pause_flag_path = Some(path.into());
    }

    /// Emits every context event as a JSON line instead of text progress.
    pub fn set_json_output(&mut self, json: bool) {
        self.output = if json { OutputMode::Json } else { OutputMode::Text };
    }

    /// Cancels the run when the process receives Ctrl-C.
    pub fn set_handle_ctrl_c(&mut self, handle: bool) {
        self.handle_ctrl_c = handle;
    }

    /// Executes the program against a fresh context.
    pub async fn run(&self) -> Result<RunSummary, ExecutionError> {
        let context = Arc::new(ExecutionContext::with_skip_ahead(self.skip_ahead));
        self.run_with_context(context).await
    }

    /// Executes the program against `context`, which the caller may keep to
    /// pause or cancel the run.
    ///
    /// # Returns
    ///
    /// * `Ok(summary)` - The run completed or was cancelled
    /// * `Err` - A service failed
    pub async fn run_with_context(
        &self,
        context: Arc<ExecutionContext>,
    ) -> Result<RunSummary, ExecutionError> {
        let start_time = Instant::now();

        info!(
            "Starting '{}' ({} exercises, {})",
            self.program.name(),
            self.program.len(),
            format_duration(self.program.duration())
        );
        if !context.skip_ahead().is_zero() {
            info!("Skipping ahead {}", format_duration(context.skip_ahead()));
        }

        let monitor = {
            let (observer, events) = Monitor::attach(&self.program, &context, self.output);
            tokio::spawn(observer.run(events))
        };

        let mut helpers: Vec<JoinHandle<()>> = Vec::new();

        if let Some(ref pause_path) = self.pause_flag_path {
            info!("Pause control: {}", pause_path.display());
            if pause_path.exists() {
                context.set_paused(true);
            }
            helpers.push(tokio::spawn(poll_pause_flag(
                Arc::clone(&context),
                pause_path.clone(),
            )));
        }

        if self.handle_ctrl_c {
            helpers.push(tokio::spawn(cancel_on_ctrl_c(Arc::clone(&context))));
        }

        let result = self.program.execute(&context).await;

        for helper in &helpers {
            helper.abort();
        }
        context.close();

        let observer = monitor.await.unwrap_or_else(|e| {
            error!("Monitor task failed: {}", e);
            Monitor::new(&self.program, context.snapshot(), self.output)
        });
        let Monitor {
            mut timeline,
            exercises,
            ..
        } = observer;

        let closing = match &result {
            Ok(()) => EventType::Completed,
            Err(ExecutionError::Cancelled) => EventType::Cancelled,
            Err(_) => EventType::Failed,
        };
        if let Some(open) = timeline.open_exercise().cloned() {
            timeline.add_event(open, closing);
        }

        let outcome = match result {
            Ok(()) => RunOutcome::Completed,
            Err(ExecutionError::Cancelled) => RunOutcome::Cancelled,
            Err(e) => {
                error!("Run of '{}' failed: {}", self.program.name(), e);
                return Err(e);
            }
        };

        let summary = RunSummary {
            outcome,
            progress: context.progress(),
            elapsed: start_time.elapsed(),
            timeline,
            exercises,
        };

        info!(
            "Run {} after {} of program time ({:.2?} wall clock)",
            match outcome {
                RunOutcome::Completed => "completed",
                RunOutcome::Cancelled => "cancelled",
            },
            format_duration(summary.progress),
            summary.elapsed
        );

        Ok(summary)
    }
}

/// Keeps the context paused for as long as the flag file exists.
async fn poll_pause_flag(context: Arc<ExecutionContext>, pause_path: PathBuf) {
    let mut interval = tokio::time::interval(PAUSE_CHECK_INTERVAL);

    loop {
        tokio::select! {
            _ = context.cancelled() => break,
            _ = interval.tick() => {
                let paused = pause_flag_exists(&pause_path).await;
                if paused != context.is_paused() {
                    context.set_paused(paused);
                }
            }
        }
    }
}

async fn pause_flag_exists(pause_path: &Path) -> bool {
    tokio::fs::try_exists(pause_path).await.unwrap_or_else(|e| {
        warn!("Could not check pause flag {}: {}", pause_path.display(), e);
        false
    })
}

async fn cancel_on_ctrl_c(context: Arc<ExecutionContext>) {
    tokio::select! {
        _ = context.cancelled() => {}
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                warn!("Interrupt received - cancelling run");
                context.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    }
}

/// Consumes context events for the duration of a run.
#[derive(Debug)]
struct Monitor {
    output: OutputMode,
    state: ContextState,
    total: Duration,
    exercise_count: usize,
    exercises: Vec<ExerciseProgress>,
    timeline: ExecutionTimeline,
}

impl Monitor {
    fn new(program: &ExerciseProgram, state: ContextState, output: OutputMode) -> Self {
        Self {
            output,
            state,
            total: program.duration(),
            exercise_count: program.len(),
            exercises: ExerciseProgress::for_program(program),
            timeline: ExecutionTimeline::new(),
        }
    }

    /// Starts observing `context` from its current state.
    fn attach(
        program: &ExerciseProgram,
        context: &ExecutionContext,
        output: OutputMode,
    ) -> (Self, UnboundedReceiver<ContextEvent>) {
        // Subscribe before the snapshot so no event falls between them.
        let events = context.subscribe_events();
        (Self::new(program, context.snapshot(), output), events)
    }

    async fn run(mut self, mut events: UnboundedReceiver<ContextEvent>) -> Self {
        while let Some(event) = events.recv().await {
            self.observe(&event);
        }
        debug!("Event stream closed");
        self
    }

    fn observe(&mut self, event: &ContextEvent) {
        self.state.apply(event);
        for progress in &mut self.exercises {
            progress.update(&self.state);
        }

        match event {
            ContextEvent::ExerciseChanged { exercise } => {
                if let Some(previous) = self.timeline.open_exercise().cloned() {
                    self.timeline.add_event(previous, EventType::Completed);
                }
                if let Some(exercise) = exercise {
                    info!(
                        "Exercise {}/{}: {}",
                        exercise.index + 1,
                        self.exercise_count,
                        exercise.name
                    );
                    self.timeline.add_event(exercise.clone(), EventType::Started);
                }
            }
            ContextEvent::PauseChanged { is_paused: true } => {
                info!("Execution paused - waiting for resume signal");
            }
            ContextEvent::PauseChanged { is_paused: false } => info!("Resumed"),
            ContextEvent::Cancelled => warn!("Run cancelled"),
            _ => {}
        }

        match self.output {
            OutputMode::Json => match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize event: {}", e),
            },
            OutputMode::Text => self.print_text(event),
        }
    }

    fn print_text(&self, event: &ContextEvent) {
        // Nothing to show while fast-forwarding.
        if !self.state.skip_ahead.is_zero() {
            return;
        }

        match event {
            ContextEvent::ExerciseChanged {
                exercise: Some(exercise),
            } => {
                println!();
                println!("{}", exercise.name.bold().cyan());
            }
            ContextEvent::RepetitionChanged { repetition } => {
                let percent = overall_ratio(&self.state, self.total) * 100.0;
                println!(
                    "  set {} {} rep {}  {}",
                    self.state.current_set,
                    "·".dimmed(),
                    repetition,
                    format!("[{:>3.0}%]", percent).green()
                );
            }
            ContextEvent::PauseChanged { is_paused } => {
                let label = if *is_paused { "paused" } else { "resumed" };
                println!("  {}", label.yellow());
            }
            _ => {}
        }
    }
}

/// Formats a duration as `1h 2m 5s`, the same way programs write them.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}
