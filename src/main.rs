//! WorkoutRunner CLI Entry Point
//!
//! Provides command-line interface for running workout programs.
//!
//! # Usage
//!
//! ```bash
//! # Run a program
//! workoutrunner morning.workout
//!
//! # With pause control
//! workoutrunner morning.workout /tmp/workout.pause
//!
//! # Resume 12 minutes in
//! workoutrunner morning.workout --skip-ahead "12m"
//!
//! # Machine-readable progress
//! workoutrunner morning.workout --json --mute
//! ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use log::{error, info, warn};
use serde_json::json;

use workoutrunner::execution::{format_duration, Engine, RunOutcome, RunSummary};
use workoutrunner::program::{load_program, parse_duration};
use workoutrunner::services::{
    CommandSpeechService, LogSpeechService, Services, SpeechService,
};
use workoutrunner::{APP_NAME, VERSION};

/// Where spoken prompts go.
#[derive(Debug, Clone, PartialEq)]
enum SpeechChoice {
    /// First text-to-speech command found on `PATH`, else the log
    Auto,
    /// An explicit text-to-speech program
    Command(String),
    /// Prompts are only logged
    Mute,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    program_path: Option<String>,
    pause_flag_path: Option<String>,
    skip_ahead: Duration,
    speech: SpeechChoice,
    json: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program_path: None,
            pause_flag_path: None,
            skip_ahead: Duration::ZERO,
            speech: SpeechChoice::Auto,
            json: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Timed Workout Execution Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: workoutrunner [OPTIONS] <PROGRAM_FILE> [PAUSE_FLAG_PATH]");
    println!();
    println!("Arguments:");
    println!("  <PROGRAM_FILE>          Path to the workout program");
    println!("  [PAUSE_FLAG_PATH]       Optional path for pause/resume control");
    println!();
    println!("Options:");
    println!("  --skip-ahead DURATION   Start this far into the program (e.g. \"2m 30s\")");
    println!("  --speech CMD            Text-to-speech program for prompts");
    println!("  --mute                  Log prompts instead of speaking them");
    println!("  --json                  Print progress events as JSON lines");
    println!("  --verbose               Enable debug logging");
    println!("  --help                  Show this help message");
    println!("  --version               Show version information");
    println!();
    println!("Examples:");
    println!("  workoutrunner morning.workout");
    println!("  workoutrunner morning.workout /tmp/workout.pause");
    println!("  workoutrunner morning.workout --skip-ahead \"12m\" --speech espeak");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--mute" => {
                config.speech = SpeechChoice::Mute;
            }
            "--json" => {
                config.json = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--skip-ahead" => {
                i += 1;
                if i >= args.len() {
                    return Err("--skip-ahead requires a duration argument".to_string());
                }
                config.skip_ahead = parse_duration(&args[i]).map_err(|e| e.to_string())?;
            }
            "--speech" => {
                i += 1;
                if i >= args.len() {
                    return Err("--speech requires a command argument".to_string());
                }
                config.speech = SpeechChoice::Command(args[i].clone());
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                // Positional argument
                match positional_index {
                    0 => config.program_path = Some(arg.clone()),
                    1 => config.pause_flag_path = Some(arg.clone()),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    if config.program_path.is_none() {
        return Err("Missing <PROGRAM_FILE> argument".to_string());
    }

    Ok(config)
}

/// Picks the speech backend for the configured choice.
fn select_speech(choice: &SpeechChoice) -> Arc<dyn SpeechService> {
    match choice {
        SpeechChoice::Command(program) => {
            info!("Speech: {}", program);
            Arc::new(CommandSpeechService::new(program))
        }
        SpeechChoice::Mute => {
            info!("Speech: muted");
            Arc::new(LogSpeechService)
        }
        SpeechChoice::Auto => match CommandSpeechService::detect() {
            Some(service) => {
                info!("Speech: {}", service.program().display());
                Arc::new(service)
            }
            None => {
                warn!("No text-to-speech command found on PATH - prompts will be logged");
                Arc::new(LogSpeechService)
            }
        },
    }
}

/// Prints the end-of-run report.
fn print_summary(summary: &RunSummary, total: Duration, json: bool) {
    let outcome = match summary.outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Cancelled => "cancelled",
    };

    if json {
        let line = json!({
            "event": "summary",
            "outcome": outcome,
            "progress": summary.progress,
            "total": total,
            "elapsed": summary.elapsed,
            "exercises": summary.exercises,
        });
        println!("{}", line);
        return;
    }

    println!();
    match summary.outcome {
        RunOutcome::Completed => println!("{}", "Workout completed".green().bold()),
        RunOutcome::Cancelled => println!("{}", "Workout cancelled".yellow().bold()),
    }
    println!(
        "Program time: {} of {}",
        format_duration(summary.progress),
        format_duration(total)
    );
    println!("Total execution time: {:.2?}", summary.elapsed);
    println!("{}", summary.timeline.gantt_chart());
}

/// Main application entry point.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    if !config.json {
        print_banner();
    }

    let program_path = config.program_path.unwrap_or_default();
    let services = Services::default().with_speech(select_speech(&config.speech));

    // Load program
    let program = load_program(&program_path, &services).map_err(|e| {
        error!("Failed to load program: {}", e);
        format!("Could not load program from '{}': {}", program_path, e)
    })?;

    info!(
        "Program loaded: '{}', {} exercises, {}",
        program.name(),
        program.len(),
        format_duration(program.duration())
    );

    if !config.skip_ahead.is_zero() && config.skip_ahead >= program.duration() {
        warn!(
            "Skip-ahead of {} covers the whole program",
            format_duration(config.skip_ahead)
        );
    }

    let total = program.duration();

    // Create and configure engine
    let mut engine = Engine::new(program);
    engine.set_skip_ahead(config.skip_ahead);
    engine.set_json_output(config.json);
    engine.set_handle_ctrl_c(true);

    if let Some(pause_path) = config.pause_flag_path {
        engine.set_pause_flag_path(pause_path);
    }

    // Execute program
    let summary = engine.run().await?;
    print_summary(&summary, total, config.json);

    if summary.outcome == RunOutcome::Cancelled {
        info!(
            "Run was cancelled - resume later with --skip-ahead \"{}\"",
            format_duration(summary.progress)
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
