//! Speech Services
//!
//! Prompt backends. [`LogSpeechService`] writes prompts to the log and is the
//! default; [`CommandSpeechService`] hands them to an external text-to-speech
//! program.
//!
//! # Speech Command Resolution
//!
//! When no program is given explicitly, the first of these found on the
//! system PATH is used:
//! 1. `espeak`
//! 2. `spd-say`
//! 3. `say` (macOS)

use std::path::PathBuf;
use std::process::Command;

use async_trait::async_trait;
use log::{debug, info, warn};
use once_cell::sync::Lazy;

use super::SpeechService;
use crate::execution::ServiceError;

/// Text-to-speech programs looked up on the system PATH, in priority order.
const SPEECH_PROGRAMS: &[&str] = &["espeak", "spd-say", "say"];

/// Lazily-resolved path of a text-to-speech program, if one is installed.
pub static SPEECH_COMMAND: Lazy<Option<PathBuf>> = Lazy::new(|| {
    for program in SPEECH_PROGRAMS {
        if let Ok(output) = Command::new("which").arg(program).output() {
            if output.status.success() {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!("Using speech command: {}", path.display());
                    return Some(path);
                }
            }
        }
    }

    warn!("No speech command found");
    warn!("  Searched system PATH for: {}", SPEECH_PROGRAMS.join(", "));
    None
});

/// Writes prompts to the log instead of speaking them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSpeechService;

#[async_trait]
impl SpeechService for LogSpeechService {
    async fn speak(&self, text: &str) -> Result<(), ServiceError> {
        info!("\u{1F50A} {}", text);
        Ok(())
    }
}

/// Speaks prompts by running an external program with the text as its last
/// argument.
#[derive(Debug, Clone)]
pub struct CommandSpeechService {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandSpeechService {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Uses the program found on the PATH, if any.
    pub fn detect() -> Option<Self> {
        SPEECH_COMMAND.as_ref().map(|path| Self::new(path.clone()))
    }

    /// Adds an argument passed before the prompt text.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

#[async_trait]
impl SpeechService for CommandSpeechService {
    async fn speak(&self, text: &str) -> Result<(), ServiceError> {
        debug!("Speaking '{}' with {}", text, self.program.display());

        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ServiceError::speech(format!(
                    "could not run '{}': {}",
                    self.program.display(),
                    e
                ))
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ServiceError::speech(format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_speech_always_succeeds() {
        assert!(LogSpeechService.speak("prepare").await.is_ok());
    }

    #[test]
    fn test_command_speech_builder() {
        let service = CommandSpeechService::new("/usr/bin/espeak").with_arg("-s").with_arg("150");

        assert_eq!(service.program(), &PathBuf::from("/usr/bin/espeak"));
        assert_eq!(service.args, vec!["-s".to_string(), "150".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_speech_runs_program() {
        let service = CommandSpeechService::new("echo");
        assert!(service.speak("rest").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_speech_reports_failed_exit() {
        let service = CommandSpeechService::new("false");
        let err = service.speak("rest").await.unwrap_err();

        assert_eq!(err.service, "speech");
        assert!(err.message.contains("exited"));
    }

    #[tokio::test]
    async fn test_command_speech_reports_missing_program() {
        let service = CommandSpeechService::new("/nonexistent/speech-program");
        let err = service.speak("rest").await.unwrap_err();

        assert!(err.message.contains("could not run"));
    }
}
