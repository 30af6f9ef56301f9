//! External text-to-speech invocation

use crate::{Result, SentioError};
use serde::Deserialize;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Renders one chunk of sanitized text, blocking until it has been spoken
pub trait SpeechRenderer {
    fn render(&mut self, chunk: &str, rate: f64) -> Result<()>;
}

/// Configuration for the Festival renderer
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FestivalConfig {
    /// Festival executable
    pub program: String,

    /// Extra arguments; `--pipe` makes festival read commands from stdin
    pub args: Vec<String>,

    /// Voice selection command, without parentheses
    pub voice: String,
}

impl Default for FestivalConfig {
    fn default() -> Self {
        Self {
            program: "festival".to_string(),
            args: vec!["--pipe".to_string()],
            voice: "voice_rab_diphone".to_string(),
        }
    }
}

impl FestivalConfig {
    /// Set the voice
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }
}

/// Speaks through the Festival speech synthesis system
pub struct FestivalRenderer {
    config: FestivalConfig,
}

impl FestivalRenderer {
    pub fn new(config: FestivalConfig) -> Self {
        Self { config }
    }

    /// Build the Scheme program festival evaluates for one chunk
    pub fn script(&self, chunk: &str, rate: f64) -> String {
        let escaped = chunk.replace('\\', "\\\\").replace('"', "\\\"");
        format!(
            "(Parameter.set 'Duration_Stretch {}) ({}) (SayText \"{}\")\n",
            rate, self.config.voice, escaped
        )
    }
}

impl SpeechRenderer for FestivalRenderer {
    fn render(&mut self, chunk: &str, rate: f64) -> Result<()> {
        let script = self.script(chunk, rate);

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SentioError::Render(format!("Failed to start {}: {}", self.config.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .map_err(|e| SentioError::Render(format!("Failed to write to festival: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SentioError::Render(format!("Festival did not finish: {}", e)))?;

        if !output.status.success() {
            return Err(SentioError::Render(format!(
                "Festival exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        debug!("Festival rendered {} chars", chunk.chars().count());
        Ok(())
    }
}
