//! Running external model programs over captured audio

use crate::audio::wav::write_wav;
use crate::{Result, SentioError};
use serde::Deserialize;
use std::process::{Command, Stdio};
use tracing::debug;

/// Placeholder in command arguments replaced by the WAV file path
pub const WAV_PLACEHOLDER: &str = "{wav}";

/// An external program invocation
///
/// If no argument contains `{wav}`, the WAV path is appended as the last
/// argument.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ExternalCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Arguments with the placeholder resolved to `wav_path`
    pub fn resolved_args(&self, wav_path: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(WAV_PLACEHOLDER, wav_path))
            .collect();
        if !self.args.iter().any(|arg| arg.contains(WAV_PLACEHOLDER)) {
            args.push(wav_path.to_string());
        }
        args
    }

    /// Write `samples` to a temporary WAV file, run the program on it and
    /// return its standard output
    pub fn run_on_samples(&self, samples: &[f32], sample_rate: u32) -> Result<String> {
        if self.program.is_empty() {
            return Err(SentioError::ConfigError("No program configured".into()));
        }

        let wav = tempfile::Builder::new()
            .prefix("sentio-")
            .suffix(".wav")
            .tempfile()?;
        write_wav(wav.path(), samples, sample_rate, 1)?;

        let wav_path = wav.path().to_string_lossy().to_string();
        let args = self.resolved_args(&wav_path);
        debug!("Running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SentioError::IOError(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(SentioError::IOError(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_substituted() {
        let cmd = ExternalCommand::new("whisper-cli", ["-f", "{wav}", "-nt"]);
        assert_eq!(cmd.resolved_args("/tmp/a.wav"), vec!["-f", "/tmp/a.wav", "-nt"]);
    }

    #[test]
    fn test_path_appended_without_placeholder() {
        let cmd = ExternalCommand::new("classify", ["--top", "1"]);
        assert_eq!(cmd.resolved_args("/tmp/a.wav"), vec!["--top", "1", "/tmp/a.wav"]);
    }

    #[test]
    fn test_program_receives_real_wav() {
        // `wc -c` prints the size of the file it was handed
        let cmd = ExternalCommand::new("sh", ["-c", "wc -c < \"$0\"", "{wav}"]);
        let out = cmd.run_on_samples(&[0.25; 1600], 16000).unwrap();
        let bytes: usize = out.trim().parse().unwrap();
        // 44-byte header plus 16-bit samples
        assert_eq!(bytes, 44 + 1600 * 2);
    }

    #[test]
    fn test_empty_program_is_config_error() {
        let cmd = ExternalCommand::default();
        assert!(matches!(
            cmd.run_on_samples(&[0.0; 10], 16000),
            Err(SentioError::ConfigError(_))
        ));
    }
}
