//! Speech-to-text seam and its command-line adapter

use crate::utils::command::ExternalCommand;
use crate::{Result, SentioError};
use tracing::{debug, info};

/// Turns captured mono samples into text
pub trait Transcriber {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String>;
}

/// Transcriber that runs an external speech-to-text program on a WAV file
///
/// The program's standard output, trimmed, is the transcript.
pub struct CommandTranscriber {
    command: ExternalCommand,
    sample_rate: u32,
}

impl CommandTranscriber {
    pub fn new(command: ExternalCommand, sample_rate: u32) -> Self {
        info!("Transcriber command: {}", command.program);
        Self {
            command,
            sample_rate,
        }
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String> {
        let text = self
            .command
            .run_on_samples(samples, self.sample_rate)
            .map_err(|e| SentioError::Transcription(e.to_string()))?;

        // Whisper-style tools prefix segments with blank lines and spacing
        let transcript = text.split_whitespace().collect::<Vec<_>>().join(" ");
        debug!("Transcription: {}", transcript);
        Ok(transcript)
    }
}
