//! Audio capture for the listening stages
//!
//! This module provides:
//! - The `AudioCapture` seam used by the orchestrator
//! - Microphone capture via cpal (feature `audio-io`)
//! - WAV file replay and WAV helpers via hound

#[cfg(feature = "audio-io")]
pub mod input;
pub mod wav;

#[cfg(feature = "audio-io")]
pub use input::MicrophoneCapture;
pub use wav::{read_wav, write_wav, WavFileCapture};

use crate::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Records mono f32 samples
pub trait AudioCapture {
    /// Record for `duration` at `sample_rate`
    fn capture(&mut self, duration: Duration, sample_rate: u32) -> Result<Vec<f32>>;
}

/// Configuration for audio capture
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate expected by the analysis models
    pub sample_rate: u32,

    /// Length of the main recording in milliseconds
    pub record_ms: u64,

    /// Length of the calibration recording in milliseconds
    pub calibration_ms: u64,

    /// Replay this WAV file instead of using the microphone
    pub source: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            record_ms: 7000,
            calibration_ms: 3000,
            source: None,
        }
    }
}

impl AudioConfig {
    /// Replay a WAV file instead of recording
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Set the main recording length
    pub fn with_record_ms(mut self, record_ms: u64) -> Self {
        self.record_ms = record_ms;
        self
    }

    pub fn record_duration(&self) -> Duration {
        Duration::from_millis(self.record_ms)
    }

    pub fn calibration_duration(&self) -> Duration {
        Duration::from_millis(self.calibration_ms)
    }

    /// Number of samples in a recording of `duration`
    pub fn samples_for(&self, duration: Duration) -> usize {
        samples_for(duration, self.sample_rate)
    }
}

/// Number of samples in `duration` at `sample_rate`
pub fn samples_for(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

/// Average interleaved frames down to one channel
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
