//! Chunked speech rendering synchronized with the peripheral
//!
//! The scheduler brackets every job with `speak(<secs>)` and `stop`
//! hardware commands and renders the chunks in between, one at a time.

use crate::hardware::HardwareChannel;
use crate::speech::duration::DEFAULT_CHARS_PER_SECOND;
use crate::speech::job::SpeechJob;
use crate::speech::renderer::SpeechRenderer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration for speech rendering
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Default speech rate (duration stretch; higher is slower)
    pub rate: f64,

    /// Lowest accepted rate
    pub min_rate: f64,

    /// Highest accepted rate
    pub max_rate: f64,

    /// Characters per second used for duration estimates
    pub chars_per_second: f64,

    /// Maximum characters per renderer call
    pub max_chunk_chars: usize,

    /// Whether to send speak/stop commands to the peripheral
    pub sync_hardware: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            rate: 0.9,
            min_rate: 0.9,
            max_rate: 3.0,
            chars_per_second: DEFAULT_CHARS_PER_SECOND,
            max_chunk_chars: 800,
            sync_hardware: true,
        }
    }
}

impl SpeechConfig {
    /// Set the default rate
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Set the accepted rate range
    pub fn with_rate_bounds(mut self, min_rate: f64, max_rate: f64) -> Self {
        self.min_rate = min_rate;
        self.max_rate = max_rate;
        self
    }

    /// Set the maximum chunk length
    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    /// Enable or disable peripheral cues
    pub fn with_hardware_sync(mut self, enabled: bool) -> Self {
        self.sync_hardware = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_rate > 0.0 && self.min_rate <= self.max_rate) {
            return Err(format!(
                "Invalid speech rate bounds: [{}, {}]",
                self.min_rate, self.max_rate
            ));
        }
        if !(self.chars_per_second > 0.0) {
            return Err("chars_per_second must be positive".to_string());
        }
        if self.max_chunk_chars == 0 {
            return Err("max_chunk_chars must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Summary of one rendered job
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderReport {
    /// Number of chunks handed to the renderer
    pub chunks: usize,
    /// Chunks the renderer failed on
    pub failed_chunks: usize,
    /// Estimated speaking time sent to the peripheral
    pub duration_secs: u64,
    /// Rate after clamping
    pub rate: f64,
}

impl RenderReport {
    /// Whether every chunk rendered
    pub fn is_clean(&self) -> bool {
        self.failed_chunks == 0
    }
}

/// Drives the external renderer chunk by chunk
pub struct SpeechScheduler {
    renderer: Box<dyn SpeechRenderer>,
    config: SpeechConfig,
}

impl SpeechScheduler {
    pub fn new(renderer: Box<dyn SpeechRenderer>, config: SpeechConfig) -> Self {
        Self { renderer, config }
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Speak `text` at the configured default rate
    pub fn speak(&mut self, text: &str, hardware: &mut HardwareChannel) -> RenderReport {
        self.render(text, self.config.rate, hardware)
    }

    /// Speak `text` at `rate`, cueing the peripheral around it
    pub fn render(&mut self, text: &str, rate: f64, hardware: &mut HardwareChannel) -> RenderReport {
        let job = SpeechJob::new(text, rate, &self.config);
        info!(
            "Speaking {} chars at rate {:.2}, estimated {}s",
            job.text().chars().count(),
            job.rate(),
            job.duration_secs()
        );

        if self.config.sync_hardware {
            hardware.speak(job.duration_secs());
        }

        let mut chunks = 0;
        let mut failed_chunks = 0;
        for chunk in job.chunks() {
            chunks += 1;
            debug!("Rendering chunk {} ({} chars)", chunks, chunk.chars().count());
            if let Err(e) = self.renderer.render(chunk, job.rate()) {
                warn!("Renderer failed on chunk {}: {}", chunks, e);
                failed_chunks += 1;
            }
        }

        if self.config.sync_hardware {
            hardware.stop();
        }

        RenderReport {
            chunks,
            failed_chunks,
            duration_secs: job.duration_secs(),
            rate: job.rate(),
        }
    }
}
