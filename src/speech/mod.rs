//! Speech modules for STT and chunked TTS
//!
//! This module provides:
//! - Speech-to-text behind the `Transcriber` seam
//! - Speaking-time estimates for peripheral cues
//! - Chunked text-to-speech rendering through Festival

pub mod duration;
pub mod job;
pub mod renderer;
pub mod scheduler;
pub mod stt;

// Re-export commonly used types
pub use duration::{estimate_secs, DurationEstimator, DEFAULT_CHARS_PER_SECOND};
pub use job::{sanitize, SpeechJob};
pub use renderer::{FestivalConfig, FestivalRenderer, SpeechRenderer};
pub use scheduler::{RenderReport, SpeechConfig, SpeechScheduler};
pub use stt::{CommandTranscriber, Transcriber};
