//! Recording fakes for the session collaborators
#![allow(dead_code)]

use parking_lot::Mutex;
use sentio::audio::{samples_for, AudioCapture};
use sentio::emotion::{EmotionClassifier, EmotionLabel};
use sentio::hardware::SerialLink;
use sentio::speech::{SpeechRenderer, Transcriber};
use sentio::{Result, SentioError};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Shared, ordered log of everything the fakes saw
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Events with `prefix`, prefix removed
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_string))
            .collect()
    }
}

/// Capture returning silence, or failing
pub struct FakeCapture {
    pub log: EventLog,
    pub fail: bool,
}

impl AudioCapture for FakeCapture {
    fn capture(&mut self, duration: Duration, sample_rate: u32) -> Result<Vec<f32>> {
        self.log.push(format!("capture:{}ms", duration.as_millis()));
        if self.fail {
            return Err(SentioError::Capture("microphone unplugged".into()));
        }
        Ok(vec![0.0; samples_for(duration, sample_rate)])
    }
}

pub struct FixedClassifier(pub Result<EmotionLabel>);

impl EmotionClassifier for FixedClassifier {
    fn classify(&mut self, _samples: &[f32]) -> Result<EmotionLabel> {
        self.0.clone()
    }
}

pub struct FixedTranscriber(pub Result<String>);

impl Transcriber for FixedTranscriber {
    fn transcribe(&mut self, _samples: &[f32]) -> Result<String> {
        self.0.clone()
    }
}

/// Renderer logging `say:<chunk>`
pub struct RecordingRenderer {
    pub log: EventLog,
    pub fail: bool,
}

impl SpeechRenderer for RecordingRenderer {
    fn render(&mut self, chunk: &str, _rate: f64) -> Result<()> {
        self.log.push(format!("say:{}", chunk));
        if self.fail {
            return Err(SentioError::Render("festival missing".into()));
        }
        Ok(())
    }
}

/// Serial link logging `hw:<line>`, never acknowledging
pub struct RecordingLink {
    pub log: EventLog,
}

impl SerialLink for RecordingLink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.log.push(format!("hw:{}", line));
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<u32> {
        Ok(0)
    }

    fn read_line(&mut self) -> io::Result<String> {
        Ok(String::new())
    }
}
