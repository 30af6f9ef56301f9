//! Text preparation for the external speech renderer
//!
//! A `SpeechJob` holds sanitized text, a clamped rate and its estimated
//! speaking time, and hands out the text as bounded chunks.

use crate::speech::duration::DurationEstimator;
use crate::speech::scheduler::SpeechConfig;

/// Characters that break the renderer's command quoting
const UNSAFE_CHARS: [char; 4] = ['"', '\'', '(', ')'];

/// Remove characters the renderer cannot quote
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !UNSAFE_CHARS.contains(c)).collect()
}

/// Clamp a speech rate into `[min, max]`; NaN clamps to `min`
pub fn clamp_rate(rate: f64, min: f64, max: f64) -> f64 {
    rate.max(min).min(max)
}

/// Contiguous pieces of at most `max_chars` characters
///
/// No word-boundary awareness: a split may fall inside a word.
#[derive(Clone, Debug)]
pub struct Chunks<'a> {
    rest: &'a str,
    max_chars: usize,
}

impl<'a> Chunks<'a> {
    pub fn new(text: &'a str, max_chars: usize) -> Self {
        Self {
            rest: text,
            max_chars: max_chars.max(1),
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let split = self
            .rest
            .char_indices()
            .nth(self.max_chars)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());

        let (chunk, rest) = self.rest.split_at(split);
        self.rest = rest;
        Some(chunk)
    }
}

/// One piece of text to be spoken
#[derive(Clone, Debug, PartialEq)]
pub struct SpeechJob {
    text: String,
    rate: f64,
    duration_secs: u64,
    max_chunk_chars: usize,
}

impl SpeechJob {
    /// Prepare `text` for rendering at `rate` under `config`
    pub fn new(text: &str, rate: f64, config: &SpeechConfig) -> Self {
        let text = sanitize(text);
        let rate = clamp_rate(rate, config.min_rate, config.max_rate);
        let duration_secs = DurationEstimator::new(config.chars_per_second).estimate(&text, rate);

        Self {
            text,
            rate,
            duration_secs,
            max_chunk_chars: config.max_chunk_chars,
        }
    }

    /// Sanitized text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Clamped rate
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Estimated speaking time of the whole text
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Iterate over the chunks; each call starts from the beginning
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks::new(&self.text, self.max_chunk_chars)
    }
}
