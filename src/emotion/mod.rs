//! Emotion labels and the classifier seam

pub mod classifier;

pub use classifier::{ClassifierConfig, CommandClassifier};

use crate::Result;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Emotion model used by the default classifier
pub const DEFAULT_EMOTION_MODEL: &str = "sagir567/wav2vec2transformerEMR3";

/// Classifies the emotion carried by captured speech
pub trait EmotionClassifier {
    fn classify(&mut self, samples: &[f32]) -> Result<EmotionLabel>;
}

/// Closed set of emotions the model can report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Neutral,
    Happy,
    Sad,
    Angry,
    Disgust,
    Fear,
    Surprised,
    Unknown,
}

impl EmotionLabel {
    /// Labels in model output order (`LABEL_0` .. `LABEL_6`)
    pub const KNOWN: [EmotionLabel; 7] = [
        EmotionLabel::Neutral,
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Angry,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Surprised,
    ];

    /// Map a model class index to a label
    pub fn from_index(index: usize) -> Self {
        Self::KNOWN
            .get(index)
            .copied()
            .unwrap_or(EmotionLabel::Unknown)
    }

    /// Parse classifier output: a `LABEL_<n>` tag, a bare index or a name
    ///
    /// Anything unrecognized becomes `Unknown`.
    pub fn parse_output(output: &str) -> Self {
        output.trim().parse().unwrap_or(EmotionLabel::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Neutral => "Neutral",
            EmotionLabel::Happy => "Happy",
            EmotionLabel::Sad => "Sad",
            EmotionLabel::Angry => "Angry",
            EmotionLabel::Disgust => "Disgust",
            EmotionLabel::Fear => "Fear",
            EmotionLabel::Surprised => "Surprised",
            EmotionLabel::Unknown => "Unknown Emotion",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EmotionLabel::Unknown)
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EmotionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Error for text that names no emotion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEmotion(pub String);

impl fmt::Display for UnknownEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized emotion: {}", self.0)
    }
}

impl std::error::Error for UnknownEmotion {}

impl FromStr for EmotionLabel {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let index = s.strip_prefix("LABEL_").unwrap_or(s);
        if let Ok(index) = index.parse::<usize>() {
            return match Self::from_index(index) {
                EmotionLabel::Unknown => Err(UnknownEmotion(s.to_string())),
                label => Ok(label),
            };
        }

        Self::KNOWN
            .iter()
            .chain(std::iter::once(&EmotionLabel::Unknown))
            .find(|label| label.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}
