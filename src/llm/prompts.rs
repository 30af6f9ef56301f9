//! Prompt template and fallback reply

use crate::emotion::EmotionLabel;

/// Query sent to the model; `{transcript}` and `{emotion}` are filled in
pub const PROMPT_TEMPLATE: &str =
    "{transcript}. Please answer for a person that feels {emotion} in one or two sentences.";

/// Spoken when the model cannot produce an answer
pub const FALLBACK_RESPONSE: &str = "I'm unable to process that right now.";

/// Fill `template` with the transcript and detected emotion
///
/// The emotion goes in first so placeholder-like text inside the transcript
/// is left alone.
pub fn compose_prompt(template: &str, transcript: &str, emotion: EmotionLabel) -> String {
    template
        .replace("{emotion}", emotion.as_str())
        .replace("{transcript}", transcript)
}
