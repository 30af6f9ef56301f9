use crate::emotion::{EmotionClassifier, EmotionLabel, DEFAULT_EMOTION_MODEL};
use crate::utils::command::ExternalCommand;
use crate::Result;
use serde::Deserialize;
use tracing::{info, warn};

/// Configuration for the command-line emotion classifier
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Model identifier, substituted for `{model}` in the arguments
    pub model: String,

    /// Program printing one label for the WAV file it is given
    pub command: ExternalCommand,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMOTION_MODEL.to_string(),
            command: ExternalCommand::new(
                "python3",
                ["scripts/classify_emotion.py", "--model", "{model}", "{wav}"],
            ),
        }
    }
}

impl ClassifierConfig {
    /// Command with the model placeholder resolved
    pub fn resolved_command(&self) -> ExternalCommand {
        ExternalCommand {
            program: self.command.program.clone(),
            args: self
                .command
                .args
                .iter()
                .map(|arg| arg.replace("{model}", &self.model))
                .collect(),
        }
    }
}

/// Emotion classifier backed by an external model program
///
/// Any failure inside the program is reported as `Unknown`; this adapter
/// never returns an error.
pub struct CommandClassifier {
    command: ExternalCommand,
    sample_rate: u32,
}

impl CommandClassifier {
    pub fn new(config: &ClassifierConfig, sample_rate: u32) -> Self {
        info!("Emotion model: {}", config.model);
        Self {
            command: config.resolved_command(),
            sample_rate,
        }
    }
}

impl EmotionClassifier for CommandClassifier {
    fn classify(&mut self, samples: &[f32]) -> Result<EmotionLabel> {
        match self.command.run_on_samples(samples, self.sample_rate) {
            Ok(output) => {
                let label = EmotionLabel::parse_output(&output);
                if !label.is_known() {
                    warn!("Classifier output not recognized: {:?}", output.trim());
                }
                Ok(label)
            }
            Err(e) => {
                warn!("Emotion classification failed: {}", e);
                Ok(EmotionLabel::Unknown)
            }
        }
    }
}
