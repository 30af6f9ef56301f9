//! Configuration for a complete interaction session
//!
//! Compiled defaults can be overridden by a TOML file. Every table and key is
//! optional; missing values keep their defaults.

use crate::audio::AudioConfig;
use crate::emotion::ClassifierConfig;
use crate::hardware::HardwareConfig;
use crate::llm::config::LlmConfig;
use crate::llm::prompts::{FALLBACK_RESPONSE, PROMPT_TEMPLATE};
use crate::speech::renderer::FestivalConfig;
use crate::speech::scheduler::SpeechConfig;
use crate::utils::command::ExternalCommand;
use crate::{Result, SentioError};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "SENTIO_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "sentio.toml";

/// Stage sequencing and spoken cues
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Spoken first; `None` skips the greeting stage
    pub greeting: Option<String>,

    /// Pause after the greeting
    pub greeting_pause_ms: u64,

    /// Record and transcribe a short clip before the main recording
    pub calibrate: bool,

    /// Spoken right before calibration
    pub calibration_cue: Option<String>,

    /// Spoken right before the main recording
    pub listening_cue: Option<String>,

    /// Spoken after analysis; `{emotion}` is replaced by the detected label
    pub emotion_announcement: Option<String>,

    /// Sent to the peripheral once the model process is up
    pub startup_commands: Vec<String>,

    /// Sent to the peripheral during cleanup
    pub shutdown_command: Option<String>,

    /// Query template with `{transcript}` and `{emotion}` placeholders
    pub prompt_template: String,

    /// Spoken when the model gives no usable answer
    pub fallback_response: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            greeting: Some(
                "Hello, I'm the robot of Aaron and Sagghi. I'm here to help you detect your emotions."
                    .to_string(),
            ),
            greeting_pause_ms: 4000,
            calibrate: true,
            calibration_cue: Some("Test me".to_string()),
            listening_cue: Some("Please speak into the microphone.".to_string()),
            emotion_announcement: Some("We detect that your emotion is: {emotion}".to_string()),
            startup_commands: vec!["go sleep".to_string(), "wake up".to_string()],
            shutdown_command: Some("go sleep".to_string()),
            prompt_template: PROMPT_TEMPLATE.to_string(),
            fallback_response: FALLBACK_RESPONSE.to_string(),
        }
    }
}

impl FlowConfig {
    /// Only the core stages: no cues, greeting, calibration or peripheral
    /// start/stop commands
    pub fn minimal() -> Self {
        Self {
            greeting: None,
            greeting_pause_ms: 0,
            calibrate: false,
            calibration_cue: None,
            listening_cue: None,
            emotion_announcement: None,
            startup_commands: Vec::new(),
            shutdown_command: None,
            ..Default::default()
        }
    }

    pub fn greeting_pause(&self) -> Duration {
        Duration::from_millis(self.greeting_pause_ms)
    }

    /// Whether the greeting stage has anything to do
    pub fn greets(&self) -> bool {
        self.greeting.is_some() || self.calibration_cue.is_some()
    }
}

/// Configuration for the complete session
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Model process
    pub llm: LlmConfig,

    /// Capture lengths and source
    pub audio: AudioConfig,

    /// Rendering rate, chunking and peripheral sync
    pub speech: SpeechConfig,

    /// Text-to-speech program
    pub festival: FestivalConfig,

    /// Serial peripheral
    pub hardware: HardwareConfig,

    /// Speech-to-text program
    pub transcriber: ExternalCommand,

    /// Emotion model program
    pub classifier: ClassifierConfig,

    /// Stage sequencing
    pub flow: FlowConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            audio: AudioConfig::default(),
            speech: SpeechConfig::default(),
            festival: FestivalConfig::default(),
            hardware: HardwareConfig::default(),
            transcriber: ExternalCommand::new(
                "whisper-cli",
                ["-m", "models/ggml-base.en.bin", "-nt", "-f", "{wav}"],
            ),
            classifier: ClassifierConfig::default(),
            flow: FlowConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Compiled defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Core stages only, without the peripheral
    pub fn quiet() -> Self {
        Self {
            hardware: HardwareConfig::disabled(),
            flow: FlowConfig::minimal(),
            ..Self::new()
        }
    }

    /// Set the LLM configuration
    pub fn with_llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }

    /// Set the audio configuration
    pub fn with_audio(mut self, audio: AudioConfig) -> Self {
        self.audio = audio;
        self
    }

    /// Set the speech configuration
    pub fn with_speech(mut self, speech: SpeechConfig) -> Self {
        self.speech = speech;
        self
    }

    /// Set the hardware configuration
    pub fn with_hardware(mut self, hardware: HardwareConfig) -> Self {
        self.hardware = hardware;
        self
    }

    /// Set the stage sequencing
    pub fn with_flow(mut self, flow: FlowConfig) -> Self {
        self.flow = flow;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.llm.validate()?;
        self.speech.validate()?;

        if self.audio.sample_rate == 0 {
            return Err("Sample rate must be positive".to_string());
        }
        if self.audio.record_ms == 0 {
            return Err("Recording length must be positive".to_string());
        }
        if let Some(source) = &self.audio.source {
            if !source.exists() {
                return Err(format!("Audio source not found: {:?}", source));
            }
        }
        if !self.flow.prompt_template.contains("{transcript}") {
            return Err("Prompt template must contain {transcript}".to_string());
        }
        if self.flow.fallback_response.trim().is_empty() {
            return Err("Fallback response must not be empty".to_string());
        }
        Ok(())
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SentioError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| SentioError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse a configuration from TOML text, on top of the defaults
    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Find and load the config file, or fall back to the defaults
    ///
    /// Looks at `$SENTIO_CONFIG`, then `./sentio.toml`, then
    /// `<config dir>/sentio/config.toml`.
    pub fn discover() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            info!("Loading config from ${}: {}", CONFIG_ENV, path);
            return Self::load(path);
        }

        for path in Self::candidate_paths() {
            if path.is_file() {
                info!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::new())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sentio").join("config.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::new();
        assert_eq!(config.llm.model, "tinyllama:latest");
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.record_ms, 7000);
        assert_eq!(config.hardware.port, "/dev/ttyUSB0");
        assert_eq!(config.hardware.baud_rate, 9600);
        assert_eq!(config.flow.startup_commands, vec!["go sleep", "wake up"]);
        assert_eq!(config.transcriber.program, "whisper-cli");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_matches_new() {
        let config = SessionConfig::default();
        assert_eq!(config.transcriber, SessionConfig::new().transcriber);
        assert_eq!(config.transcriber.program, "whisper-cli");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quiet_config() {
        let config = SessionConfig::quiet();
        assert!(!config.hardware.enabled);
        assert!(!config.flow.greets());
        assert!(!config.flow.calibrate);
        assert!(config.flow.shutdown_command.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SessionConfig::from_toml(
            r#"
            [llm]
            model = "phi3:mini"
            response_timeout_ms = 5000

            [speech]
            rate = 1.5

            [flow]
            greeting = "Hi"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "phi3:mini");
        assert_eq!(config.llm.program, "ollama");
        assert_eq!(config.llm.response_timeout(), Duration::from_secs(5));
        assert_eq!(config.speech.rate, 1.5);
        assert_eq!(config.speech.max_chunk_chars, 800);
        assert_eq!(config.flow.greeting.as_deref(), Some("Hi"));
        assert_eq!(config.flow.calibration_cue.as_deref(), Some("Test me"));
        assert_eq!(config.transcriber.program, "whisper-cli");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm\nmodel = 3").unwrap();
        let err = SessionConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, SentioError::ConfigError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hardware]\nenabled = false\n[audio]\nrecord_ms = 2000").unwrap();
        let config = SessionConfig::load(file.path()).unwrap();
        assert!(!config.hardware.enabled);
        assert_eq!(config.audio.record_duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_validate_rejects_bad_template() {
        let mut config = SessionConfig::new();
        config.flow.prompt_template = "How do you feel?".to_string();
        assert!(config.validate().is_err());
    }
}
