pub mod audio;
pub mod emotion;
pub mod hardware;
pub mod integration;
pub mod llm;
pub mod speech;
pub mod utils;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SentioError {
    #[error("Failed to spawn model process: {0}")]
    ProcessSpawn(String),

    #[error("Model process is not open")]
    NotOpen,

    #[error("No response sentinel within {0:?}")]
    ResponseTimeout(Duration),

    #[error("An exchange is already in progress")]
    ExchangeInProgress,

    #[error("Model process error: {0}")]
    ProcessError(String),

    #[error("Response exceeded {0} lines before the sentinel")]
    ResponseTooLong(usize),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Hardware error: {0}")]
    Hardware(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for SentioError {
    fn from(e: std::io::Error) -> Self {
        SentioError::IOError(e.to_string())
    }
}

impl SentioError {
    /// Check if the session can keep going after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Without a model process or audio there is nothing to continue with
            SentioError::ProcessSpawn(_) => false,
            SentioError::NotOpen => false,
            SentioError::Capture(_) => false,
            // Exchange failures fall back to a canned reply
            SentioError::ResponseTimeout(_) => true,
            SentioError::ExchangeInProgress => true,
            SentioError::ProcessError(_) => true,
            SentioError::ResponseTooLong(_) => true,
            // Analysis failures substitute sentinel values
            SentioError::Classification(_) => true,
            SentioError::Transcription(_) => true,
            // Both analysis stages failed
            SentioError::Analysis(_) => false,
            SentioError::Render(_) => true,
            SentioError::Hardware(_) => true,
            SentioError::IOError(_) => false,
            SentioError::ConfigError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            SentioError::ProcessSpawn(_) | SentioError::NotOpen => {
                "The language model could not be started.".to_string()
            }
            SentioError::ResponseTimeout(_)
            | SentioError::ExchangeInProgress
            | SentioError::ProcessError(_)
            | SentioError::ResponseTooLong(_) => {
                "The language model did not answer in time.".to_string()
            }
            SentioError::Capture(_) => {
                "Audio capture failed. Please check your microphone.".to_string()
            }
            SentioError::Classification(_) => "Emotion detection failed.".to_string(),
            SentioError::Transcription(_) => "Speech recognition failed.".to_string(),
            SentioError::Analysis(_) => "Your speech could not be analyzed.".to_string(),
            SentioError::Render(_) => "Speech output failed.".to_string(),
            SentioError::Hardware(_) => "The peripheral did not respond.".to_string(),
            SentioError::IOError(_) => "File system error occurred.".to_string(),
            SentioError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SentioError>;
