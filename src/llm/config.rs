//! Configuration for the language-model child process

use serde::Deserialize;
use std::time::Duration;

/// Placeholder in the arguments replaced by the model identifier
pub const MODEL_PLACEHOLDER: &str = "{model}";

/// Configuration for the LLM subprocess client
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier passed to the program
    pub model: String,

    /// Executable to spawn
    pub program: String,

    /// Arguments; `{model}` is replaced by `model`
    pub args: Vec<String>,

    /// Line that marks the end of every response
    pub sentinel: String,

    /// Line sent to ask the process to exit
    pub exit_command: String,

    /// How long one exchange may take
    pub response_timeout_ms: u64,

    /// Wait this long for an initial sentinel after spawning (0 = don't wait)
    pub ready_timeout_ms: u64,

    /// Grace period between the exit command and killing the process
    pub shutdown_grace_ms: u64,

    /// Most lines accepted before the sentinel
    pub max_response_lines: usize,

    /// Longest output line accepted, in bytes
    pub max_line_bytes: usize,

    /// Capacity of the channel between the reader thread and the client
    pub line_buffer: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "tinyllama:latest".to_string(),
            program: "ollama".to_string(),
            args: vec!["run".to_string(), MODEL_PLACEHOLDER.to_string()],
            sentinel: ">>>".to_string(),
            exit_command: "/bye".to_string(),
            response_timeout_ms: 60_000,
            ready_timeout_ms: 0,
            shutdown_grace_ms: 500,
            max_response_lines: 512,
            max_line_bytes: 64 * 1024,
            line_buffer: 256,
        }
    }
}

impl LlmConfig {
    /// Create a configuration that runs `program` with `args` directly
    pub fn command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the end-of-response sentinel
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    /// Set the per-exchange timeout
    pub fn with_response_timeout_ms(mut self, timeout: u64) -> Self {
        self.response_timeout_ms = timeout;
        self
    }

    /// Wait for a ready sentinel after spawning
    pub fn with_ready_timeout_ms(mut self, timeout: u64) -> Self {
        self.ready_timeout_ms = timeout;
        self
    }

    /// Set the response line bound
    pub fn with_max_response_lines(mut self, max_lines: usize) -> Self {
        self.max_response_lines = max_lines;
        self
    }

    /// Set the output line length bound
    pub fn with_max_line_bytes(mut self, max_bytes: usize) -> Self {
        self.max_line_bytes = max_bytes;
        self
    }

    /// Arguments with the model placeholder resolved
    pub fn resolved_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(MODEL_PLACEHOLDER, &self.model))
            .collect()
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        (self.ready_timeout_ms > 0).then(|| Duration::from_millis(self.ready_timeout_ms))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.program.trim().is_empty() {
            return Err("LLM program is required".to_string());
        }
        if self.sentinel.is_empty() {
            return Err("LLM sentinel must not be empty".to_string());
        }
        if self.response_timeout_ms == 0 {
            return Err("LLM response timeout must be positive".to_string());
        }
        if self.max_response_lines == 0 || self.max_line_bytes == 0 || self.line_buffer == 0 {
            return Err("LLM line bounds must be positive".to_string());
        }
        Ok(())
    }
}
