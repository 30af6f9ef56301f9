//! Conversational model access
//!
//! This module provides:
//! - `LlmClient`, a line-framed protocol client for a long-lived model process
//! - `Exchange`, the resolved record of one query
//! - The prompt template and fallback reply

pub mod client;
pub mod config;
pub mod exchange;
pub mod prompts;

// Re-export commonly used types
pub use client::LlmClient;
pub use config::LlmConfig;
pub use exchange::{Exchange, ExchangeOutcome};
pub use prompts::{compose_prompt, FALLBACK_RESPONSE, PROMPT_TEMPLATE};
