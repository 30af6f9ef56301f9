//! Session orchestration
//!
//! Connects all components: capture -> emotion + STT -> LLM -> TTS, with the
//! peripheral cued around everything that is spoken.

pub mod config;
pub mod orchestrator;
pub mod session;

pub use config::{FlowConfig, SessionConfig};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use session::{Session, SessionOutcome, SessionReport, SessionState};
