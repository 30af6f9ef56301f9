//! Session state and the final report
//!
//! States only move forward. `Done` and `Error` are terminal.

use crate::emotion::EmotionLabel;
use crate::llm::exchange::Exchange;
use crate::SentioError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Stage of an interaction, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SessionState {
    Init,
    Greeting,
    Calibration,
    Listening,
    Analyzing,
    Querying,
    Responding,
    Done,
    Error,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Error)
    }

    /// Check if `next` is a legal successor
    ///
    /// Optional stages may be skipped, so any later state is allowed.
    pub fn can_advance_to(&self, next: SessionState) -> bool {
        !self.is_terminal() && next > *self
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "INIT",
            SessionState::Greeting => "GREETING",
            SessionState::Calibration => "CALIBRATION",
            SessionState::Listening => "LISTENING",
            SessionState::Analyzing => "ANALYZING",
            SessionState::Querying => "QUERYING",
            SessionState::Responding => "RESPONDING",
            SessionState::Done => "DONE",
            SessionState::Error => "ERROR",
        };
        write!(f, "{}", name)
    }
}

/// Mutable record of one interaction, owned by the orchestrator
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    state: SessionState,
    transitions: Vec<SessionState>,
    transcript: Option<String>,
    emotion: Option<EmotionLabel>,
    response: Option<String>,
    exchange: Option<Exchange>,
    last_error: Option<SentioError>,
    degraded: bool,
    cleanup_runs: u32,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            state: SessionState::Init,
            transitions: vec![SessionState::Init],
            transcript: None,
            emotion: None,
            response: None,
            exchange: None,
            last_error: None,
            degraded: false,
            cleanup_runs: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn transitions(&self) -> &[SessionState] {
        &self.transitions
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn emotion(&self) -> Option<EmotionLabel> {
        self.emotion
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn exchange(&self) -> Option<&Exchange> {
        self.exchange.as_ref()
    }

    pub fn last_error(&self) -> Option<&SentioError> {
        self.last_error.as_ref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn cleanup_runs(&self) -> u32 {
        self.cleanup_runs
    }

    /// Move to `next`; illegal transitions are ignored and return false
    pub fn advance(&mut self, next: SessionState) -> bool {
        if !self.state.can_advance_to(next) {
            warn!("Ignoring transition {} -> {}", self.state, next);
            return false;
        }
        debug!("Session {}: {} -> {}", self.id, self.state, next);
        self.state = next;
        self.transitions.push(next);
        true
    }

    /// Record a failure the session survives
    pub fn absorb(&mut self, stage: &str, err: SentioError) {
        warn!("{} stage degraded: {}", stage, err);
        self.degraded = true;
        self.last_error = Some(err);
    }

    /// Record a fatal failure and enter `Error`
    pub fn fail(&mut self, err: SentioError) {
        error!("Session {} failed in {}: {}", self.id, self.state, err);
        self.last_error = Some(err);
        self.advance(SessionState::Error);
    }

    pub fn set_transcript(&mut self, transcript: impl Into<String>) {
        self.transcript = Some(transcript.into());
    }

    pub fn set_emotion(&mut self, emotion: EmotionLabel) {
        self.emotion = Some(emotion);
    }

    pub fn set_response(&mut self, response: impl Into<String>) {
        self.response = Some(response.into());
    }

    pub fn set_exchange(&mut self, exchange: Exchange) {
        self.exchange = Some(exchange);
    }

    pub fn record_cleanup(&mut self) {
        self.cleanup_runs += 1;
    }

    /// Snapshot of the session for reporting
    pub fn report(&self) -> SessionReport {
        let outcome = if self.state == SessionState::Done {
            SessionOutcome::Done
        } else {
            SessionOutcome::Error
        };

        SessionReport {
            id: self.id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            outcome,
            degraded: self.degraded,
            transitions: self.transitions.clone(),
            transcript: self.transcript.clone(),
            emotion: self.emotion,
            response: self.response.clone(),
            exchange: self.exchange.clone(),
            error: self.last_error.as_ref().map(|e| e.to_string()),
            cleanup_runs: self.cleanup_runs,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// How a session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SessionOutcome {
    Done,
    Error,
}

/// Final state of a session
#[derive(Clone, Debug, Serialize)]
pub struct SessionReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: SessionOutcome,
    pub degraded: bool,
    pub transitions: Vec<SessionState>,
    pub transcript: Option<String>,
    pub emotion: Option<EmotionLabel>,
    pub response: Option<String>,
    pub exchange: Option<Exchange>,
    /// Last error seen, fatal or absorbed
    pub error: Option<String>,
    pub cleanup_runs: u32,
}

impl SessionReport {
    /// Whether the session reached `Done`, degraded or not
    pub fn is_success(&self) -> bool {
        self.outcome == SessionOutcome::Done
    }
}
