//! One resolved query/response round trip

use crate::{Result, SentioError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// How an exchange ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ExchangeOutcome {
    Success,
    Timeout,
    ProcessError(String),
}

/// A query and its resolution
///
/// Only constructed already resolved, so the outcome is set exactly once.
#[derive(Clone, Debug, Serialize)]
pub struct Exchange {
    id: Uuid,
    started_at: DateTime<Utc>,
    query: String,
    response: Option<String>,
    #[serde(serialize_with = "serialize_millis")]
    elapsed: Duration,
    outcome: ExchangeOutcome,
}

impl Exchange {
    /// Resolve an exchange from the result of a query
    pub fn resolve(
        query: impl Into<String>,
        result: Result<String>,
        elapsed: Duration,
        started_at: DateTime<Utc>,
    ) -> Self {
        let (response, outcome) = match result {
            Ok(text) => (Some(text), ExchangeOutcome::Success),
            Err(SentioError::ResponseTimeout(_)) => (None, ExchangeOutcome::Timeout),
            Err(e) => (None, ExchangeOutcome::ProcessError(e.to_string())),
        };

        Self {
            id: Uuid::new_v4(),
            started_at,
            query: query.into(),
            response,
            elapsed,
            outcome,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Response text, present only on success
    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn outcome(&self) -> &ExchangeOutcome {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ExchangeOutcome::Success
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
