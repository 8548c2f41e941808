//! Hook execution events
//!
//! A [`LogEvent`] describes one decision a hook made about an agent action.
//! Events are immutable once built; the builder methods consume and return
//! `self`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// The width is fixed so that string order equals chronological order;
/// cross-session aggregation sorts on the raw string.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A single hook execution event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub timestamp: String,

    /// Events without a session are never written to session-scoped stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    pub hook_name: String,

    /// Verdict string, e.g. `approve`, `block`, `warn`
    pub decision: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl LogEvent {
    /// Create an event stamped with the current time
    pub fn new(hook_name: impl Into<String>, decision: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp_now(),
            session_id: None,
            hook_name: hook_name.into(),
            decision: decision.into(),
            reason: None,
            details: None,
            duration_ms: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Override the timestamp (replaying events, tests)
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Serialize to JSONL format (single line)
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSONL line
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
