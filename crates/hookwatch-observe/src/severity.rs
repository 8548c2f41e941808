//! Severity classification and routing to severity logs
//!
//! Classification is a pure lookup on the decision string. ERROR and WARN
//! events additionally land in `hook-errors.log` / `hook-warnings.log`;
//! DEBUG events land in `hook-debug.log` only when debug logging is enabled.
//! INFO has no dedicated log.

use crate::error::ObserveResult;
use crate::events::LogEvent;
use crate::jsonl;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors log file name
pub const ERROR_LOG: &str = "hook-errors.log";
/// Warnings log file name
pub const WARN_LOG: &str = "hook-warnings.log";
/// Debug log file name (written only when debug logging is on)
pub const DEBUG_LOG: &str = "hook-debug.log";

const ERROR_DECISIONS: &[&str] = &["block", "deny", "error", "fail", "reject"];
const WARN_DECISIONS: &[&str] = &["warn", "warning", "ask", "escalate"];
const DEBUG_DECISIONS: &[&str] = &["debug", "trace", "skip"];

/// Event severity derived from a hook decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warn,
    Info,
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Info => write!(f, "INFO"),
            Severity::Debug => write!(f, "DEBUG"),
        }
    }
}

impl Severity {
    /// Dedicated log file for this severity, if it has one
    pub fn log_file_name(self) -> Option<&'static str> {
        match self {
            Severity::Error => Some(ERROR_LOG),
            Severity::Warn => Some(WARN_LOG),
            Severity::Debug => Some(DEBUG_LOG),
            Severity::Info => None,
        }
    }
}

/// Map a decision to its severity. Unknown decisions are INFO.
///
/// Matching ignores ASCII case, so `Block` and `BLOCK` classify like `block`.
pub fn classify(decision: &str) -> Severity {
    let matches = |set: &[&str]| set.iter().any(|d| d.eq_ignore_ascii_case(decision));

    if matches(ERROR_DECISIONS) {
        Severity::Error
    } else if matches(WARN_DECISIONS) {
        Severity::Warn
    } else if matches(DEBUG_DECISIONS) {
        Severity::Debug
    } else {
        Severity::Info
    }
}

#[derive(Serialize)]
struct SeverityRecord<'a> {
    severity: Severity,
    #[serde(flatten)]
    event: &'a LogEvent,
}

/// Append `event` to the severity log for `severity`.
///
/// Returns the path written, or `None` when the severity is not routed
/// (INFO always, DEBUG unless `debug_enabled`).
pub async fn route_to_severity_log(
    log_dir: &Path,
    event: &LogEvent,
    severity: Severity,
    debug_enabled: bool,
) -> ObserveResult<Option<PathBuf>> {
    if severity == Severity::Debug && !debug_enabled {
        return Ok(None);
    }
    let Some(file_name) = severity.log_file_name() else {
        return Ok(None);
    };

    jsonl::ensure_dir(log_dir).await?;
    let path = log_dir.join(file_name);
    jsonl::append_record(&path, &SeverityRecord { severity, event }).await?;
    Ok(Some(path))
}
