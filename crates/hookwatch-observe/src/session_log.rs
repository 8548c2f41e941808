//! Session-scoped append logs
//!
//! Each session gets its own file, `<log_dir>/<log_name>-<session>.jsonl`.
//! Session ids are sanitized before they touch the path (see [`crate::id`]).

use crate::error::{ObserveError, ObserveResult};
use crate::events::timestamp_now;
use crate::id::sanitize_session_id;
use crate::jsonl;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Log name for hook execution events
pub const EXECUTION_LOG: &str = "hook-execution";

const TIMESTAMP_KEY: &str = "timestamp";

/// Path of the session log for `session_id`
pub fn session_log_path(log_dir: &Path, log_name: &str, session_id: &str) -> ObserveResult<PathBuf> {
    let session = sanitize_session_id(session_id)?;
    Ok(log_dir.join(format!("{log_name}-{session}.jsonl")))
}

/// Append one record to a session log.
///
/// Object records without a `timestamp` field get one. Delivery is at most
/// once; a failed append is not retried.
pub async fn append_entry<T: Serialize + ?Sized>(
    log_dir: &Path,
    log_name: &str,
    session_id: &str,
    entry: &T,
) -> ObserveResult<PathBuf> {
    let path = session_log_path(log_dir, log_name, session_id)?;

    let mut value = serde_json::to_value(entry)?;
    if let Value::Object(map) = &mut value {
        map.entry(TIMESTAMP_KEY)
            .or_insert_with(|| Value::String(timestamp_now()));
    }

    jsonl::ensure_dir(log_dir).await?;
    jsonl::append_record(&path, &value).await?;
    Ok(path)
}

/// Read every parseable record of one session log
pub async fn read_entries<T: DeserializeOwned>(
    log_dir: &Path,
    log_name: &str,
    session_id: &str,
) -> ObserveResult<Vec<T>> {
    let path = session_log_path(log_dir, log_name, session_id)?;
    jsonl::read_records(&path).await
}

/// Merge the records of every `<log_name>-*.jsonl` file, oldest first.
///
/// Ordering compares the `timestamp` strings directly, which is correct only
/// while timestamps keep the fixed-width format of
/// [`timestamp_now`](crate::events::timestamp_now). Unreadable files are
/// skipped.
pub async fn read_entries_across_sessions(log_dir: &Path, log_name: &str) -> ObserveResult<Vec<Value>> {
    let prefix = format!("{log_name}-");
    let mut files = Vec::new();

    let mut dir = tokio::fs::read_dir(log_dir)
        .await
        .map_err(|e| ObserveError::read(log_dir, e))?;
    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| ObserveError::read(log_dir, e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(&prefix) && name.ends_with(".jsonl") {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut merged = Vec::new();
    for path in files {
        match jsonl::read_records::<Value>(&path).await {
            Ok(records) => merged.extend(records),
            Err(e) => debug!(error = %e, "Skipping unreadable session log"),
        }
    }

    merged.sort_by(|a, b| timestamp_of(a).cmp(timestamp_of(b)));
    Ok(merged)
}

fn timestamp_of(record: &Value) -> &str {
    record
        .get(TIMESTAMP_KEY)
        .and_then(Value::as_str)
        .unwrap_or_default()
}
