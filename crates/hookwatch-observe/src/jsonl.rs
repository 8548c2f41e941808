//! Line-delimited JSON file primitives shared by the log stores
//!
//! Appends go through a single `write_all` on an append-mode handle so that
//! concurrent hook processes writing the same file interleave whole lines.
//! No locking is done here; readers skip whatever lines fail to parse.

use crate::error::{ObserveError, ObserveResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Create `dir` and its parents if missing
pub(crate) async fn ensure_dir(dir: &Path) -> ObserveResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ObserveError::dir_create(dir, e))
}

/// Append one serialized record plus newline to `path`
pub(crate) async fn append_record<T: Serialize + ?Sized>(
    path: &Path,
    record: &T,
) -> ObserveResult<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| ObserveError::write(path, e))?;

    file.write_all(line.as_bytes())
        .await
        .map_err(|e| ObserveError::write(path, e))?;
    file.flush().await.map_err(|e| ObserveError::write(path, e))?;

    Ok(())
}

/// Parse every line of `content`, skipping blank and malformed lines.
///
/// Lines are split on raw bytes, so a torn append that cuts a multi-byte
/// character only costs its own line.
pub(crate) fn parse_records<T: DeserializeOwned>(path: &Path, content: &[u8]) -> Vec<T> {
    content
        .split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .filter_map(|(idx, line)| match serde_json::from_slice(line) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %path.display(), line = idx + 1, error = %e, "Skipping malformed log line");
                None
            }
        })
        .collect()
}

/// Read and parse a whole JSONL file
pub(crate) async fn read_records<T: DeserializeOwned>(path: &Path) -> ObserveResult<Vec<T>> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| ObserveError::read(path, e))?;
    Ok(parse_records(path, &content))
}
