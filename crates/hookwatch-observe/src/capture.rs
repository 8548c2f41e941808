//! Error context capture
//!
//! When a hook reports an error the capturer snapshots the session's ring
//! buffer (the events leading up to the error), then collects the next
//! `after_window` events for that session. The bundle is written as a
//! four-line context record under `<log_dir>/error-context/`.
//!
//! Per session the capturer is either idle or capturing:
//!
//! ```text
//! IDLE --signal_error--> CAPTURING --(window full | flush_pending)--> IDLE
//! ```
//!
//! Callers must add the error event with [`ErrorContextCapturer::add_event`]
//! *before* calling [`ErrorContextCapturer::signal_error`] for it; the
//! snapshot excludes the newest buffered event on the assumption that it is
//! the error itself. [`crate::ExecutionObserver::emit`] keeps this order.

use crate::error::{ObserveError, ObserveResult};
use crate::events::{timestamp_now, LogEvent};
use crate::jsonl;
use crate::ring_buffer::RingBufferStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Subdirectory of the log root holding context records
pub const CONTEXT_DIR: &str = "error-context";
/// File name prefix of context records
pub const CONTEXT_FILE_PREFIX: &str = "error-context-";

/// An error waiting for its after-window to fill
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCapture {
    pub timestamp: String,
    pub error_event: LogEvent,
    pub before_events: Vec<LogEvent>,
    pub after_events: Vec<LogEvent>,
    pub log_dir: PathBuf,
}

/// First line of a context record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    /// Timestamp of the error event
    pub timestamp: String,
    /// When the record was written
    pub captured_at: String,
    pub session_id: String,
    pub hook_name: String,
    pub decision: String,
    pub before_count: usize,
    pub after_count: usize,
}

/// One line of a context record file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextLine {
    Metadata(ContextMetadata),
    ContextBefore { entries: Vec<LogEvent> },
    Error { entry: LogEvent },
    ContextAfter { entries: Vec<LogEvent> },
}

/// A parsed context record
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRecord {
    pub metadata: ContextMetadata,
    pub before: Vec<LogEvent>,
    pub error: LogEvent,
    pub after: Vec<LogEvent>,
}

/// File name for the context record of an error at `timestamp`.
///
/// Anything outside `[A-Za-z0-9_-]` becomes `-`, so
/// `2026-01-04T15:30:00.123Z` maps to
/// `error-context-2026-01-04T15-30-00-123Z.jsonl`.
pub fn context_file_name(timestamp: &str) -> String {
    let safe: String = timestamp
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{CONTEXT_FILE_PREFIX}{safe}.jsonl")
}

/// Write a context record and return its path.
///
/// The record is four lines: metadata, the before segment, the error and the
/// after segment. The file name depends only on the error timestamp, so an
/// error in another session or process within the same millisecond
/// overwrites this record.
pub async fn save_context(
    log_dir: &Path,
    session_id: &str,
    error_event: &LogEvent,
    before_events: &[LogEvent],
    after_events: &[LogEvent],
) -> ObserveResult<PathBuf> {
    let context_dir = log_dir.join(CONTEXT_DIR);
    jsonl::ensure_dir(&context_dir).await?;

    let lines = [
        ContextLine::Metadata(ContextMetadata {
            timestamp: error_event.timestamp.clone(),
            captured_at: timestamp_now(),
            session_id: session_id.to_string(),
            hook_name: error_event.hook_name.clone(),
            decision: error_event.decision.clone(),
            before_count: before_events.len(),
            after_count: after_events.len(),
        }),
        ContextLine::ContextBefore {
            entries: before_events.to_vec(),
        },
        ContextLine::Error {
            entry: error_event.clone(),
        },
        ContextLine::ContextAfter {
            entries: after_events.to_vec(),
        },
    ];

    let mut content = String::new();
    for line in &lines {
        content.push_str(&serde_json::to_string(line)?);
        content.push('\n');
    }

    let path = context_dir.join(context_file_name(&error_event.timestamp));
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| ObserveError::write(&path, e))?;

    debug!(path = %path.display(), session_id, "Saved error context");
    Ok(path)
}

/// Parse a context record written by [`save_context`]
pub async fn read_context_record(path: &Path) -> ObserveResult<ContextRecord> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ObserveError::read(path, e))?;

    let lines = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(serde_json::from_str::<ContextLine>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ObserveError::parse(path, e.to_string()))?;

    match <[ContextLine; 4]>::try_from(lines) {
        Ok(
            [
                ContextLine::Metadata(metadata),
                ContextLine::ContextBefore { entries: before },
                ContextLine::Error { entry: error },
                ContextLine::ContextAfter { entries: after },
            ],
        ) => Ok(ContextRecord {
            metadata,
            before,
            error,
            after,
        }),
        Ok(_) => Err(ObserveError::parse(path, "context record lines out of order")),
        Err(lines) => Err(ObserveError::parse(
            path,
            format!("expected 4 lines, found {}", lines.len()),
        )),
    }
}

/// Destination for captured error context
#[async_trait]
pub trait ContextSink: Send + Sync {
    async fn save_context(
        &self,
        log_dir: &Path,
        session_id: &str,
        error_event: &LogEvent,
        before_events: &[LogEvent],
        after_events: &[LogEvent],
    ) -> ObserveResult<PathBuf>;
}

/// Writes context records to the filesystem with [`save_context`]
#[derive(Debug, Default, Clone, Copy)]
pub struct FsContextSink;

#[async_trait]
impl ContextSink for FsContextSink {
    async fn save_context(
        &self,
        log_dir: &Path,
        session_id: &str,
        error_event: &LogEvent,
        before_events: &[LogEvent],
        after_events: &[LogEvent],
    ) -> ObserveResult<PathBuf> {
        save_context(log_dir, session_id, error_event, before_events, after_events).await
    }
}

/// Ring buffers plus at most one pending capture per session
pub struct ErrorContextCapturer<S: ContextSink = FsContextSink> {
    buffers: RingBufferStore,
    pending: HashMap<String, PendingCapture>,
    after_window: usize,
    sink: S,
}

impl ErrorContextCapturer<FsContextSink> {
    /// Capturer writing context records to disk
    pub fn new(ring_capacity: usize, after_window: usize) -> Self {
        Self::with_sink(ring_capacity, after_window, FsContextSink)
    }
}

impl<S: ContextSink> ErrorContextCapturer<S> {
    pub fn with_sink(ring_capacity: usize, after_window: usize, sink: S) -> Self {
        Self {
            buffers: RingBufferStore::new(ring_capacity),
            pending: HashMap::new(),
            after_window: after_window.max(1),
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn buffers(&self) -> &RingBufferStore {
        &self.buffers
    }

    pub fn after_window(&self) -> usize {
        self.after_window
    }

    pub fn pending(&self, session_id: &str) -> Option<&PendingCapture> {
        self.pending.get(session_id)
    }

    /// Buffer `event` and feed it to the session's pending capture.
    ///
    /// Returns the save result when this event completed the after-window.
    pub async fn add_event(
        &mut self,
        session_id: &str,
        event: &LogEvent,
    ) -> Option<ObserveResult<PathBuf>> {
        self.add_event_at(session_id, event, Instant::now()).await
    }

    pub(crate) async fn add_event_at(
        &mut self,
        session_id: &str,
        event: &LogEvent,
        now: Instant,
    ) -> Option<ObserveResult<PathBuf>> {
        self.buffers.add_event_at(session_id, event, now);

        let capture = self.pending.get_mut(session_id)?;
        capture.after_events.push(event.clone());
        if capture.after_events.len() < self.after_window {
            return None;
        }

        let capture = self.pending.remove(session_id)?;
        Some(self.persist(session_id, capture).await)
    }

    /// Start capturing around `error_event`, which must already be buffered.
    ///
    /// A capture already pending for the session is replaced and returned
    /// unsaved; its partial after-window is lost.
    pub fn signal_error(
        &mut self,
        session_id: &str,
        error_event: &LogEvent,
        log_dir: &Path,
    ) -> Option<PendingCapture> {
        let capture = PendingCapture {
            timestamp: timestamp_now(),
            error_event: error_event.clone(),
            before_events: self.buffers.events_before_last(session_id),
            after_events: Vec::new(),
            log_dir: log_dir.to_path_buf(),
        };

        let replaced = self.pending.insert(session_id.to_string(), capture);
        if let Some(old) = &replaced {
            debug!(
                session_id,
                dropped_error = %old.error_event.timestamp,
                after_events = old.after_events.len(),
                "Replacing pending error capture"
            );
        }
        replaced
    }

    /// Save the session's pending capture with whatever after-events it has
    pub async fn flush_pending(&mut self, session_id: &str) -> Option<ObserveResult<PathBuf>> {
        let capture = self.pending.remove(session_id)?;
        Some(self.persist(session_id, capture).await)
    }

    /// Discard the session's buffer and pending capture without saving
    pub fn clear_session(&mut self, session_id: &str) -> bool {
        let had_buffer = self.buffers.clear_session(session_id);
        let had_capture = self.pending.remove(session_id).is_some();
        had_buffer || had_capture
    }

    /// Evict sessions idle for longer than `ttl`.
    ///
    /// Pending captures of evicted sessions are flushed first.
    pub async fn evict_idle(&mut self, now: Instant, ttl: Duration) -> Vec<String> {
        let evicted = self.buffers.evict_idle(now, ttl);
        for session_id in &evicted {
            if let Some(Err(e)) = self.flush_pending(session_id).await {
                warn!(session_id = %session_id, error = %e, "Failed to flush capture of evicted session");
            }
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "Evicted idle sessions");
        }
        evicted
    }

    async fn persist(&self, session_id: &str, capture: PendingCapture) -> ObserveResult<PathBuf> {
        self.sink
            .save_context(
                &capture.log_dir,
                session_id,
                &capture.error_event,
                &capture.before_events,
                &capture.after_events,
            )
            .await
    }
}
