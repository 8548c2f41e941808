//! Hook execution logging and error context capture
//!
//! Policy hooks emit one [`LogEvent`] per decision. This crate records them,
//! keeps enough recent history to explain failures, and cleans up after
//! itself.
//!
//! # Architecture
//!
//! Files live under the configured log root:
//! - `hook-execution-<session>.jsonl` - Every event of one session
//! - `hook-errors.log`, `hook-warnings.log` - ERROR / WARN events of all sessions
//! - `hook-debug.log` - DEBUG events, only when debug logging is enabled
//! - `error-context/error-context-<timestamp>.jsonl` - Events around an error
//!
//! In memory, each session has a ring buffer of its latest events and at most
//! one pending error capture. That state lives in an [`ExecutionObserver`]
//! and lasts as long as the observer does; the filesystem is the only state
//! shared between hook processes.
//!
//! # Example
//!
//! ```no_run
//! use hookwatch_config::ObserveConfig;
//! use hookwatch_observe::{EmitOptions, ExecutionObserver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ObserveConfig::load(None).await?;
//! let mut observer = ExecutionObserver::new(config);
//!
//! observer
//!     .emit("bash-guard", "block", Some("rm -rf /"), None, EmitOptions::session("s1"))
//!     .await;
//!
//! // At session end, keep a partial capture and release memory
//! observer.flush_pending("s1").await;
//! observer.clear_session("s1");
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod error;
pub mod events;
pub mod id;
pub mod janitor;
mod jsonl;
pub mod observer;
pub mod ring_buffer;
pub mod session_log;
pub mod severity;

// Re-exports for convenience
pub use capture::{
    read_context_record, save_context, ContextRecord, ContextSink, ErrorContextCapturer,
    FsContextSink, PendingCapture,
};
pub use error::{ObserveError, ObserveResult};
pub use events::{timestamp_now, LogEvent};
pub use id::sanitize_session_id;
pub use janitor::{
    compress_rotated, prune_expired_contexts, run_maintenance, CompressionReport,
    MaintenanceReport, PruneReport,
};
pub use observer::{EmitOptions, EmitOutcome, ExecutionObserver};
pub use ring_buffer::RingBufferStore;
pub use session_log::{append_entry, read_entries, read_entries_across_sessions};
pub use severity::{classify, route_to_severity_log, Severity};
