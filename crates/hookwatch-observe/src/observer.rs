//! Execution observer: the entry point hooks talk to
//!
//! One observer is built per process (or per long-lived host) and passed by
//! reference to whatever emits events. It owns the in-memory session state,
//! so dropping it drops every buffer and pending capture.
//!
//! Every write here is best effort. Failures are logged at debug level and
//! reported in [`EmitOutcome`], never returned to the hook.

use crate::capture::{ContextSink, ErrorContextCapturer, FsContextSink};
use crate::events::LogEvent;
use crate::session_log::{self, EXECUTION_LOG};
use crate::severity::{classify, route_to_severity_log, Severity};
use hookwatch_config::ObserveConfig;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Optional attributes of an emitted event
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub session_id: Option<String>,
    pub duration_ms: Option<u64>,
}

impl EmitOptions {
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            duration_ms: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// What happened to one emitted event
#[derive(Debug, Clone)]
pub struct EmitOutcome {
    pub event: LogEvent,
    pub severity: Severity,
    /// The event was appended to its session log
    pub session_logged: bool,
    /// Severity log the event was appended to
    pub severity_log: Option<PathBuf>,
    /// Context record completed by this event
    pub context_saved: Option<PathBuf>,
}

/// Captures, classifies and persists hook events
pub struct ExecutionObserver<S: ContextSink = FsContextSink> {
    config: ObserveConfig,
    capturer: ErrorContextCapturer<S>,
}

impl ExecutionObserver<FsContextSink> {
    pub fn new(config: ObserveConfig) -> Self {
        Self::with_sink(config, FsContextSink)
    }
}

impl<S: ContextSink> ExecutionObserver<S> {
    pub fn with_sink(config: ObserveConfig, sink: S) -> Self {
        let capturer = ErrorContextCapturer::with_sink(config.ring_capacity, config.after_window, sink);
        Self { config, capturer }
    }

    pub fn config(&self) -> &ObserveConfig {
        &self.config
    }

    pub fn capturer(&self) -> &ErrorContextCapturer<S> {
        &self.capturer
    }

    /// Build an event from hook output and record it
    pub async fn emit(
        &mut self,
        hook_name: &str,
        decision: &str,
        reason: Option<&str>,
        details: Option<Value>,
        options: EmitOptions,
    ) -> EmitOutcome {
        let mut event = LogEvent::new(hook_name, decision);
        event.session_id = options.session_id;
        event.reason = reason.map(str::to_string);
        event.details = details;
        event.duration_ms = options.duration_ms;
        self.record(event).await
    }

    /// Record an already-built event.
    ///
    /// Session-scoped stores only see events with a session id. ERROR
    /// events open a capture window after they have been buffered.
    pub async fn record(&mut self, event: LogEvent) -> EmitOutcome {
        if let Some(ttl) = self.config.session_idle_ttl() {
            self.capturer.evict_idle(Instant::now(), ttl).await;
        }

        let severity = classify(&event.decision);
        let log_dir = self.config.log_dir.clone();
        let mut session_logged = false;
        let mut context_saved = None;

        if let Some(session_id) = event.session_id.as_deref() {
            match session_log::append_entry(&log_dir, EXECUTION_LOG, session_id, &event).await {
                Ok(_) => session_logged = true,
                Err(e) => debug!(session_id, error = %e, "Session log append skipped"),
            }

            match self.capturer.add_event(session_id, &event).await {
                Some(Ok(path)) => context_saved = Some(path),
                Some(Err(e)) => debug!(session_id, error = %e, "Error context save skipped"),
                None => {}
            }
        }

        let severity_log =
            match route_to_severity_log(&log_dir, &event, severity, self.config.debug_logging).await {
                Ok(path) => path,
                Err(e) => {
                    debug!(%severity, error = %e, "Severity log append skipped");
                    None
                }
            };

        if severity == Severity::Error {
            if let Some(session_id) = event.session_id.as_deref() {
                self.capturer.signal_error(session_id, &event, &log_dir);
            }
        }

        EmitOutcome {
            event,
            severity,
            session_logged,
            severity_log,
            context_saved,
        }
    }

    /// Save a partially filled capture, e.g. at session teardown
    pub async fn flush_pending(&mut self, session_id: &str) -> Option<PathBuf> {
        match self.capturer.flush_pending(session_id).await? {
            Ok(path) => Some(path),
            Err(e) => {
                debug!(session_id, error = %e, "Error context flush skipped");
                None
            }
        }
    }

    /// Forget a session's buffer and pending capture
    pub fn clear_session(&mut self, session_id: &str) -> bool {
        self.capturer.clear_session(session_id)
    }

    /// Evict idle sessions now; a no-op unless an idle TTL is configured
    pub async fn evict_idle_sessions(&mut self) -> Vec<String> {
        match self.config.session_idle_ttl() {
            Some(ttl) => self.capturer.evict_idle(Instant::now(), ttl).await,
            None => Vec::new(),
        }
    }

    /// Events logged for one session; empty if the log is missing or unreadable
    pub async fn read_session(&self, session_id: &str) -> Vec<LogEvent> {
        session_log::read_entries(&self.config.log_dir, EXECUTION_LOG, session_id)
            .await
            .unwrap_or_else(|e| {
                debug!(session_id, error = %e, "Session log read failed");
                Vec::new()
            })
    }

    /// Execution records of every session, oldest first
    pub async fn read_all_sessions(&self) -> Vec<Value> {
        session_log::read_entries_across_sessions(&self.config.log_dir, EXECUTION_LOG)
            .await
            .unwrap_or_else(|e| {
                debug!(error = %e, "Cross-session read failed");
                Vec::new()
            })
    }
}
