//! Per-session ring buffers of recent events
//!
//! Each session keeps its last `capacity` events, oldest first. The store
//! holds owned clones, so callers can keep mutating their own events.
//! Nothing is collected automatically: sessions go away through
//! [`RingBufferStore::clear_session`] or [`RingBufferStore::evict_idle`].

use crate::events::LogEvent;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct SessionBuffer {
    events: VecDeque<LogEvent>,
    last_active: Instant,
}

/// Bounded FIFO buffers keyed by session id
#[derive(Debug)]
pub struct RingBufferStore {
    capacity: usize,
    sessions: HashMap<String, SessionBuffer>,
}

impl RingBufferStore {
    /// Create a store keeping at most `capacity` events per session.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sessions: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a copy of `event`, evicting the oldest entry on overflow
    pub fn add_event(&mut self, session_id: &str, event: &LogEvent) {
        self.add_event_at(session_id, event, Instant::now());
    }

    pub(crate) fn add_event_at(&mut self, session_id: &str, event: &LogEvent, now: Instant) {
        let capacity = self.capacity;
        let buffer = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionBuffer {
                events: VecDeque::with_capacity(capacity),
                last_active: now,
            });

        buffer.events.push_back(event.clone());
        while buffer.events.len() > capacity {
            buffer.events.pop_front();
        }
        buffer.last_active = now;
    }

    /// Buffered events for a session, oldest first
    pub fn events(&self, session_id: &str) -> Vec<LogEvent> {
        self.sessions
            .get(session_id)
            .map(|b| b.events.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Buffered events minus the most recent one.
    ///
    /// Used when the most recent event is the error being captured.
    pub fn events_before_last(&self, session_id: &str) -> Vec<LogEvent> {
        self.sessions
            .get(session_id)
            .map(|b| {
                let keep = b.events.len().saturating_sub(1);
                b.events.iter().take(keep).cloned().collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, session_id: &str) -> usize {
        self.sessions.get(session_id).map_or(0, |b| b.events.len())
    }

    pub fn contains_session(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop a session's buffer. Returns whether it existed.
    pub fn clear_session(&mut self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Drop buffers idle for longer than `ttl`, returning the evicted ids
    pub fn evict_idle(&mut self, now: Instant, ttl: Duration) -> Vec<String> {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, b)| now.saturating_duration_since(b.last_active) > ttl)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.sessions.remove(id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(n: usize) -> LogEvent {
        LogEvent::new(format!("hook-{n}"), "approve")
    }

    fn names(events: &[LogEvent]) -> Vec<String> {
        events.iter().map(|e| e.hook_name.clone()).collect()
    }

    #[test]
    fn test_keeps_most_recent_in_order() {
        let mut store = RingBufferStore::new(3);
        for n in 0..10 {
            store.add_event("s1", &event(n));
            assert!(store.len("s1") <= 3);
        }
        assert_eq!(
            names(&store.events("s1")),
            vec!["hook-7", "hook-8", "hook-9"]
        );
    }

    #[test]
    fn test_under_capacity_keeps_everything() {
        let mut store = RingBufferStore::new(5);
        store.add_event("s1", &event(0));
        store.add_event("s1", &event(1));
        assert_eq!(names(&store.events("s1")), vec!["hook-0", "hook-1"]);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let mut store = RingBufferStore::new(2);
        store.add_event("s1", &event(1));
        store.add_event("s2", &event(2));
        assert_eq!(names(&store.events("s1")), vec!["hook-1"]);
        assert_eq!(names(&store.events("s2")), vec!["hook-2"]);
        assert!(store.events("s3").is_empty());
    }

    #[test]
    fn test_buffer_owns_its_copies() {
        let mut store = RingBufferStore::new(2);
        let mut original = event(1).with_details(json!({"k": "before"}));
        store.add_event("s1", &original);

        original.details = Some(json!({"k": "after"}));
        original.hook_name.push_str("-mutated");

        let stored = store.events("s1");
        assert_eq!(stored[0].hook_name, "hook-1");
        assert_eq!(stored[0].details, Some(json!({"k": "before"})));
    }

    #[test]
    fn test_events_before_last() {
        let mut store = RingBufferStore::new(3);
        assert!(store.events_before_last("s1").is_empty());

        store.add_event("s1", &event(1));
        assert!(store.events_before_last("s1").is_empty());

        store.add_event("s1", &event(2));
        store.add_event("s1", &event(3));
        assert_eq!(
            names(&store.events_before_last("s1")),
            vec!["hook-1", "hook-2"]
        );
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut store = RingBufferStore::new(0);
        store.add_event("s1", &event(1));
        store.add_event("s1", &event(2));
        assert_eq!(store.capacity(), 1);
        assert_eq!(names(&store.events("s1")), vec!["hook-2"]);
    }

    #[test]
    fn test_clear_session() {
        let mut store = RingBufferStore::new(2);
        store.add_event("s1", &event(1));
        assert!(store.clear_session("s1"));
        assert!(!store.clear_session("s1"));
        assert_eq!(store.len("s1"), 0);
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_evict_idle() {
        let mut store = RingBufferStore::new(2);
        let start = Instant::now();
        store.add_event_at("old", &event(1), start);
        store.add_event_at("fresh", &event(2), start + Duration::from_secs(50));

        let evicted = store.evict_idle(start + Duration::from_secs(61), Duration::from_secs(60));

        assert_eq!(evicted, vec!["old".to_string()]);
        assert!(!store.contains_session("old"));
        assert!(store.contains_session("fresh"));
    }
}
