//! The append-only audit trail.
//!
//! A capacity-bounded ring: once full, the oldest events are dropped on
//! insert. No update or delete operation exists.

use crate::audit::event::{AuditEvent, EventId, EventKind};
use crate::core::Timestamp;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;
use tracing::error;

const DEFAULT_CAPACITY: usize = 10_000;

/// Summary counters over the retained events.
#[derive(Clone, Debug, serde::Serialize)]
pub struct TrailStatistics {
    /// Retained event count
    pub total_events: usize,
    /// Event count per kind label
    pub events_by_kind: HashMap<String, usize>,
    /// Number of distinct callers seen
    pub distinct_callers: usize,
    /// Oldest retained timestamp
    pub earliest: Option<Timestamp>,
    /// Newest retained timestamp
    pub latest: Option<Timestamp>,
}

/// Capacity-bounded, append-only event store.
pub struct AuditTrail {
    events: RwLock<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl AuditTrail {
    /// Create a trail retaining at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// Append an event, evicting the oldest entry when full.
    ///
    /// Never fails: recording is a side channel and must not block the
    /// operation it instruments. A storage problem yields an empty id.
    pub fn record(&self, mut event: AuditEvent) -> EventId {
        event.compute_hash();
        let id = event.id.clone();

        match self.events.write() {
            Ok(mut events) => {
                if events.len() >= self.capacity {
                    events.pop_front();
                }
                events.push_back(event);
                id
            }
            Err(_) => {
                error!("audit trail lock poisoned, event dropped");
                EventId::empty()
            }
        }
    }

    /// Events for one caller, newest first.
    pub fn for_caller(&self, caller_id: &str, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.read().unwrap();
        events
            .iter()
            .rev()
            .filter(|e| e.caller_id == caller_id)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Events touching one session, newest first, unbounded.
    pub fn for_session(&self, session_id: &str) -> Vec<AuditEvent> {
        let events = self.events.read().unwrap();
        events
            .iter()
            .rev()
            .filter(|e| e.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect()
    }

    /// Substring search over serialized kind+details, with caller and
    /// inclusive date-range filters, all ANDed. Newest first.
    ///
    /// An empty query matches every event.
    pub fn search(
        &self,
        query: &str,
        caller_id: Option<&str>,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
        limit: usize,
    ) -> Vec<AuditEvent> {
        let needle = query.to_lowercase();
        let events = self.events.read().unwrap();

        events
            .iter()
            .rev()
            .filter(|e| caller_id.map_or(true, |c| e.caller_id == c))
            .filter(|e| start.map_or(true, |s| e.timestamp >= s))
            .filter(|e| end.map_or(true, |t| e.timestamp <= t))
            .filter(|e| needle.is_empty() || e.search_text().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Summary counters over the retained events.
    pub fn statistics(&self) -> TrailStatistics {
        let events = self.events.read().unwrap();

        let mut events_by_kind: HashMap<String, usize> = HashMap::new();
        let mut callers: HashSet<&str> = HashSet::new();
        for event in events.iter() {
            *events_by_kind
                .entry(event.kind.as_str().to_string())
                .or_insert(0) += 1;
            callers.insert(&event.caller_id);
        }

        TrailStatistics {
            total_events: events.len(),
            events_by_kind,
            distinct_callers: callers.len(),
            earliest: events.front().map(|e| e.timestamp),
            latest: events.back().map(|e| e.timestamp),
        }
    }

    /// Retained event count.
    pub fn len(&self) -> usize {
        self.events.read().unwrap().len()
    }

    /// True when no events are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured ring capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Typed recording helpers for the event kinds the surrounding layers emit.
impl AuditTrail {
    /// Record a successful authentication.
    pub fn log_login(&self, caller_id: &str, email: &str, origin: Option<&str>) -> EventId {
        let mut event = AuditEvent::new(EventKind::Login, caller_id).with_detail("email", email);
        if let Some(origin) = origin {
            event = event.with_origin(origin);
        }
        self.record(event)
    }

    /// Record a sign-out.
    pub fn log_logout(&self, caller_id: &str, email: &str, origin: Option<&str>) -> EventId {
        let mut event = AuditEvent::new(EventKind::Logout, caller_id).with_detail("email", email);
        if let Some(origin) = origin {
            event = event.with_origin(origin);
        }
        self.record(event)
    }

    /// Record a database connection attempt.
    pub fn log_database_connection(
        &self,
        caller_id: &str,
        session_id: Option<&str>,
        provider: &str,
        success: bool,
        error_message: Option<&str>,
    ) -> EventId {
        let mut event = AuditEvent::new(EventKind::DatabaseConnection, caller_id)
            .with_detail("provider", provider)
            .with_detail("success", success);
        if let Some(session_id) = session_id {
            event = event.with_session(session_id);
        }
        if let Some(message) = error_message {
            event = event.with_detail("error_message", message);
        }
        self.record(event)
    }

    /// Record a generated query preview.
    pub fn log_query_preview(
        &self,
        caller_id: &str,
        session_id: &str,
        request_text: &str,
        generated_sql: &str,
        confidence: f32,
    ) -> EventId {
        self.record(
            AuditEvent::new(EventKind::QueryPreview, caller_id)
                .with_session(session_id)
                .with_detail("request_text", request_text)
                .with_detail("generated_sql", generated_sql)
                .with_detail("confidence", confidence),
        )
    }

    /// Record a read-only query execution.
    pub fn log_query_execution(
        &self,
        caller_id: &str,
        session_id: &str,
        sql: &str,
        row_count: usize,
        success: bool,
        error_message: Option<&str>,
    ) -> EventId {
        let mut event = AuditEvent::new(EventKind::QueryExecution, caller_id)
            .with_session(session_id)
            .with_detail("sql_query", sql)
            .with_detail("row_count", row_count)
            .with_detail("success", success);
        if let Some(message) = error_message {
            event = event.with_detail("error_message", message);
        }
        self.record(event)
    }

    /// Record a session creation.
    pub fn log_session_create(&self, caller_id: &str, session_id: &str, provider: &str) -> EventId {
        self.record(
            AuditEvent::new(EventKind::SessionCreate, caller_id)
                .with_session(session_id)
                .with_detail("provider", provider),
        )
    }

    /// Record a session destruction.
    pub fn log_session_delete(&self, caller_id: &str, session_id: &str) -> EventId {
        self.record(AuditEvent::new(EventKind::SessionDelete, caller_id).with_session(session_id))
    }

    /// Record an error surfaced to a caller.
    pub fn log_error(
        &self,
        caller_id: &str,
        error_type: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> EventId {
        let mut event = AuditEvent::new(EventKind::Error, caller_id)
            .with_detail("error_type", error_type)
            .with_detail("error_message", message);
        if let Some(session_id) = session_id {
            event = event.with_session(session_id);
        }
        self.record(event)
    }
}
