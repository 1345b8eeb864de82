//! Audit event records.

use crate::core::{now, Hash256, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique event identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// Create an event ID from a known string.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a unique ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Identifier returned when recording failed.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the failed-recording sentinel.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of security- and workflow-relevant events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Caller authenticated
    Login,
    /// Caller signed out
    Logout,
    /// Database connection attempt
    DatabaseConnection,
    /// Query generated for preview
    QueryPreview,
    /// Read-only query executed
    QueryExecution,
    /// Schema change proposed
    SchemaProposal,
    /// Schema proposal approved
    SchemaApproval,
    /// Schema proposal rejected
    SchemaRejection,
    /// Migration statement executed
    SchemaExecution,
    /// Session created
    SessionCreate,
    /// Session destroyed
    SessionDelete,
    /// Error surfaced to a caller
    Error,
}

impl EventKind {
    /// The snake_case wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Login => "login",
            EventKind::Logout => "logout",
            EventKind::DatabaseConnection => "database_connection",
            EventKind::QueryPreview => "query_preview",
            EventKind::QueryExecution => "query_execution",
            EventKind::SchemaProposal => "schema_proposal",
            EventKind::SchemaApproval => "schema_approval",
            EventKind::SchemaRejection => "schema_rejection",
            EventKind::SchemaExecution => "schema_execution",
            EventKind::SessionCreate => "session_create",
            EventKind::SessionDelete => "session_delete",
            EventKind::Error => "error",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable audit record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: EventId,
    /// Event kind
    pub kind: EventKind,
    /// Acting caller
    pub caller_id: String,
    /// Timestamp
    pub timestamp: Timestamp,
    /// Related session, if any
    pub session_id: Option<String>,
    /// Origin address, if known
    pub origin: Option<String>,
    /// Additional details
    pub details: HashMap<String, serde_json::Value>,
    /// Content hash (for tamper evidence)
    pub hash: Option<Hash256>,
}

impl AuditEvent {
    /// Create a new event stamped now.
    pub fn new(kind: EventKind, caller_id: &str) -> Self {
        Self {
            id: EventId::generate(),
            kind,
            caller_id: caller_id.to_string(),
            timestamp: now(),
            session_id: None,
            origin: None,
            details: HashMap::new(),
            hash: None,
        }
    }

    /// Add a detail. A value that fails to serialize is dropped.
    pub fn with_detail(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.to_string(), v);
        }
        self
    }

    /// Attach the related session.
    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    /// Attach the origin address.
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    /// Compute and set the content hash.
    pub fn compute_hash(&mut self) -> Hash256 {
        let data = format!(
            "{}:{}:{}:{}",
            self.id, self.kind, self.caller_id, self.timestamp
        );
        let hash = Hash256::digest(&[data.as_bytes()]);
        self.hash = Some(hash.clone());
        hash
    }

    /// Verify the stored content hash.
    pub fn verify_hash(&self) -> bool {
        match &self.hash {
            Some(stored) => {
                let data = format!(
                    "{}:{}:{}:{}",
                    self.id, self.kind, self.caller_id, self.timestamp
                );
                &Hash256::digest(&[data.as_bytes()]) == stored
            }
            None => false,
        }
    }

    /// Lowercased kind-plus-details text used by substring search.
    pub fn search_text(&self) -> String {
        let details = serde_json::to_string(&self.details).unwrap_or_default();
        format!("{} {}", self.kind, details).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id() {
        let id = EventId::new("test-id");
        assert_eq!(id.as_str(), "test-id");
        assert!(!id.is_empty());
        assert!(EventId::empty().is_empty());
    }

    #[test]
    fn test_event_creation() {
        let event = AuditEvent::new(EventKind::Login, "user-1");
        assert_eq!(event.caller_id, "user-1");
        assert_eq!(event.kind, EventKind::Login);
        assert!(event.session_id.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let event = AuditEvent::new(EventKind::QueryExecution, "user-1")
            .with_session("sess-1")
            .with_origin("203.0.113.9")
            .with_detail("row_count", 42);

        assert_eq!(event.session_id.as_deref(), Some("sess-1"));
        assert_eq!(event.origin.as_deref(), Some("203.0.113.9"));
        assert_eq!(event.details["row_count"], 42);
    }

    #[test]
    fn test_hash_roundtrip() {
        let mut event = AuditEvent::new(EventKind::SchemaApproval, "admin-1");
        assert!(!event.verify_hash());
        event.compute_hash();
        assert!(event.verify_hash());

        event.caller_id = "someone-else".to_string();
        assert!(!event.verify_hash());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(EventKind::SchemaProposal.to_string(), "schema_proposal");
        assert_eq!(EventKind::DatabaseConnection.as_str(), "database_connection");
    }

    #[test]
    fn test_search_text() {
        let event = AuditEvent::new(EventKind::SchemaProposal, "user-1")
            .with_detail("migration_sql", "CREATE TABLE notes (id INT)");
        let text = event.search_text();
        assert!(text.contains("schema_proposal"));
        assert!(text.contains("create table notes"));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let event = AuditEvent::new(EventKind::Login, "user-1").with_detail("email", "a@b.c");
        let json = serde_json::to_string(&event).unwrap();
        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.caller_id, event.caller_id);
        assert_eq!(parsed.kind, event.kind);
    }
}
