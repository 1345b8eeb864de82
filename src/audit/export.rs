//! Audit trail exports.
//!
//! Structured exports carry the full event list; flat exports render a
//! row-oriented CSV projection for spreadsheet import.

use crate::audit::event::AuditEvent;
use crate::audit::trail::AuditTrail;
use crate::core::{now, Timestamp};
use serde::Serialize;

/// Export format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Full event list
    Structured,
    /// Row-oriented CSV projection
    Flat,
}

/// Exported audit payload.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ExportPayload {
    /// Full event list
    Structured {
        /// Matching events, newest first
        events: Vec<AuditEvent>,
        /// Number of exported events
        count: usize,
        /// Export time
        exported_at: Timestamp,
    },
    /// CSV projection: id, kind, caller, timestamp, session, details
    Flat {
        /// CSV content including header row
        content: String,
        /// Number of exported rows
        count: usize,
        /// Export time
        exported_at: Timestamp,
    },
}

impl ExportPayload {
    /// Number of exported events.
    pub fn count(&self) -> usize {
        match self {
            ExportPayload::Structured { count, .. } | ExportPayload::Flat { count, .. } => *count,
        }
    }
}

impl AuditTrail {
    /// Export retained events matching the caller and date filters.
    pub fn export(
        &self,
        format: ExportFormat,
        caller_id: Option<&str>,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> ExportPayload {
        let events = self.search("", caller_id, start, end, usize::MAX);
        let count = events.len();

        match format {
            ExportFormat::Structured => ExportPayload::Structured {
                events,
                count,
                exported_at: now(),
            },
            ExportFormat::Flat => ExportPayload::Flat {
                content: to_csv(&events),
                count,
                exported_at: now(),
            },
        }
    }
}

fn to_csv(events: &[AuditEvent]) -> String {
    let mut output = String::new();
    output.push_str("id,kind,caller_id,timestamp,session_id,details\n");

    for event in events {
        let details = serde_json::to_string(&event.details)
            .unwrap_or_default()
            .replace('"', "\"\"");
        output.push_str(&format!(
            "{},{},{},{},{},\"{}\"\n",
            event.id,
            event.kind,
            event.caller_id,
            event.timestamp.to_rfc3339(),
            event.session_id.as_deref().unwrap_or(""),
            details
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trail() -> AuditTrail {
        let trail = AuditTrail::default();
        trail.log_session_create("user-1", "sess-1", "Neon");
        trail.log_query_execution("user-1", "sess-1", "SELECT 1", 1, true, None);
        trail.log_session_create("user-2", "sess-2", "Supabase");
        trail
    }

    #[test]
    fn test_structured_export() {
        let trail = sample_trail();
        let payload = trail.export(ExportFormat::Structured, None, None, None);

        assert_eq!(payload.count(), 3);
        match payload {
            ExportPayload::Structured { events, .. } => {
                assert_eq!(events.len(), 3);
            }
            ExportPayload::Flat { .. } => panic!("expected structured payload"),
        }
    }

    #[test]
    fn test_structured_export_caller_filter() {
        let trail = sample_trail();
        let payload = trail.export(ExportFormat::Structured, Some("user-2"), None, None);
        assert_eq!(payload.count(), 1);
    }

    #[test]
    fn test_flat_export_csv() {
        let trail = sample_trail();
        let payload = trail.export(ExportFormat::Flat, None, None, None);

        match payload {
            ExportPayload::Flat { content, count, .. } => {
                assert_eq!(count, 3);
                assert!(content.starts_with("id,kind,caller_id,timestamp,session_id,details\n"));
                assert_eq!(content.lines().count(), 4);
                assert!(content.contains("session_create"));
                assert!(content.contains("sess-1"));
            }
            ExportPayload::Structured { .. } => panic!("expected flat payload"),
        }
    }

    #[test]
    fn test_flat_export_escapes_quotes() {
        let trail = AuditTrail::default();
        trail.log_query_execution("user-1", "sess-1", "SELECT \"name\" FROM t", 0, true, None);

        let payload = trail.export(ExportFormat::Flat, None, None, None);
        match payload {
            ExportPayload::Flat { content, .. } => assert!(content.contains("\"\"name")),
            ExportPayload::Structured { .. } => panic!("expected flat payload"),
        }
    }

    #[test]
    fn test_date_range_export() {
        let trail = sample_trail();
        let future = now() + chrono::Duration::hours(1);
        let payload = trail.export(ExportFormat::Structured, None, Some(future), None);
        assert_eq!(payload.count(), 0);
    }
}
