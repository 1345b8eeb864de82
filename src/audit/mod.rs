//! Audit Trail
//!
//! Append-only, capacity-bounded record of security-relevant actions:
//! - Closed event taxonomy with content hashes
//! - Caller, session, substring, and date-range queries
//! - Structured and flat (spreadsheet) exports
//!
//! Recording never fails the operation it instruments.

pub mod event;
pub mod export;
pub mod trail;

pub use event::{AuditEvent, EventId, EventKind};
pub use export::{ExportFormat, ExportPayload};
pub use trail::{AuditTrail, TrailStatistics};
