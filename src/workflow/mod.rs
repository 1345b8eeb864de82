//! Schema Change Workflow
//!
//! Turns natural-language change requests into reviewable, gated
//! migrations:
//! - Proposal lifecycle state machine (pending, approved, rejected, executed)
//! - Keyword gate applied before any statement runs
//! - Audit events for every transition

pub mod gate;
pub mod proposal;
pub mod service;

pub use gate::check_statement;
pub use proposal::{Environment, Proposal, ProposalId, ProposalStatus};
pub use service::{ApprovalOutcome, SchemaWorkflow};
