//! Schema change proposals.

use crate::connectors::GeneratedMigration;
use crate::core::{now, Timestamp};
use serde::{Deserialize, Serialize};

/// Unique proposal identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl ProposalId {
    /// Wrap an identifier received over the wire.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a unique ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target environment for a migration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development database
    Development,
    /// Production database
    Production,
}

impl Environment {
    /// The lowercase wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Whether approval should be surfaced as mandatory to callers.
    ///
    /// Advisory only: approval is enforced in code for both environments,
    /// but production changes never auto-execute.
    pub fn requires_approval(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Proposal lifecycle state.
///
/// `pending -> approved -> executed` or `pending -> rejected`; no other
/// transitions exist. `rejected` and `executed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Awaiting review
    Pending,
    /// Approved, not yet executed
    Approved,
    /// Rejected (terminal)
    Rejected,
    /// Executed (terminal)
    Executed,
}

impl ProposalStatus {
    /// The lowercase wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Executed => "executed",
        }
    }

    /// True for states no transition leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Rejected | ProposalStatus::Executed)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A requested schema mutation moving through review.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal identifier
    pub id: ProposalId,
    /// Requesting caller
    pub caller_id: String,
    /// Originating session
    pub session_id: String,
    /// The natural-language request
    pub request_text: String,
    /// Generated migration statement
    pub migration_sql: String,
    /// Statement undoing the change, when one exists
    pub rollback_sql: Option<String>,
    /// Plain-language explanation
    pub explanation: String,
    /// Generator warnings
    pub warnings: Vec<String>,
    /// Target environment
    pub environment: Environment,
    /// Lifecycle state
    pub status: ProposalStatus,
    /// Creation time
    pub created_at: Timestamp,
    /// Reviewing party, once reviewed
    pub approved_by: Option<String>,
    /// Review time
    pub approved_at: Option<Timestamp>,
    /// Execution time
    pub executed_at: Option<Timestamp>,
    /// Reviewer's reason, for rejections
    pub rejection_reason: Option<String>,
}

impl Proposal {
    /// Create a pending proposal from a generated migration.
    pub fn new(
        caller_id: &str,
        session_id: &str,
        request_text: &str,
        migration: GeneratedMigration,
        environment: Environment,
    ) -> Self {
        Self {
            id: ProposalId::generate(),
            caller_id: caller_id.to_string(),
            session_id: session_id.to_string(),
            request_text: request_text.to_string(),
            migration_sql: migration.sql,
            rollback_sql: migration.rollback_sql,
            explanation: migration.explanation,
            warnings: migration.warnings,
            environment,
            status: ProposalStatus::Pending,
            created_at: now(),
            approved_by: None,
            approved_at: None,
            executed_at: None,
            rejection_reason: None,
        }
    }

    /// Whether approval should be surfaced as mandatory to callers.
    pub fn requires_approval(&self) -> bool {
        self.environment.requires_approval()
    }
}
