//! External collaborator interfaces.
//!
//! The core never talks to a database driver, an identity provider, or a
//! text-generation model directly; the surrounding layer supplies
//! implementations of these traits.

pub mod heuristic;

pub use heuristic::RuleBasedGenerator;

use crate::core::Result;
use crate::workflow::proposal::Environment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of a connectivity probe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Whether the round-trip succeeded
    pub ok: bool,
    /// Detected provider label
    pub provider: String,
    /// Human-readable outcome
    pub message: String,
}

/// Result of a read-only query.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SelectOutcome {
    /// Whether the query succeeded
    pub ok: bool,
    /// Column names in result order
    pub columns: Vec<String>,
    /// Rows keyed by column name
    pub rows: Vec<HashMap<String, serde_json::Value>>,
    /// Human-readable outcome
    pub message: String,
}

/// Result of a DDL execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DdlOutcome {
    /// Whether the statement was applied
    pub ok: bool,
    /// Human-readable outcome
    pub message: String,
}

impl DdlOutcome {
    /// A successful application.
    pub fn applied(message: &str) -> Self {
        Self {
            ok: true,
            message: message.to_string(),
        }
    }

    /// A failed application.
    pub fn failed(message: &str) -> Self {
        Self {
            ok: false,
            message: message.to_string(),
        }
    }
}

/// Output of text-to-SQL generation for read-only queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedSql {
    /// The generated SELECT statement
    pub sql: String,
    /// Plain-language explanation
    pub explanation: String,
    /// Generator confidence in [0, 1]
    pub confidence: f32,
    /// Safety or quality warnings
    pub warnings: Vec<String>,
}

/// Output of migration generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedMigration {
    /// The generated DDL statement
    pub sql: String,
    /// Plain-language explanation
    pub explanation: String,
    /// Safety or quality warnings
    pub warnings: Vec<String>,
    /// Statement undoing the change, when one exists
    pub rollback_sql: Option<String>,
}

/// Table names used to seed generation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaContext {
    /// Current table names in the target database
    pub tables: Vec<String>,
}

impl SchemaContext {
    /// True when no schema information is available.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Caller identity resolved by the surrounding authentication layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Identity {
    /// Stable caller identifier
    pub caller_id: String,
    /// Assigned role
    pub role: String,
    /// Additional verified claims
    pub claims: HashMap<String, serde_json::Value>,
}

/// Probes a connection string with a live round-trip.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Test the connection; a refused or unreachable endpoint is an `ok:
    /// false` outcome, not an error.
    async fn test_connection(&self, connection_string: &str) -> Result<ProbeOutcome>;
}

/// Runs SELECT statements against a target database.
#[async_trait]
pub trait ReadOnlyExecutor: Send + Sync {
    /// Run a read-only query. Implementations must reject non-SELECT
    /// input themselves, independent of any gating upstream.
    async fn run_select(&self, connection_string: &str, sql: &str) -> Result<SelectOutcome>;
}

/// Applies DDL statements transactionally.
#[async_trait]
pub trait DdlExecutor: Send + Sync {
    /// Apply an already-gated statement, all-or-nothing.
    async fn run_ddl(&self, connection_string: &str, sql: &str) -> Result<DdlOutcome>;
}

/// Turns natural-language requests into SQL.
///
/// A generation that produces nothing useful is an `Err`, never an empty
/// statement for downstream gate-checking.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Generate a read-only query for a prompt.
    async fn generate_sql(&self, prompt: &str, schema: &SchemaContext) -> Result<GeneratedSql>;

    /// Generate a migration candidate for a schema change request.
    async fn generate_migration(
        &self,
        prompt: &str,
        schema: &SchemaContext,
        environment: Environment,
    ) -> Result<GeneratedMigration>;
}

/// Resolves an inbound credential to a caller identity.
///
/// The core trusts this resolution as given and never re-validates
/// credentials itself.
pub trait IdentitySource: Send + Sync {
    /// Resolve a credential, or `None` when it does not authenticate.
    fn resolve(&self, credential: &str) -> Option<Identity>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_outcome_constructors() {
        assert!(DdlOutcome::applied("done").ok);
        assert!(!DdlOutcome::failed("nope").ok);
    }

    #[test]
    fn test_schema_context_empty() {
        assert!(SchemaContext::default().is_empty());
        let ctx = SchemaContext {
            tables: vec!["customers".to_string()],
        };
        assert!(!ctx.is_empty());
    }

    #[test]
    fn test_identity_serialization() {
        let identity = Identity {
            caller_id: "user-1".to_string(),
            role: "admin".to_string(),
            claims: HashMap::new(),
        };
        let json = serde_json::to_string(&identity).unwrap();
        assert!(json.contains("admin"));
    }
}
