//! The schema change approval workflow.
//!
//! Proposals move `pending -> approved -> executed` or `pending ->
//! rejected`. Every transition is audited, and no statement runs without
//! passing the keyword gate first.

use crate::audit::{AuditEvent, AuditTrail, EventKind};
use crate::connectors::{DdlExecutor, DdlOutcome, ReadOnlyExecutor, SchemaContext, SqlGenerator};
use crate::core::{now, Error, Result};
use crate::workflow::gate;
use crate::workflow::proposal::{Environment, Proposal, ProposalId, ProposalStatus};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query used to seed generation with current table names.
const TABLE_NAMES_SQL: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = 'public' ORDER BY table_name";

/// Outcome of an approval or execution attempt.
#[derive(Clone, Debug)]
pub struct ApprovalOutcome {
    /// Post-transition snapshot of the proposal
    pub proposal: Proposal,
    /// Execution result, when execution was attempted
    pub execution: Option<DdlOutcome>,
}

/// Proposal lifecycle manager.
pub struct SchemaWorkflow {
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
    generator: Arc<dyn SqlGenerator>,
    select: Arc<dyn ReadOnlyExecutor>,
    ddl: Arc<dyn DdlExecutor>,
    trail: Arc<AuditTrail>,
    upstream_timeout: Duration,
}

impl SchemaWorkflow {
    /// Create a workflow wired to its collaborators.
    pub fn new(
        generator: Arc<dyn SqlGenerator>,
        select: Arc<dyn ReadOnlyExecutor>,
        ddl: Arc<dyn DdlExecutor>,
        trail: Arc<AuditTrail>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            proposals: RwLock::new(HashMap::new()),
            generator,
            select,
            ddl,
            trail,
            upstream_timeout,
        }
    }

    /// Generate a migration for a natural-language request and record it
    /// as a pending proposal.
    ///
    /// A proposal is recorded even when the generated statement would fail
    /// the gate (the gate applies at execution time); only a failed
    /// generation leaves nothing behind.
    pub async fn propose(
        &self,
        caller_id: &str,
        session_id: &str,
        request_text: &str,
        connection_string: &str,
        environment: Environment,
    ) -> Result<Proposal> {
        let context = self.schema_context(connection_string).await;

        let migration = match timeout(
            self.upstream_timeout,
            self.generator
                .generate_migration(request_text, &context, environment),
        )
        .await
        {
            Ok(Ok(migration)) => migration,
            Ok(Err(e)) => {
                warn!("migration generation failed: {}", e);
                return Err(e);
            }
            Err(_) => return Err(Error::UpstreamTimeout(self.upstream_timeout)),
        };

        let proposal = Proposal::new(caller_id, session_id, request_text, migration, environment);
        self.proposals
            .write()
            .unwrap()
            .insert(proposal.id.clone(), proposal.clone());

        self.trail.record(
            AuditEvent::new(EventKind::SchemaProposal, caller_id)
                .with_session(session_id)
                .with_detail("proposal_id", proposal.id.as_str())
                .with_detail("request_text", request_text)
                .with_detail("migration_sql", &proposal.migration_sql)
                .with_detail("environment", environment.as_str()),
        );

        Ok(proposal)
    }

    /// Approve a pending proposal.
    ///
    /// Development proposals approved with a connection are executed
    /// immediately; a failed execution leaves the proposal `approved` so
    /// it can be retried through [`SchemaWorkflow::execute`]. Production
    /// proposals never auto-execute.
    pub async fn approve(
        &self,
        proposal_id: &ProposalId,
        approver_id: &str,
        connection_string: Option<&str>,
    ) -> Result<ApprovalOutcome> {
        let mut snapshot = {
            let mut proposals = self.proposals.write().unwrap();
            let proposal = proposals
                .get_mut(proposal_id)
                .ok_or_else(|| Error::ProposalNotFound(proposal_id.to_string()))?;
            if proposal.status != ProposalStatus::Pending {
                return Err(Error::InvalidState(proposal.status.to_string()));
            }

            proposal.status = ProposalStatus::Approved;
            proposal.approved_by = Some(approver_id.to_string());
            proposal.approved_at = Some(now());
            proposal.clone()
        };

        let mut execution = None;
        if snapshot.environment == Environment::Development {
            if let Some(connection_string) = connection_string {
                let outcome = self.run_migration(&snapshot, connection_string, approver_id).await;
                if outcome.ok {
                    snapshot = self.mark_executed(proposal_id).unwrap_or(snapshot);
                }
                execution = Some(outcome);
            }
        }

        self.trail.record(
            AuditEvent::new(EventKind::SchemaApproval, approver_id)
                .with_session(&snapshot.session_id)
                .with_detail("proposal_id", proposal_id.as_str())
                .with_detail("original_caller", &snapshot.caller_id)
                .with_detail("executed", snapshot.status == ProposalStatus::Executed),
        );

        Ok(ApprovalOutcome {
            proposal: snapshot,
            execution,
        })
    }

    /// Reject a pending proposal with a reason.
    pub fn reject(
        &self,
        proposal_id: &ProposalId,
        approver_id: &str,
        reason: &str,
    ) -> Result<Proposal> {
        let snapshot = {
            let mut proposals = self.proposals.write().unwrap();
            let proposal = proposals
                .get_mut(proposal_id)
                .ok_or_else(|| Error::ProposalNotFound(proposal_id.to_string()))?;
            if proposal.status != ProposalStatus::Pending {
                return Err(Error::InvalidState(proposal.status.to_string()));
            }

            proposal.status = ProposalStatus::Rejected;
            proposal.approved_by = Some(approver_id.to_string());
            proposal.approved_at = Some(now());
            proposal.rejection_reason = Some(reason.to_string());
            proposal.clone()
        };

        self.trail.record(
            AuditEvent::new(EventKind::SchemaRejection, approver_id)
                .with_session(&snapshot.session_id)
                .with_detail("proposal_id", proposal_id.as_str())
                .with_detail("original_caller", &snapshot.caller_id)
                .with_detail("reason", reason),
        );

        Ok(snapshot)
    }

    /// Execute an already-approved proposal.
    ///
    /// The explicit execution step for proposals that were approved
    /// without a connection, and the retry path after a failed
    /// auto-execution.
    pub async fn execute(
        &self,
        proposal_id: &ProposalId,
        executor_id: &str,
        connection_string: &str,
    ) -> Result<ApprovalOutcome> {
        let snapshot = {
            let proposals = self.proposals.read().unwrap();
            let proposal = proposals
                .get(proposal_id)
                .ok_or_else(|| Error::ProposalNotFound(proposal_id.to_string()))?;
            if proposal.status != ProposalStatus::Approved {
                return Err(Error::InvalidState(proposal.status.to_string()));
            }
            proposal.clone()
        };

        let outcome = self.run_migration(&snapshot, connection_string, executor_id).await;
        let snapshot = if outcome.ok {
            self.mark_executed(proposal_id).unwrap_or(snapshot)
        } else {
            snapshot
        };

        Ok(ApprovalOutcome {
            proposal: snapshot,
            execution: Some(outcome),
        })
    }

    /// Look up one proposal.
    pub fn get(&self, proposal_id: &ProposalId) -> Option<Proposal> {
        self.proposals.read().unwrap().get(proposal_id).cloned()
    }

    /// Proposals created by one caller, newest first.
    pub fn list_for(&self, caller_id: &str) -> Vec<Proposal> {
        let mut proposals: Vec<Proposal> = self
            .proposals
            .read()
            .unwrap()
            .values()
            .filter(|p| p.caller_id == caller_id)
            .cloned()
            .collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        proposals
    }

    /// All proposals, newest first.
    pub fn list_all(&self) -> Vec<Proposal> {
        let mut proposals: Vec<Proposal> =
            self.proposals.read().unwrap().values().cloned().collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        proposals
    }

    /// Fetch current table names, tolerating upstream failure.
    async fn schema_context(&self, connection_string: &str) -> SchemaContext {
        match timeout(
            self.upstream_timeout,
            self.select.run_select(connection_string, TABLE_NAMES_SQL),
        )
        .await
        {
            Ok(Ok(outcome)) if outcome.ok => SchemaContext {
                tables: outcome
                    .rows
                    .iter()
                    .filter_map(|row| row.get("table_name"))
                    .filter_map(|value| value.as_str())
                    .map(String::from)
                    .collect(),
            },
            Ok(Ok(outcome)) => {
                debug!("schema context unavailable: {}", outcome.message);
                SchemaContext::default()
            }
            Ok(Err(e)) => {
                debug!("schema context fetch failed: {}", e);
                SchemaContext::default()
            }
            Err(_) => {
                warn!("schema context fetch timed out");
                SchemaContext::default()
            }
        }
    }

    /// Gate-check and run one migration statement, auditing the attempt.
    async fn run_migration(
        &self,
        proposal: &Proposal,
        connection_string: &str,
        actor: &str,
    ) -> DdlOutcome {
        let outcome = match gate::check_statement(&proposal.migration_sql) {
            Err(e) => DdlOutcome::failed(&e.to_string()),
            Ok(()) => {
                match timeout(
                    self.upstream_timeout,
                    self.ddl.run_ddl(connection_string, &proposal.migration_sql),
                )
                .await
                {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => DdlOutcome::failed(&e.to_string()),
                    Err(_) => DdlOutcome::failed(&format!(
                        "execution timed out after {:?}",
                        self.upstream_timeout
                    )),
                }
            }
        };

        if !outcome.ok {
            warn!(
                "migration execution failed for proposal {}: {}",
                proposal.id, outcome.message
            );
        }

        self.trail.record(
            AuditEvent::new(EventKind::SchemaExecution, actor)
                .with_session(&proposal.session_id)
                .with_detail("proposal_id", proposal.id.as_str())
                .with_detail("migration_sql", &proposal.migration_sql)
                .with_detail("success", outcome.ok)
                .with_detail("message", &outcome.message),
        );

        outcome
    }

    /// Advance an approved proposal to executed, returning the snapshot.
    fn mark_executed(&self, proposal_id: &ProposalId) -> Option<Proposal> {
        let mut proposals = self.proposals.write().unwrap();
        let proposal = proposals.get_mut(proposal_id)?;
        if proposal.status != ProposalStatus::Approved {
            return Some(proposal.clone());
        }
        proposal.status = ProposalStatus::Executed;
        proposal.executed_at = Some(now());
        Some(proposal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{
        GeneratedMigration, RuleBasedGenerator, SelectOutcome,
    };
    use async_trait::async_trait;

    /// Select stub returning a fixed table list.
    struct StaticSelect;

    #[async_trait]
    impl ReadOnlyExecutor for StaticSelect {
        async fn run_select(&self, _conn: &str, _sql: &str) -> Result<SelectOutcome> {
            let mut row = HashMap::new();
            row.insert(
                "table_name".to_string(),
                serde_json::Value::String("customers".to_string()),
            );
            Ok(SelectOutcome {
                ok: true,
                columns: vec!["table_name".to_string()],
                rows: vec![row],
                message: "1 row".to_string(),
            })
        }
    }

    /// DDL stub that records nothing and always succeeds.
    struct StaticDdl;

    #[async_trait]
    impl DdlExecutor for StaticDdl {
        async fn run_ddl(&self, _conn: &str, _sql: &str) -> Result<DdlOutcome> {
            Ok(DdlOutcome::applied("applied"))
        }
    }

    /// DDL stub that always fails.
    struct FailingDdl;

    #[async_trait]
    impl DdlExecutor for FailingDdl {
        async fn run_ddl(&self, _conn: &str, _sql: &str) -> Result<DdlOutcome> {
            Ok(DdlOutcome::failed("deadlock detected"))
        }
    }

    /// Generator emitting a fixed (possibly dangerous) statement.
    struct FixedGenerator(&'static str);

    #[async_trait]
    impl SqlGenerator for FixedGenerator {
        async fn generate_sql(
            &self,
            _prompt: &str,
            _schema: &SchemaContext,
        ) -> Result<crate::connectors::GeneratedSql> {
            Err(Error::GenerationFailed("not used".to_string()))
        }

        async fn generate_migration(
            &self,
            _prompt: &str,
            _schema: &SchemaContext,
            _environment: Environment,
        ) -> Result<GeneratedMigration> {
            Ok(GeneratedMigration {
                sql: self.0.to_string(),
                explanation: "fixed".to_string(),
                warnings: vec![],
                rollback_sql: None,
            })
        }
    }

    fn workflow_with(
        generator: Arc<dyn SqlGenerator>,
        ddl: Arc<dyn DdlExecutor>,
    ) -> (SchemaWorkflow, Arc<AuditTrail>) {
        let trail = Arc::new(AuditTrail::default());
        let workflow = SchemaWorkflow::new(
            generator,
            Arc::new(StaticSelect),
            ddl,
            Arc::clone(&trail),
            Duration::from_secs(5),
        );
        (workflow, trail)
    }

    const CONN: &str = "postgres://db.example.neon.tech/app";

    #[tokio::test]
    async fn test_development_propose_approve_executes() {
        let (workflow, trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(StaticDdl));

        let proposal = workflow
            .propose(
                "user-1",
                "sess-1",
                "add a column called notes to table customers",
                CONN,
                Environment::Development,
            )
            .await
            .unwrap();

        assert_eq!(proposal.status, ProposalStatus::Pending);
        assert!(proposal.migration_sql.starts_with("ALTER TABLE customers"));
        assert!(!proposal.requires_approval());

        let outcome = workflow
            .approve(&proposal.id, "admin-1", Some(CONN))
            .await
            .unwrap();

        assert_eq!(outcome.proposal.status, ProposalStatus::Executed);
        assert!(outcome.execution.unwrap().ok);
        assert!(outcome.proposal.executed_at.is_some());

        let kinds: Vec<_> = trail
            .for_session("sess-1")
            .iter()
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EventKind::SchemaProposal));
        assert!(kinds.contains(&EventKind::SchemaApproval));
        assert!(kinds.contains(&EventKind::SchemaExecution));
    }

    #[tokio::test]
    async fn test_production_approve_does_not_execute() {
        let (workflow, _trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(StaticDdl));

        let proposal = workflow
            .propose(
                "user-1",
                "sess-1",
                "add a column called notes to table customers",
                CONN,
                Environment::Production,
            )
            .await
            .unwrap();
        assert!(proposal.requires_approval());

        let outcome = workflow
            .approve(&proposal.id, "admin-1", None)
            .await
            .unwrap();

        assert_eq!(outcome.proposal.status, ProposalStatus::Approved);
        assert!(outcome.execution.is_none());
    }

    #[tokio::test]
    async fn test_production_approve_with_connection_still_does_not_execute() {
        let (workflow, _trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(StaticDdl));

        let proposal = workflow
            .propose("user-1", "sess-1", "add a column called x to table customers", CONN, Environment::Production)
            .await
            .unwrap();

        let outcome = workflow
            .approve(&proposal.id, "admin-1", Some(CONN))
            .await
            .unwrap();
        assert_eq!(outcome.proposal.status, ProposalStatus::Approved);
        assert!(outcome.execution.is_none());
    }

    #[tokio::test]
    async fn test_explicit_execute_after_approval() {
        let (workflow, _trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(StaticDdl));

        let proposal = workflow
            .propose("user-1", "sess-1", "add a column called x to table customers", CONN, Environment::Production)
            .await
            .unwrap();
        workflow.approve(&proposal.id, "admin-1", None).await.unwrap();

        let outcome = workflow
            .execute(&proposal.id, "admin-1", CONN)
            .await
            .unwrap();
        assert_eq!(outcome.proposal.status, ProposalStatus::Executed);

        // executed is terminal
        let err = workflow.execute(&proposal.id, "admin-1", CONN).await.unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_failed_execution_leaves_approved() {
        let (workflow, _trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(FailingDdl));

        let proposal = workflow
            .propose("user-1", "sess-1", "add a column called x to table customers", CONN, Environment::Development)
            .await
            .unwrap();

        let outcome = workflow
            .approve(&proposal.id, "admin-1", Some(CONN))
            .await
            .unwrap();

        assert_eq!(outcome.proposal.status, ProposalStatus::Approved);
        assert!(!outcome.execution.unwrap().ok);
        // retryable through the explicit execution step
        assert_eq!(
            workflow.get(&proposal.id).unwrap().status,
            ProposalStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_gate_blocks_dangerous_generated_sql() {
        let (workflow, _trail) =
            workflow_with(Arc::new(FixedGenerator("DROP TABLE customers")), Arc::new(StaticDdl));

        // the proposal is still recorded; the gate applies at execution
        let proposal = workflow
            .propose("user-1", "sess-1", "remove customers", CONN, Environment::Development)
            .await
            .unwrap();
        assert_eq!(proposal.status, ProposalStatus::Pending);

        let outcome = workflow
            .approve(&proposal.id, "admin-1", Some(CONN))
            .await
            .unwrap();

        assert_eq!(outcome.proposal.status, ProposalStatus::Approved);
        let execution = outcome.execution.unwrap();
        assert!(!execution.ok);
        assert!(execution.message.contains("DROP"));
    }

    #[tokio::test]
    async fn test_generation_failure_records_nothing() {
        let (workflow, trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(StaticDdl));

        let result = workflow
            .propose("user-1", "sess-1", "make everything faster", CONN, Environment::Development)
            .await;

        assert!(result.is_err());
        assert!(workflow.list_all().is_empty());
        assert!(trail.for_session("sess-1").is_empty());
    }

    #[tokio::test]
    async fn test_reject_then_reject_again() {
        let (workflow, _trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(StaticDdl));

        let proposal = workflow
            .propose("user-1", "sess-1", "add a column called x to table customers", CONN, Environment::Development)
            .await
            .unwrap();

        let rejected = workflow
            .reject(&proposal.id, "admin-1", "not needed")
            .unwrap();
        assert_eq!(rejected.status, ProposalStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("not needed"));

        let err = workflow
            .reject(&proposal.id, "admin-1", "again")
            .unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::InvalidState);
        // status unchanged
        assert_eq!(
            workflow.get(&proposal.id).unwrap().status,
            ProposalStatus::Rejected
        );
    }

    #[tokio::test]
    async fn test_approve_non_pending_fails_without_change() {
        let (workflow, _trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(StaticDdl));

        let proposal = workflow
            .propose("user-1", "sess-1", "add a column called x to table customers", CONN, Environment::Production)
            .await
            .unwrap();
        workflow.approve(&proposal.id, "admin-1", None).await.unwrap();

        let err = workflow
            .approve(&proposal.id, "admin-2", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::InvalidState);
        assert_eq!(
            workflow.get(&proposal.id).unwrap().approved_by.as_deref(),
            Some("admin-1")
        );
    }

    #[tokio::test]
    async fn test_unknown_proposal() {
        let (workflow, _trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(StaticDdl));

        let missing = ProposalId::generate();
        let err = workflow.approve(&missing, "admin-1", None).await.unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::NotFound);
        assert!(workflow.get(&missing).is_none());
    }

    #[tokio::test]
    async fn test_listings_newest_first() {
        let (workflow, _trail) =
            workflow_with(Arc::new(RuleBasedGenerator), Arc::new(StaticDdl));

        for text in [
            "add a column called a to table customers",
            "add a column called b to table customers",
        ] {
            workflow
                .propose("user-1", "sess-1", text, CONN, Environment::Development)
                .await
                .unwrap();
        }
        workflow
            .propose("user-2", "sess-2", "add a column called c to table customers", CONN, Environment::Development)
            .await
            .unwrap();

        let all = workflow.list_all();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let mine = workflow.list_for("user-1");
        assert_eq!(mine.len(), 2);
        assert!(mine[0].migration_sql.contains("COLUMN b"));
    }
}
