//! Rule-based SQL generation.
//!
//! A dependency-free [`SqlGenerator`] driven by keyword patterns. Used as
//! the fallback when no model-backed generator is configured, and by tests
//! that need deterministic output.

use crate::connectors::{GeneratedMigration, GeneratedSql, SchemaContext, SqlGenerator};
use crate::core::{Error, Result};
use crate::workflow::proposal::Environment;
use async_trait::async_trait;

/// Pattern-matching generator.
pub struct RuleBasedGenerator;

#[async_trait]
impl SqlGenerator for RuleBasedGenerator {
    async fn generate_sql(&self, prompt: &str, schema: &SchemaContext) -> Result<GeneratedSql> {
        let lower = prompt.to_lowercase();
        let table = named_table(&lower, schema);

        let sql = if lower.contains("count") || lower.contains("how many") {
            match &table {
                Some(table) => format!("SELECT COUNT(*) AS total FROM {}", table),
                None => "SELECT COUNT(*) AS total FROM information_schema.tables \
                         WHERE table_schema = 'public'"
                    .to_string(),
            }
        } else {
            match &table {
                Some(table) => format!("SELECT * FROM {} LIMIT 50", table),
                None => {
                    return Err(Error::GenerationFailed(
                        "no table name recognized in the request".to_string(),
                    ))
                }
            }
        };

        Ok(GeneratedSql {
            explanation: format!("Rule-matched query for: '{}'", prompt),
            confidence: 0.6,
            warnings: safety_warnings(&sql),
            sql,
        })
    }

    async fn generate_migration(
        &self,
        prompt: &str,
        schema: &SchemaContext,
        environment: Environment,
    ) -> Result<GeneratedMigration> {
        let lower = prompt.to_lowercase();
        let tokens: Vec<&str> = lower.split_whitespace().collect();

        let mut warnings =
            vec!["generated by rule matching - review before approval".to_string()];
        if environment == Environment::Production {
            warnings.push("production target - requires explicit approval".to_string());
        }

        if lower.contains("add") && lower.contains("column") {
            let column = identifier_after(&tokens, "column").unwrap_or_else(|| "new_column".into());
            let table = identifier_after(&tokens, "table")
                .or_else(|| schema.tables.first().cloned())
                .unwrap_or_else(|| "example_table".into());

            Ok(GeneratedMigration {
                sql: format!("ALTER TABLE {} ADD COLUMN {} TEXT", table, column),
                explanation: format!("Adds a '{}' column to the '{}' table.", column, table),
                warnings,
                rollback_sql: Some(format!("ALTER TABLE {} DROP COLUMN {}", table, column)),
            })
        } else if lower.contains("create") && lower.contains("table") {
            let table = identifier_after(&tokens, "table")
                .or_else(|| identifier_after(&tokens, "called"))
                .unwrap_or_else(|| "new_table".into());

            Ok(GeneratedMigration {
                sql: format!(
                    "CREATE TABLE IF NOT EXISTS {} (id SERIAL PRIMARY KEY, name VARCHAR(255))",
                    table
                ),
                explanation: format!("Creates a '{}' table with an id and a name.", table),
                warnings,
                rollback_sql: Some(format!("DROP TABLE IF EXISTS {}", table)),
            })
        } else if lower.contains("index") {
            let table = identifier_after(&tokens, "table")
                .or_else(|| identifier_after(&tokens, "on"))
                .or_else(|| schema.tables.first().cloned())
                .unwrap_or_else(|| "example_table".into());
            let column = identifier_after(&tokens, "column").unwrap_or_else(|| "id".into());

            Ok(GeneratedMigration {
                sql: format!(
                    "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {} ({})",
                    table, column, table, column
                ),
                explanation: format!("Creates an index on {} ({}).", table, column),
                warnings,
                rollback_sql: Some(format!("DROP INDEX IF EXISTS idx_{}_{}", table, column)),
            })
        } else {
            Err(Error::GenerationFailed(
                "no migration rule matched; describe the change as add column, \
                 create table, or create index"
                    .to_string(),
            ))
        }
    }
}

/// The first schema table mentioned in the prompt, or the word after
/// "table"/"from".
fn named_table(lower_prompt: &str, schema: &SchemaContext) -> Option<String> {
    for table in &schema.tables {
        if lower_prompt.contains(&table.to_lowercase()) {
            return Some(table.clone());
        }
    }
    let tokens: Vec<&str> = lower_prompt.split_whitespace().collect();
    identifier_after(&tokens, "table").or_else(|| identifier_after(&tokens, "from"))
}

/// The first identifier-looking token after `marker`, skipping filler words.
fn identifier_after(tokens: &[&str], marker: &str) -> Option<String> {
    const FILLER: [&str; 6] = ["called", "named", "a", "an", "the", "to"];

    let position = tokens.iter().position(|t| *t == marker)?;
    tokens[position + 1..]
        .iter()
        .map(|t| sanitize_identifier(t))
        .find(|t| !t.is_empty() && !FILLER.contains(&t.as_str()))
}

fn sanitize_identifier(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

fn safety_warnings(sql: &str) -> Vec<String> {
    let upper = sql.to_uppercase();
    let mut warnings = Vec::new();
    if !upper.contains("LIMIT") && !upper.contains("COUNT(") {
        warnings.push("query has no LIMIT clause - results might be large".to_string());
    }
    if upper.contains("SELECT *") {
        warnings.push("query selects all columns".to_string());
    }
    warnings
}
