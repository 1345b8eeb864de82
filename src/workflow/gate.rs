//! Keyword gate applied before any migration statement runs.
//!
//! A textual allow/deny check, not a parser. The allow-list admits only
//! additive DDL forms; the deny-list rejects data-mutating keywords
//! anywhere in the statement, and deny wins over allow. Conservative on
//! purpose: a safe statement may be rejected, an unsafe one must not pass.

use crate::core::{Error, Result};

const DENIED_KEYWORDS: [&str; 4] = ["DELETE", "UPDATE", "INSERT", "TRUNCATE"];

/// Check one migration statement against the gate.
pub fn check_statement(sql: &str) -> Result<()> {
    let normalized = normalize(sql);
    let words: Vec<&str> = normalized.split_whitespace().collect();

    if words.is_empty() {
        return Err(Error::PolicyViolation("empty statement".to_string()));
    }

    // Deny keywords reject regardless of any allow-list match.
    for (i, word) in words.iter().enumerate() {
        if DENIED_KEYWORDS.contains(word) {
            return Err(Error::PolicyViolation(format!(
                "statement contains prohibited keyword: {}",
                word
            )));
        }
        if *word == "DROP" && words.get(i + 1) != Some(&"COLUMN") {
            return Err(Error::PolicyViolation(
                "statement contains a DROP other than DROP COLUMN".to_string(),
            ));
        }
    }

    if !is_allowed_form(&words) {
        return Err(Error::PolicyViolation(
            "statement does not match the DDL allow-list".to_string(),
        ));
    }

    Ok(())
}

/// Uppercase and replace punctuation with spaces so keywords match as
/// whole words ("UPDATED_AT" is not "UPDATE").
fn normalize(sql: &str) -> String {
    sql.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                ' '
            }
        })
        .collect()
}

fn is_allowed_form(words: &[&str]) -> bool {
    match words {
        ["CREATE", "TABLE", ..] => true,
        ["CREATE", "INDEX", ..] | ["CREATE", "UNIQUE", "INDEX", ..] => true,
        ["CREATE", "VIEW", ..] | ["CREATE", "OR", "REPLACE", "VIEW", ..] => true,
        ["ALTER", "TABLE", rest @ ..] => {
            contains_pair(rest, "ADD", "COLUMN") || contains_pair(rest, "DROP", "COLUMN")
        }
        _ => false,
    }
}

fn contains_pair(words: &[&str], first: &str, second: &str) -> bool {
    words
        .windows(2)
        .any(|pair| pair[0] == first && pair[1] == second)
}
