//! SQL safety helpers for the DataFusion backends.
//!
//! Table names are registered from caller-supplied resource names, and
//! constraint queries are caller-supplied SQL. Both pass through here before
//! they reach a `SessionContext`.

use crate::error::{JudgeError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// SQL identifier validation and quoting utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a SQL identifier used as a table name.
    ///
    /// # Examples
    /// ```rust
    /// use term_judge::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_identifier("orders").is_ok());
    /// assert!(SqlSecurity::validate_identifier("sales.orders_2024").is_ok());
    /// assert!(SqlSecurity::validate_identifier("orders; DROP TABLE x--").is_err());
    /// ```
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(JudgeError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > 128 {
            return Err(JudgeError::SecurityError(
                "SQL identifier too long (max 128 characters)".to_string(),
            ));
        }

        static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
            // Hard-coded pattern, known to compile
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(JudgeError::SecurityError(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, numbers, underscores, and dots"
            )));
        }

        Ok(())
    }

    /// Quotes an arbitrary column name for use in generated SQL.
    ///
    /// ```rust
    /// use term_judge::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::quote_identifier("unit price"), "\"unit price\"");
    /// assert_eq!(SqlSecurity::quote_identifier("a\"b"), "\"a\"\"b\"");
    /// ```
    pub fn quote_identifier(identifier: &str) -> String {
        let escaped = identifier.replace('"', "\"\"");
        format!("\"{escaped}\"")
    }

    /// Checks a caller-supplied constraint query before planning.
    ///
    /// Statement kinds are enforced separately by DataFusion's `SQLOptions`,
    /// and its parser rejects multiple statements. This only rejects inputs
    /// that are never valid queries.
    pub fn validate_query(query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Err(JudgeError::SecurityError(
                "SQL query cannot be empty".to_string(),
            ));
        }

        if query.len() > 5000 {
            return Err(JudgeError::SecurityError(
                "SQL query too long (max 5000 characters)".to_string(),
            ));
        }

        if query.contains('\0') {
            return Err(JudgeError::SecurityError(
                "SQL query cannot contain null bytes".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rules() {
        assert!(SqlSecurity::validate_identifier("_staging").is_ok());
        assert!(SqlSecurity::validate_identifier("user_updates").is_ok());
        assert!(SqlSecurity::validate_identifier("").is_err());
        assert!(SqlSecurity::validate_identifier("1orders").is_err());
        assert!(SqlSecurity::validate_identifier("my-table").is_err());
        assert!(SqlSecurity::validate_identifier(&"t".repeat(129)).is_err());
    }

    #[test]
    fn test_query_rules() {
        assert!(SqlSecurity::validate_query("SELECT * FROM orders").is_ok());
        assert!(SqlSecurity::validate_query("SELECT 1;").is_ok());
        assert!(SqlSecurity::validate_query("   ").is_err());
        assert!(SqlSecurity::validate_query("SELECT * FROM t WHERE note = 'a;b'").is_ok());
        assert!(SqlSecurity::validate_query("SELECT '\0'").is_err());
    }
}
