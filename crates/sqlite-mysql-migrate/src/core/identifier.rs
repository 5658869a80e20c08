//! Identifier validation, truncation and quoting.
//!
//! SQL identifiers cannot be bound as parameters, so every table, column,
//! index and constraint name is validated and quoted here before it is
//! spliced into SQL text:
//! 1. Reject empty identifiers and identifiers containing null bytes
//! 2. Truncate to the MySQL identifier limit where a name is emitted
//! 3. Quote with the engine's quote character, doubling embedded quotes

use crate::error::{MigrateError, Result};

/// MySQL identifier length limit (characters).
pub const MYSQL_MAX_IDENTIFIER_LENGTH: usize = 64;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers and identifiers containing null bytes.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    Ok(())
}

/// Truncate an identifier to `max_length` characters.
///
/// Counts characters, not bytes, matching how MySQL measures identifier
/// length.
pub fn safe_identifier_with_length(name: &str, max_length: usize) -> String {
    name.chars().take(max_length).collect()
}

/// Truncate an identifier to the MySQL limit of 64 characters.
///
/// ```
/// use sqlite_mysql_migrate::core::identifier::safe_identifier;
///
/// assert_eq!(safe_identifier(&"a".repeat(70)), "a".repeat(64));
/// assert_eq!(safe_identifier("users"), "users");
/// ```
pub fn safe_identifier(name: &str) -> String {
    safe_identifier_with_length(name, MYSQL_MAX_IDENTIFIER_LENGTH)
}

/// Build `<prefix><suffix>` truncating only the prefix so the result fits
/// the identifier limit.
pub fn suffixed_identifier(prefix: &str, suffix: &str) -> String {
    let room = MYSQL_MAX_IDENTIFIER_LENGTH.saturating_sub(suffix.chars().count());
    format!("{}{}", safe_identifier_with_length(prefix, room), suffix)
}

/// Quote a MySQL identifier using backticks.
///
/// Escapes backticks by doubling them and wraps in backticks.
/// Validates the identifier before quoting.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(quote_mysql("users")?, "`users`");
/// assert_eq!(quote_mysql("table`name")?, "`table``name`");
/// ```
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quote a SQLite identifier using double quotes.
pub fn quote_sqlite(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_identifier() {
        assert_eq!(safe_identifier(&"a".repeat(70)), "a".repeat(64));
        assert_eq!(safe_identifier(&"a".repeat(65)), "a".repeat(64));
        assert_eq!(safe_identifier(&"a".repeat(64)), "a".repeat(64));
        assert_eq!(safe_identifier(&"a".repeat(10)), "a".repeat(10));
    }

    #[test]
    fn test_safe_identifier_counts_characters() {
        let name = "é".repeat(70);
        assert_eq!(safe_identifier(&name).chars().count(), 64);
    }

    #[test]
    fn test_safe_identifier_with_length() {
        assert_eq!(safe_identifier_with_length("abcdef", 3), "abc");
        assert_eq!(safe_identifier_with_length("ab", 60), "ab");
    }

    #[test]
    fn test_suffixed_identifier() {
        assert_eq!(suffixed_identifier("users", "_rowid"), "users_rowid");
        let long = suffixed_identifier(&"t".repeat(80), "_FK_0_0");
        assert_eq!(long.chars().count(), 64);
        assert!(long.ends_with("_FK_0_0"));
    }

    #[test]
    fn test_quote_mysql() {
        assert_eq!(quote_mysql("users").unwrap(), "`users`");
        assert_eq!(quote_mysql("table`name").unwrap(), "`table``name`");
        assert!(quote_mysql("").is_err());
        assert!(quote_mysql("bad\0name").is_err());
    }

    #[test]
    fn test_quote_sqlite() {
        assert_eq!(quote_sqlite("users").unwrap(), "\"users\"");
        assert_eq!(quote_sqlite("my\"table").unwrap(), "\"my\"\"table\"");
    }
}
