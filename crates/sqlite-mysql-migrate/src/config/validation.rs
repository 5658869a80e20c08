//! Configuration validation.

use super::Config;
use crate::dialect::typemap::{is_text_type, DeclaredType};
use crate::error::{MigrateError, Result};

const SSL_MODES: &[&str] = &["disable", "prefer", "require", "verify_ca", "verify_identity"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.path.as_os_str().is_empty() {
        return Err(MigrateError::Config("source.path is required".into()));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }
    if !SSL_MODES.contains(&config.target.ssl_mode.to_lowercase().as_str()) {
        return Err(MigrateError::Config(format!(
            "target.ssl_mode must be one of {}, got '{}'",
            SSL_MODES.join(", "),
            config.target.ssl_mode
        )));
    }

    let m = &config.migration;

    if !m.include_tables.is_empty() && !m.exclude_tables.is_empty() {
        return Err(MigrateError::Config(
            "migration.include_tables and migration.exclude_tables are mutually exclusive".into(),
        ));
    }

    if !m.create_tables && !m.transfer_data {
        return Err(MigrateError::Config(
            "migration.create_tables and migration.transfer_data cannot both be disabled".into(),
        ));
    }

    if !is_text_type(&m.text_type) {
        return Err(MigrateError::Config(format!(
            "migration.text_type must be one of LONGTEXT, MEDIUMTEXT, TEXT, TINYTEXT, got '{}'",
            m.text_type
        )));
    }

    for (field, value) in [
        ("migration.integer_type", &m.integer_type),
        ("migration.string_type", &m.string_type),
    ] {
        if DeclaredType::parse(value).is_err() {
            return Err(MigrateError::Config(format!(
                "{} '{}' is not a valid column type",
                field, value
            )));
        }
    }

    if m.charset.trim().is_empty() {
        return Err(MigrateError::Config("migration.charset is required".into()));
    }

    let collation = m.get_collation();
    let prefix = format!("{}_", m.charset.to_lowercase());
    if !collation.to_lowercase().starts_with(&prefix) {
        return Err(MigrateError::Config(format!(
            "migration.collation '{}' is not valid for charset '{}'",
            collation, m.charset
        )));
    }

    Ok(())
}
