//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (SQLite file).
    pub source: SourceConfig,

    /// Target database configuration (MySQL/MariaDB).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: TransferConfig,
}

/// Source database (SQLite) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Target database (MySQL/MariaDB) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host (default: "localhost").
    #[serde(default = "default_localhost")]
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name. Created when missing.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// SSL mode: disable, prefer, require, verify_ca, verify_identity (default: "prefer").
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Process-wide transfer settings, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Tables to migrate. Empty means all tables.
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Tables to skip. Mutually exclusive with `include_tables`.
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// Do not create foreign keys (default: false).
    #[serde(default)]
    pub without_foreign_keys: bool,

    /// Conflict handling for inserted rows (default: IGNORE).
    #[serde(default)]
    pub insert_method: InsertMethod,

    /// Truncate existing target tables before loading (default: false).
    #[serde(default)]
    pub truncate_tables: bool,

    /// Target type for plain integer columns (default: "INT(11)").
    #[serde(default = "default_integer_type")]
    pub integer_type: String,

    /// Target type for variable-length string columns (default: "VARCHAR(255)").
    #[serde(default = "default_string_type")]
    pub string_type: String,

    /// Target type for text columns (default: "TEXT").
    #[serde(default = "default_text_type")]
    pub text_type: String,

    /// Target character set (default: "utf8mb4").
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Target collation. Derived from the charset when not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,

    /// Skip indexes whose name already exists instead of renaming them (default: false).
    #[serde(default)]
    pub ignore_duplicate_keys: bool,

    /// Create FULLTEXT indexes on text columns when supported (default: false).
    #[serde(default)]
    pub use_fulltext: bool,

    /// Transfer the implicit rowid as a leading column (default: false).
    #[serde(default)]
    pub with_rowid: bool,

    /// Rows per chunk. Unset or 0 transfers each table in a single batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,

    /// Commit granularity for data loads (default: table).
    #[serde(default)]
    pub commit_mode: CommitMode,

    /// Migrate source views as regular tables (default: false).
    #[serde(default)]
    pub views_as_tables: bool,

    /// Create tables, indexes and foreign keys (default: true).
    #[serde(default = "default_true")]
    pub create_tables: bool,

    /// Transfer row data (default: true).
    #[serde(default = "default_true")]
    pub transfer_data: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
            without_foreign_keys: false,
            insert_method: InsertMethod::default(),
            truncate_tables: false,
            integer_type: default_integer_type(),
            string_type: default_string_type(),
            text_type: default_text_type(),
            charset: default_charset(),
            collation: None,
            ignore_duplicate_keys: false,
            use_fulltext: false,
            with_rowid: false,
            chunk_size: None,
            commit_mode: CommitMode::default(),
            views_as_tables: false,
            create_tables: true,
            transfer_data: true,
        }
    }
}

impl TransferConfig {
    /// Effective collation: the configured one, or the default for the charset.
    pub fn get_collation(&self) -> String {
        match &self.collation {
            Some(collation) => collation.clone(),
            None if self.charset.eq_ignore_ascii_case("utf8mb4") => {
                "utf8mb4_unicode_ci".to_string()
            }
            None => format!("{}_general_ci", self.charset.to_lowercase()),
        }
    }

    /// Effective chunk size. `None` means a single bulk batch per table.
    pub fn get_chunk_size(&self) -> Option<usize> {
        self.chunk_size.filter(|&size| size > 0)
    }

    /// Foreign keys are skipped when explicitly requested or when only a
    /// subset of tables is transferred.
    pub fn skip_foreign_keys(&self) -> bool {
        self.without_foreign_keys
            || !self.include_tables.is_empty()
            || !self.exclude_tables.is_empty()
    }
}

/// Conflict handling for inserted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InsertMethod {
    /// Plain INSERT; duplicate keys fail the table.
    #[serde(alias = "default")]
    Default,

    /// INSERT IGNORE; duplicate keys are skipped.
    #[default]
    #[serde(alias = "ignore")]
    Ignore,

    /// INSERT ... ON DUPLICATE KEY UPDATE; existing rows are updated in place.
    #[serde(alias = "update")]
    Update,
}

impl std::str::FromStr for InsertMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEFAULT" => Ok(InsertMethod::Default),
            "IGNORE" => Ok(InsertMethod::Ignore),
            "UPDATE" => Ok(InsertMethod::Update),
            other => Err(format!(
                "unknown insert method '{}', expected DEFAULT, IGNORE or UPDATE",
                other
            )),
        }
    }
}

/// Commit granularity for data loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// One transaction per table; a failure rolls back the whole table load.
    #[default]
    Table,

    /// Commit after every chunk; a failure keeps the chunks already committed.
    Chunk,
}

impl std::str::FromStr for CommitMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(CommitMode::Table),
            "chunk" => Ok(CommitMode::Chunk),
            other => Err(format!(
                "unknown commit mode '{}', expected table or chunk",
                other
            )),
        }
    }
}

// Default value functions for serde
fn default_localhost() -> String {
    "localhost".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_prefer() -> String {
    "prefer".to_string()
}

fn default_integer_type() -> String {
    "INT(11)".to_string()
}

fn default_string_type() -> String {
    "VARCHAR(255)".to_string()
}

fn default_text_type() -> String {
    "TEXT".to_string()
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_true() -> bool {
    true
}
