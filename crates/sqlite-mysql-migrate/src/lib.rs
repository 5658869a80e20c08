//! # sqlite-mysql-migrate
//!
//! SQLite to MySQL/MariaDB schema translation and data transfer library.
//!
//! This library reads the catalog of a single SQLite file, recreates its
//! tables on a MySQL or MariaDB server and copies the rows across, with
//! support for:
//!
//! - **Type translation** from SQLite declared types to MySQL column types
//! - **Capability probing** of the target server version (JSON, FULLTEXT, upsert aliases)
//! - **Chunked transfers** with per-table or per-chunk commits
//! - **Insert methods** `DEFAULT`, `IGNORE` and `UPDATE` for re-runs
//! - **Index recovery** for duplicate index names and unusable FULLTEXT columns
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlite_mysql_migrate::{Config, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::connect(config).await?;
//!     let result = orchestrator.run(CancellationToken::new()).await?;
//!     orchestrator.close().await;
//!     println!("Migrated {} rows", result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod schema;
pub mod transfer;

// Re-exports for convenient access
pub use config::{CommitMode, Config, InsertMethod, SourceConfig, TargetConfig, TransferConfig};
pub use self::core::{
    ColumnSpec, ForeignKeySpec, IndexSpec, SourceReader, SqlValue, TableSpec, TargetWriter,
    ViewSpec,
};
pub use drivers::{MysqlWriter, SqliteReader};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    HealthCheckResult, JsonLinesProgress, MigrationResult, NoopProgress, Orchestrator,
    ProgressEvent, ProgressSink, TableStats, TracingProgress,
};
pub use transfer::{DataMover, TransferPlan, TransferStats};
