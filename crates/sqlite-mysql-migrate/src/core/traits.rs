//! Engine seams used by the migration engine.
//!
//! - [`SourceReader`]: reads catalog metadata and rows from the SQLite file
//! - [`TargetWriter`]: executes DDL and DML against the MySQL server
//!
//! The orchestrator only talks to these traits, so both sides can be
//! replaced by in-memory doubles in tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::dialect::InsertStatement;
use crate::error::Result;

use super::schema::{ColumnSpec, ForeignKeySpec, IndexSpec, TableSpec, ViewSpec};
use super::value::Batch;

/// Which source tables take part in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    /// Only these tables. Empty means all.
    pub include: Vec<String>,
    /// Skip these tables.
    pub exclude: Vec<String>,
    /// List views next to tables.
    pub include_views: bool,
}

impl TableFilter {
    /// Whether `name` passes the include/exclude lists.
    pub fn matches(&self, name: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|t| t == name) {
            return false;
        }
        !self.exclude.iter().any(|t| t == name)
    }
}

/// Options for reading rows from a table.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Table name.
    pub table: String,
    /// Columns to read, in insert order.
    pub columns: Vec<String>,
    /// Prepend the implicit rowid to every row.
    pub with_rowid: bool,
    /// Number of rows per batch.
    pub batch_size: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            table: String::new(),
            columns: Vec::new(),
            with_rowid: false,
            batch_size: 10_000,
        }
    }
}

/// Read catalog metadata and rows from the source database.
///
/// # Streaming
///
/// [`read_table`](SourceReader::read_table) returns a channel receiver fed by
/// a background task, so a large table never has to sit in memory at once
/// unless a single bulk batch was requested.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Engine version string.
    async fn version(&self) -> Result<String>;

    /// Table names in catalog order, internal tables excluded.
    async fn list_tables(&self, filter: &TableFilter) -> Result<Vec<String>>;

    /// Views with their definitions in catalog order. Only the
    /// include/exclude lists of the filter apply.
    async fn list_views(&self, filter: &TableFilter) -> Result<Vec<ViewSpec>>;

    /// Column descriptors in declaration order, hidden columns included.
    async fn load_columns(&self, table: &str) -> Result<Vec<ColumnSpec>>;

    /// Index descriptors.
    async fn load_indexes(&self, table: &str) -> Result<Vec<IndexSpec>>;

    /// Foreign key rows.
    async fn load_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeySpec>>;

    /// Load the full table descriptor (row count left at 0).
    async fn load_table(&self, table: &str) -> Result<TableSpec> {
        Ok(TableSpec {
            name: table.to_string(),
            columns: self.load_columns(table).await?,
            indexes: self.load_indexes(table).await?,
            foreign_keys: self.load_foreign_keys(table).await?,
            row_count: 0,
        })
    }

    /// Row count for a table.
    async fn get_row_count(&self, table: &str) -> Result<i64>;

    /// Whether the table exposes an implicit rowid.
    async fn has_rowid(&self, table: &str) -> Result<bool>;

    /// Start streaming rows from a table.
    ///
    /// The receiver yields `Result<Batch>` until the table is exhausted; the
    /// last batch has `is_last` set.
    fn read_table(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>>;

    /// Close the connection pool.
    async fn close(&self);
}

/// Execute DDL and DML against the target database.
///
/// Writers run with autocommit disabled; nothing is durable until
/// [`commit`](TargetWriter::commit).
#[async_trait]
pub trait TargetWriter: Send + Sync {
    /// Engine version string.
    async fn version(&self) -> Result<String>;

    /// Execute a statement without parameters.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Whether a table exists in the target database.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Toggle referential-integrity enforcement for this session.
    async fn set_foreign_key_checks(&self, enabled: bool) -> Result<()>;

    /// Insert a batch of rows, splitting it as needed to fit the placeholder
    /// limit. Returns the number of rows sent.
    async fn write_batch(&self, stmt: &InsertStatement, batch: Batch) -> Result<u64>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    /// Close the connection.
    async fn close(&self);
}
