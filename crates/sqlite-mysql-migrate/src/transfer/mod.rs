//! Row transfer for a single table.
//!
//! The source reader streams batches of `chunk_size` rows (one batch for the
//! whole table when no chunk size is set). Each batch becomes one multi-row
//! INSERT, split further only to respect the placeholder limit.
//!
//! Commit granularity follows [`CommitMode`]: per table (a failure rolls the
//! whole table back) or per chunk (committed chunks survive a failure).

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{CommitMode, TransferConfig};
use crate::core::identifier::safe_identifier;
use crate::core::schema::TableSpec;
use crate::core::traits::{ReadOptions, SourceReader, TargetWriter};
use crate::dialect::InsertStatement;
use crate::error::{MigrateError, Result};
use crate::orchestrator::progress::{ProgressEvent, ProgressSink};
use crate::schema::ddl::ROWID_COLUMN;

/// What to move for one table.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    /// Source table name.
    pub table: String,
    /// Source columns, in insert order (rowid excluded).
    pub source_columns: Vec<String>,
    /// Read the implicit rowid as the first value of every row.
    pub with_rowid: bool,
    /// Source row count.
    pub total_rows: i64,
    /// Target INSERT.
    pub statement: InsertStatement,
}

impl TransferPlan {
    /// Plan the transfer of the visible columns of `table`.
    pub fn new(
        table: &TableSpec,
        with_rowid: bool,
        config: &TransferConfig,
        upsert_alias: bool,
    ) -> Result<Self> {
        let source_columns: Vec<String> =
            table.visible_columns().map(|c| c.name.clone()).collect();

        let mut target_columns = Vec::with_capacity(source_columns.len() + 1);
        if with_rowid {
            target_columns.push(ROWID_COLUMN.to_string());
        }
        target_columns.extend(source_columns.iter().map(|c| safe_identifier(c)));

        let statement = InsertStatement::new(
            &safe_identifier(&table.name),
            &target_columns,
            config.insert_method,
            upsert_alias,
        )?;

        Ok(Self {
            table: table.name.clone(),
            source_columns,
            with_rowid,
            total_rows: table.row_count,
            statement,
        })
    }
}

/// Statistics from one table transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// Rows sent to the target.
    pub rows: u64,
    /// Batches written.
    pub chunks: usize,
    /// Time spent waiting on the source.
    pub read_time: Duration,
    /// Time spent in INSERT statements.
    pub write_time: Duration,
}

/// Streams rows from the source into the target.
pub struct DataMover<'a> {
    source: &'a dyn SourceReader,
    target: &'a dyn TargetWriter,
    config: &'a TransferConfig,
    progress: &'a dyn ProgressSink,
    cancel: &'a CancellationToken,
}

impl<'a> DataMover<'a> {
    pub fn new(
        source: &'a dyn SourceReader,
        target: &'a dyn TargetWriter,
        config: &'a TransferConfig,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            source,
            target,
            config,
            progress,
            cancel,
        }
    }

    /// Transfer every row of the planned table.
    ///
    /// On failure or cancellation the open transaction is rolled back before
    /// the error is returned.
    pub async fn transfer_table_data(&self, plan: &TransferPlan) -> Result<TransferStats> {
        let chunk_size = self.config.get_chunk_size();
        match chunk_size {
            Some(size) => info!(
                "Transferring {} rows of {} in chunks of {}",
                plan.total_rows, plan.table, size
            ),
            None => info!("Transferring {} rows of {}", plan.total_rows, plan.table),
        }

        match self.load(plan, chunk_size.unwrap_or(usize::MAX)).await {
            Ok(stats) => {
                if self.config.commit_mode == CommitMode::Table {
                    self.target.commit().await?;
                }
                debug!(
                    "{}: read {:?}, write {:?}",
                    plan.table, stats.read_time, stats.write_time
                );
                Ok(stats)
            }
            Err(e) => {
                if !matches!(e, MigrateError::Cancelled) {
                    error!("MySQL transfer failed inserting data into table {}: {}", plan.table, e);
                }
                if let Err(rollback) = self.target.rollback().await {
                    warn!("Rollback after failure on {} failed: {}", plan.table, rollback);
                }
                Err(e)
            }
        }
    }

    async fn load(&self, plan: &TransferPlan, batch_size: usize) -> Result<TransferStats> {
        let mut rx = self.source.read_table(ReadOptions {
            table: plan.table.clone(),
            columns: plan.source_columns.clone(),
            with_rowid: plan.with_rowid,
            batch_size,
        });

        let mut stats = TransferStats::default();

        loop {
            let read_start = Instant::now();
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(MigrateError::Cancelled),
                batch = rx.recv() => batch,
            };
            stats.read_time += read_start.elapsed();

            let Some(batch) = next else {
                break;
            };
            let batch = batch?;
            let is_last = batch.is_last;

            if !batch.is_empty() {
                let write_start = Instant::now();
                stats.rows += self.target.write_batch(&plan.statement, batch).await?;
                stats.write_time += write_start.elapsed();
                stats.chunks += 1;

                if self.config.commit_mode == CommitMode::Chunk {
                    self.target.commit().await?;
                }

                self.progress.emit(&ProgressEvent::ChunkWritten {
                    table: plan.table.clone(),
                    chunk: stats.chunks,
                    rows_written: stats.rows,
                    rows_total: plan.total_rows,
                });
            }

            if is_last {
                break;
            }
        }

        Ok(stats)
    }
}
