//! Migration orchestrator - main workflow coordinator.
//!
//! A run enumerates the source tables, disables foreign key checks on the
//! target and then walks every table through its stages in catalog order:
//!
//! ```text
//! CREATE_SCHEMA -> [TRUNCATE] -> COUNT -> [LOAD_DATA] -> ADD_INDICES -> [ADD_FOREIGN_KEYS]
//! ```
//!
//! When tables are created and views are not copied as tables, the source
//! views are recreated as MySQL views once every table is done.
//!
//! Foreign key checks are switched back on whatever the outcome, then the
//! first error (if any) is returned.

pub mod progress;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, InsertMethod};
use crate::core::identifier::{quote_mysql, safe_identifier};
use crate::core::traits::{SourceReader, TableFilter, TargetWriter};
use crate::dialect::Capabilities;
use crate::drivers::{MysqlWriter, SqliteReader};
use crate::error::{MigrateError, Result};
use crate::schema::{DdlContext, SchemaBuilder};
use crate::transfer::{DataMover, TransferPlan};

pub use progress::{JsonLinesProgress, NoopProgress, ProgressEvent, ProgressSink, TracingProgress};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn SourceReader>,
    target: Arc<dyn TargetWriter>,
    progress: Arc<dyn ProgressSink>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Source engine version.
    pub source_version: String,

    /// Target server version.
    pub target_version: String,

    /// Total tables selected.
    pub tables_total: usize,

    /// Tables that went through every stage.
    pub tables_success: usize,

    /// Views created on the target.
    pub views_created: usize,

    /// Total rows transferred.
    pub rows_transferred: u64,

    /// Average throughput (rows/second).
    pub rows_per_second: u64,

    /// Per-table statistics, in processing order.
    pub tables: Vec<TableStats>,
}

/// Statistics for one migrated table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    pub name: String,
    pub rows: u64,
    pub chunks: usize,
    pub indexes: usize,
    pub foreign_keys: usize,
    /// Whether the implicit rowid was carried over.
    pub rowid: bool,
    pub duration_ms: u64,
}

/// Connectivity report for both engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_version: Option<String>,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_version: Option<String>,
    pub target_error: Option<String>,
    pub healthy: bool,
}

impl Orchestrator {
    /// Open the SQLite file and connect to the MySQL server.
    pub async fn connect(config: Config) -> Result<Self> {
        config.validate()?;

        let source = SqliteReader::new(&config.source).await?;
        let target = match MysqlWriter::connect(&config.target, &config.migration).await {
            Ok(target) => target,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };

        Ok(Self::new(config, Arc::new(source), Arc::new(target)))
    }

    /// Create an orchestrator over already opened engines.
    pub fn new(
        config: Config,
        source: Arc<dyn SourceReader>,
        target: Arc<dyn TargetWriter>,
    ) -> Self {
        Self {
            config,
            source,
            target,
            progress: Arc::new(TracingProgress),
        }
    }

    /// Replace the progress sink.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the migration.
    pub async fn run(&self, cancel: CancellationToken) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let migration = &self.config.migration;

        info!("Starting migration run: {}", run_id);

        let source_version = self.source.version().await?;
        let target_version = self.target.version().await?;
        let capabilities = Capabilities::from_version(&target_version);
        info!(
            "Source SQLite {}, target {} {} (json: {}, fulltext: {}, upsert alias: {})",
            source_version,
            if capabilities.mariadb { "MariaDB" } else { "MySQL" },
            target_version,
            capabilities.json,
            capabilities.fulltext,
            capabilities.upsert_alias
        );
        if migration.insert_method == InsertMethod::Update && !capabilities.upsert_alias {
            warn!("Target does not support row aliases in upserts, using VALUES() instead");
        }
        if migration.use_fulltext && !capabilities.fulltext {
            warn!("Target does not support FULLTEXT indexes on InnoDB, creating plain indexes");
        }

        let filter = TableFilter {
            include: migration.include_tables.clone(),
            exclude: migration.exclude_tables.clone(),
            include_views: migration.views_as_tables,
        };
        let tables = self.source.list_tables(&filter).await?;
        info!("Found {} tables to migrate", tables.len());
        if migration.skip_foreign_keys() && migration.create_tables {
            info!("Foreign keys will not be created");
        }

        self.progress.emit(&ProgressEvent::RunStarted {
            run_id: run_id.clone(),
            tables: tables.len(),
        });

        let ctx = DdlContext::new(migration, capabilities.clone());
        let mut stats = Vec::with_capacity(tables.len());

        let mut views_created = 0;

        self.target.set_foreign_key_checks(false).await?;
        let mut outcome = self
            .migrate_tables(&tables, &ctx, &capabilities, &cancel, &mut stats)
            .await;
        if outcome.is_ok() && migration.create_tables && !migration.views_as_tables {
            outcome = self
                .migrate_views(&filter, &ctx, &cancel)
                .await
                .map(|created| views_created = created);
        }
        let restored = self.target.set_foreign_key_checks(true).await;
        if let Err(e) = &restored {
            error!("Failed re-enabling foreign key checks: {}", e);
        }

        let status = match &outcome {
            Ok(()) => "completed",
            Err(MigrateError::Cancelled) => "cancelled",
            Err(_) => "failed",
        };
        let rows_transferred: u64 = stats.iter().map(|t| t.rows).sum();
        self.progress.emit(&ProgressEvent::RunFinished {
            status: status.to_string(),
            tables: stats.len(),
            rows: rows_transferred,
        });

        outcome?;
        restored?;

        let duration = timer.elapsed().as_secs_f64();
        let result = MigrationResult {
            run_id,
            status: status.to_string(),
            duration_seconds: duration,
            started_at,
            completed_at: Utc::now(),
            source_version,
            target_version,
            tables_total: tables.len(),
            tables_success: stats.len(),
            views_created,
            rows_transferred,
            rows_per_second: rows_per_second(rows_transferred, duration),
            tables: stats,
        };

        info!(
            "Migration completed: {} tables, {} rows in {:.2}s",
            result.tables_success, result.rows_transferred, result.duration_seconds
        );
        Ok(result)
    }

    async fn migrate_tables(
        &self,
        tables: &[String],
        ctx: &DdlContext,
        capabilities: &Capabilities,
        cancel: &CancellationToken,
        stats: &mut Vec<TableStats>,
    ) -> Result<()> {
        for (position, name) in tables.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }
            self.progress.emit(&ProgressEvent::TableStarted {
                table: name.clone(),
                position: position + 1,
                tables: tables.len(),
            });

            let table_stats = self.migrate_table(name, ctx, capabilities, cancel).await?;

            self.progress.emit(&ProgressEvent::TableCompleted {
                table: table_stats.name.clone(),
                rows: table_stats.rows,
                indexes: table_stats.indexes,
                foreign_keys: table_stats.foreign_keys,
                duration_ms: table_stats.duration_ms,
            });
            stats.push(table_stats);
        }
        Ok(())
    }

    async fn migrate_views(
        &self,
        filter: &TableFilter,
        ctx: &DdlContext,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let views = self.source.list_views(filter).await?;
        if views.is_empty() {
            return Ok(0);
        }
        info!("Found {} views to migrate", views.len());

        let schema = SchemaBuilder::new(
            self.source.as_ref(),
            self.target.as_ref(),
            ctx,
            &self.config.migration,
        );
        let mut created = 0;
        for view in &views {
            if cancel.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }
            if schema.create_view(view).await? {
                created += 1;
            }
        }
        Ok(created)
    }

    async fn migrate_table(
        &self,
        name: &str,
        ctx: &DdlContext,
        capabilities: &Capabilities,
        cancel: &CancellationToken,
    ) -> Result<TableStats> {
        let migration = &self.config.migration;
        let started = Instant::now();
        let source = self.source.as_ref();
        let target = self.target.as_ref();
        let schema = SchemaBuilder::new(source, target, ctx, migration);

        let mut table = source.load_table(name).await?;
        let with_rowid = migration.with_rowid && source.has_rowid(name).await?;
        if migration.with_rowid && !with_rowid {
            info!("Table {} has no rowid, transferring without it", name);
        }

        let mut stats = TableStats {
            name: name.to_string(),
            rowid: with_rowid,
            ..Default::default()
        };

        if migration.create_tables {
            schema.create_table(&table, with_rowid).await?;
        }
        if migration.truncate_tables {
            self.truncate(name).await?;
        }

        if migration.transfer_data {
            table.row_count = source.get_row_count(name).await?;
            if table.row_count > 0 {
                if cancel.is_cancelled() {
                    return Err(MigrateError::Cancelled);
                }
                let plan =
                    TransferPlan::new(&table, with_rowid, migration, capabilities.upsert_alias)?;
                let mover =
                    DataMover::new(source, target, migration, self.progress.as_ref(), cancel);
                let transferred = mover.transfer_table_data(&plan).await?;
                stats.rows = transferred.rows;
                stats.chunks = transferred.chunks;
            } else {
                info!("Table {} is empty, skipping data transfer", name);
            }
        }

        if migration.create_tables {
            if cancel.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }
            stats.indexes = schema.add_indices(&table).await?;
            if !migration.skip_foreign_keys() {
                stats.foreign_keys = schema.add_foreign_keys(&table).await?;
            }
        }

        stats.duration_ms = started.elapsed().as_millis() as u64;
        Ok(stats)
    }

    async fn truncate(&self, table: &str) -> Result<()> {
        let target_name = safe_identifier(table);
        if !self.target.table_exists(&target_name).await? {
            debug!("Table {} does not exist on the target, nothing to truncate", target_name);
            return Ok(());
        }

        info!("Truncating table {}", target_name);
        let sql = format!("TRUNCATE TABLE {}", quote_mysql(&target_name)?);
        if let Err(e) = self.target.execute(&sql).await {
            error!("MySQL failed truncating table {}: {}", target_name, e);
            return Err(e);
        }
        self.target.commit().await
    }

    /// Test connectivity to both engines without touching either database.
    pub async fn health_check(config: &Config) -> Result<HealthCheckResult> {
        let start = Instant::now();
        let (source_version, source_error) = match SqliteReader::new(&config.source).await {
            Ok(reader) => {
                let version = reader.version().await;
                reader.close().await;
                split(version)
            }
            Err(e) => (None, Some(e.to_string())),
        };
        let source_latency_ms = start.elapsed().as_millis() as u64;

        let start = Instant::now();
        let (target_version, target_error) =
            split(MysqlWriter::server_version(&config.target).await);
        let target_latency_ms = start.elapsed().as_millis() as u64;

        let source_connected = source_error.is_none();
        let target_connected = target_error.is_none();

        Ok(HealthCheckResult {
            source_connected,
            source_latency_ms,
            source_version,
            source_error,
            target_connected,
            target_latency_ms,
            target_version,
            target_error,
            healthy: source_connected && target_connected,
        })
    }

    /// Release both connections.
    pub async fn close(&self) {
        self.source.close().await;
        self.target.close().await;
    }
}

fn split(result: Result<String>) -> (Option<String>, Option<String>) {
    match result {
        Ok(version) => (Some(version), None),
        Err(e) => (None, Some(e.to_string())),
    }
}

fn rows_per_second(rows: u64, seconds: f64) -> u64 {
    if seconds > 0.0 {
        (rows as f64 / seconds) as u64
    } else {
        0
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
