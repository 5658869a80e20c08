//! SQLite source reader implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::core::identifier::quote_sqlite;
use crate::core::schema::{
    ColumnSpec, ColumnVisibility, ForeignKeySpec, IndexOrigin, IndexSpec, ViewSpec,
};
use crate::core::traits::{ReadOptions, SourceReader, TableFilter};
use crate::core::value::{Batch, SqlValue};
use crate::dialect::version::{parse_version, Version};
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// First release with `PRAGMA table_xinfo`.
const TABLE_XINFO_MIN_VERSION: Version = Version::new(3, 26, 0);

/// Upper bound on rows preallocated per batch.
const MAX_PREALLOCATED_ROWS: usize = 10_000;

/// SQLite source reader.
///
/// Holds a single read-only connection; catalog queries and the row stream
/// take turns on it.
pub struct SqliteReader {
    pool: SqlitePool,
    version: String,
    extended_columns: bool,
}

impl SqliteReader {
    /// Open the database file named in the configuration.
    pub async fn new(config: &SourceConfig) -> Result<Self> {
        Self::open(&config.path).await
    }

    /// Open a database file read-only.
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(MigrateError::Config(format!(
                "source.path '{}' does not exist",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::pool(e, "opening SQLite source"))?;

        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&pool)
            .await
            .map_err(|e| MigrateError::pool(e, "testing SQLite source connection"))?;

        let extended_columns = parse_version(&version)
            .map(|v| v >= TABLE_XINFO_MIN_VERSION)
            .unwrap_or(false);

        info!("Opened SQLite source: {} (SQLite {})", path.display(), version);

        Ok(Self {
            pool,
            version,
            extended_columns,
        })
    }

    /// Decode one column by its storage class.
    ///
    /// Text that is not valid UTF-8 is passed on as a blob.
    fn decode_value(row: &SqliteRow, idx: usize) -> Result<SqlValue<'static>> {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        let storage = raw.type_info().name().to_string();

        let value = match storage.as_str() {
            "INTEGER" => SqlValue::Integer(row.try_get_unchecked::<i64, _>(idx)?),
            "REAL" => SqlValue::Real(row.try_get_unchecked::<f64, _>(idx)?),
            "BLOB" => SqlValue::bytes_owned(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
            _ => match row.try_get_unchecked::<String, _>(idx) {
                Ok(s) => SqlValue::text_owned(s),
                Err(_) => SqlValue::bytes_owned(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
            },
        };
        Ok(value)
    }

    fn row_to_values(row: &SqliteRow) -> Result<Vec<SqlValue<'static>>> {
        (0..row.len()).map(|i| Self::decode_value(row, i)).collect()
    }

    /// Build the SELECT for a table stream.
    fn select_sql(opts: &ReadOptions) -> Result<String> {
        let mut columns = Vec::with_capacity(opts.columns.len() + 1);
        if opts.with_rowid {
            columns.push("rowid AS \"rowid\"".to_string());
        }
        for column in &opts.columns {
            columns.push(quote_sqlite(column)?);
        }
        Ok(format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_sqlite(&opts.table)?
        ))
    }

    async fn read_table_impl(
        pool: SqlitePool,
        opts: ReadOptions,
        tx: mpsc::Sender<Result<Batch>>,
    ) -> Result<()> {
        let sql = Self::select_sql(&opts)?;
        let batch_size = opts.batch_size.max(1);
        let capacity = batch_size.min(MAX_PREALLOCATED_ROWS);
        debug!("{}: streaming with batch size {}", opts.table, batch_size);

        let mut stream = sqlx::query(&sql).fetch(&pool);
        let mut rows = Vec::with_capacity(capacity);

        while let Some(row) = stream.try_next().await? {
            rows.push(Self::row_to_values(&row)?);
            if rows.len() >= batch_size {
                let batch = Batch::new(std::mem::replace(&mut rows, Vec::with_capacity(capacity)));
                if tx.send(Ok(batch)).await.is_err() {
                    return Ok(()); // Receiver dropped
                }
            }
        }

        let _ = tx.send(Ok(Batch::new(rows).mark_final())).await;
        Ok(())
    }
}

#[async_trait]
impl SourceReader for SqliteReader {
    async fn version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    async fn list_tables(&self, filter: &TableFilter) -> Result<Vec<String>> {
        let query = if filter.include_views {
            "SELECT name FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'"
        } else {
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
        };

        let names: Vec<String> = sqlx::query_scalar(query).fetch_all(&self.pool).await?;
        let tables: Vec<String> = names.into_iter().filter(|n| filter.matches(n)).collect();

        for missing in filter.include.iter().filter(|t| !tables.contains(t)) {
            debug!("Requested table {} not found in source", missing);
        }

        Ok(tables)
    }

    async fn list_views(&self, filter: &TableFilter) -> Result<Vec<ViewSpec>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT name, sql FROM sqlite_master WHERE type = 'view' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|(name, _)| filter.matches(name))
            .map(|(name, sql)| ViewSpec { name, sql })
            .collect())
    }

    async fn load_columns(&self, table: &str) -> Result<Vec<ColumnSpec>> {
        let pragma = if self.extended_columns {
            "table_xinfo"
        } else {
            "table_info"
        };
        let query = format!("PRAGMA {}({})", pragma, quote_sqlite(table)?);

        let rows: Vec<SqliteRow> = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let hidden: i64 = if self.extended_columns {
                row.try_get("hidden")?
            } else {
                0
            };
            let pk: i64 = row.try_get("pk")?;
            columns.push(ColumnSpec {
                name: row.try_get("name")?,
                declared_type: row.try_get::<Option<String>, _>("type")?.unwrap_or_default(),
                nullable: row.try_get::<i64, _>("notnull")? == 0,
                pk_ordinal: u32::try_from(pk).unwrap_or(0),
                default_value: row.try_get("dflt_value")?,
                visibility: ColumnVisibility::from_code(hidden),
            });
        }

        Ok(columns)
    }

    async fn load_indexes(&self, table: &str) -> Result<Vec<IndexSpec>> {
        let query = format!("PRAGMA index_list({})", quote_sqlite(table)?);
        let rows: Vec<SqliteRow> = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut indexes = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let origin: String = row.try_get("origin")?;

            let info = format!("PRAGMA index_info({})", quote_sqlite(&name)?);
            let columns: Vec<Option<String>> = sqlx::query(&info)
                .fetch_all(&self.pool)
                .await?
                .iter()
                .map(|r| r.try_get::<Option<String>, _>("name"))
                .collect::<std::result::Result<_, _>>()?;

            indexes.push(IndexSpec {
                name,
                is_unique: row.try_get::<i64, _>("unique")? != 0,
                columns,
                origin: IndexOrigin::from_code(&origin),
            });
        }

        Ok(indexes)
    }

    async fn load_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeySpec>> {
        let query = format!("PRAGMA foreign_key_list({})", quote_sqlite(table)?);
        let rows: Vec<SqliteRow> = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(ForeignKeySpec {
                    id: row.try_get("id")?,
                    seq: row.try_get("seq")?,
                    from_column: row.try_get("from")?,
                    to_table: row.try_get("table")?,
                    to_column: row.try_get("to")?,
                    on_delete: row.try_get("on_delete")?,
                    on_update: row.try_get("on_update")?,
                })
            })
            .collect()
    }

    async fn get_row_count(&self, table: &str) -> Result<i64> {
        let query = format!("SELECT COUNT(*) FROM {}", quote_sqlite(table)?);
        let count: i64 = sqlx::query_scalar(&query).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn has_rowid(&self, table: &str) -> Result<bool> {
        let query = format!("SELECT rowid FROM {} LIMIT 1", quote_sqlite(table)?);
        match sqlx::query(&query).fetch_optional(&self.pool).await {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.message().contains("no such column") => {
                debug!("{} has no rowid", table);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_table(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>> {
        let (tx, rx) = mpsc::channel(4);
        let pool = self.pool.clone();

        tokio::spawn(async move {
            let result = Self::read_table_impl(pool, opts, tx.clone()).await;
            if let Err(e) = result {
                let _ = tx.send(Err(e)).await;
            }
        });

        rx
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
