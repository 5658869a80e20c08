//! MySQL/MariaDB target writer implementation.
//!
//! Holds one session for the whole run. The session runs with autocommit
//! disabled, so DDL and DML become durable only at [`TargetWriter::commit`]
//! (DDL still commits implicitly on the server side).

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, SslOpts};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ER_BAD_DB_ERROR;
use crate::config::{TargetConfig, TransferConfig};
use crate::core::identifier::quote_mysql;
use crate::core::traits::TargetWriter;
use crate::core::value::{Batch, SqlValue};
use crate::dialect::InsertStatement;
use crate::error::{MigrateError, Result};

/// MySQL target writer using a single mysql_async connection.
pub struct MysqlWriter {
    conn: Mutex<Option<Conn>>,
    database: String,
    version: String,
}

impl MysqlWriter {
    /// Connect, creating the configured database when it does not exist.
    pub async fn connect(config: &TargetConfig, transfer: &TransferConfig) -> Result<Self> {
        let charset = transfer.charset.clone();
        let collation = transfer.get_collation();

        let mut conn = Conn::new(connect_opts(config, &charset, &collation))
            .await
            .map_err(|e| MigrateError::pool(e, "connecting to MySQL target"))?;

        let version: Option<String> = conn
            .query_first("SELECT VERSION()")
            .await
            .map_err(|e| MigrateError::pool(e, "testing MySQL target connection"))?;
        let version = version.unwrap_or_default();

        let database = quote_mysql(&config.database)?;
        match conn.query_drop(format!("USE {}", database)).await {
            Ok(()) => {}
            Err(mysql_async::Error::Server(e)) if e.code == ER_BAD_DB_ERROR => {
                info!(
                    "Database {} does not exist, creating it with {} / {}",
                    config.database, charset, collation
                );
                conn.query_drop(format!(
                    "CREATE DATABASE IF NOT EXISTS {} CHARACTER SET {} COLLATE {}",
                    database, charset, collation
                ))
                .await?;
                conn.query_drop(format!("USE {}", database)).await?;
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            "Connected to MySQL target: {}:{}/{} (server {})",
            config.host, config.port, config.database, version
        );

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            database: config.database.clone(),
            version,
        })
    }

    /// Connect without selecting a database and return the server version.
    pub async fn server_version(config: &TargetConfig) -> Result<String> {
        let mut conn = Conn::new(connect_opts(config, "utf8mb4", "utf8mb4_unicode_ci"))
            .await
            .map_err(|e| MigrateError::pool(e, "connecting to MySQL target"))?;
        let version: Option<String> = conn
            .query_first("SELECT VERSION()")
            .await
            .map_err(|e| MigrateError::pool(e, "testing MySQL target connection"))?;
        conn.disconnect().await.ok();
        Ok(version.unwrap_or_default())
    }
}

/// Session options: TLS per `ssl_mode`, the configured character set and
/// autocommit disabled. No database is selected here.
fn connect_opts(config: &TargetConfig, charset: &str, collation: &str) -> Opts {
    let mut builder = OptsBuilder::default()
        .ip_or_hostname(&config.host)
        .tcp_port(config.port)
        .user(Some(&config.user))
        .pass(Some(&config.password))
        .init(vec![
            format!("SET NAMES {} COLLATE {}", charset, collation),
            "SET autocommit = 0".to_string(),
        ]);

    if let Some(ssl) = ssl_opts_for(&config.ssl_mode) {
        builder = builder.ssl_opts(ssl);
    }

    builder.into()
}

fn closed() -> MigrateError {
    MigrateError::Target("connection already closed".to_string())
}

/// TLS options for an `ssl_mode` value. `None` disables TLS.
fn ssl_opts_for(mode: &str) -> Option<SslOpts> {
    match mode.to_lowercase().as_str() {
        "disable" => {
            warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
            None
        }
        "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
        "verify_ca" => Some(SslOpts::default().with_danger_skip_domain_validation(true)),
        "verify_identity" => Some(SslOpts::default()),
        _ => {
            warn!("Unknown ssl_mode '{}', defaulting to prefer", mode);
            Some(SslOpts::default().with_danger_accept_invalid_certs(true))
        }
    }
}

#[async_trait]
impl TargetWriter for MysqlWriter {
    async fn version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;
        debug!("MySQL: {}", sql);
        conn.query_drop(sql).await?;
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let sql = r#"
            SELECT COUNT(*) AS cnt FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        "#;

        let count: Option<i64> = conn
            .exec_first(sql, (self.database.as_str(), table))
            .await?;

        Ok(count.unwrap_or(0) > 0)
    }

    async fn set_foreign_key_checks(&self, enabled: bool) -> Result<()> {
        let value = if enabled { 1 } else { 0 };
        self.execute(&format!("SET FOREIGN_KEY_CHECKS = {}", value))
            .await
    }

    async fn write_batch(&self, stmt: &InsertStatement, batch: Batch) -> Result<u64> {
        let rows = batch.rows;
        let max_rows = stmt.max_rows_per_statement();
        if rows.is_empty() || max_rows == 0 {
            return Ok(0);
        }

        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let row_count = rows.len() as u64;
        for chunk in rows.chunks(max_rows) {
            let sql = stmt.render(chunk.len());
            let params: Vec<mysql_async::Value> = chunk
                .iter()
                .flat_map(|row| row.iter().map(sql_value_to_mysql))
                .collect();

            conn.exec_drop(sql, params).await?;
        }

        debug!("MySQL: wrote {} rows to {}", row_count, stmt.table());
        Ok(row_count)
    }

    async fn commit(&self) -> Result<()> {
        self.execute("COMMIT").await
    }

    async fn rollback(&self) -> Result<()> {
        self.execute("ROLLBACK").await
    }

    async fn close(&self) {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.disconnect().await.ok();
        }
    }
}

/// Convert SqlValue to mysql_async::Value.
fn sql_value_to_mysql(value: &SqlValue<'_>) -> mysql_async::Value {
    match value {
        SqlValue::Null => mysql_async::Value::NULL,
        SqlValue::Integer(i) => mysql_async::Value::from(*i),
        SqlValue::Real(f) => mysql_async::Value::from(*f),
        SqlValue::Text(s) => mysql_async::Value::from(s.as_ref()),
        SqlValue::Blob(b) => mysql_async::Value::from(b.as_ref()),
    }
}
