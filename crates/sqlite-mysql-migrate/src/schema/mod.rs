//! Target schema creation: tables, indexes, foreign keys and views.
//!
//! [`ddl`] renders statements and [`view`] rewrites view definitions;
//! [`SchemaBuilder`] executes them and recovers
//! from a rejected column default (the table is created again without
//! defaults) and from the two index failures (duplicate key name, column
//! unusable in a FULLTEXT index). Every other engine error is logged with
//! table context and propagated.

pub mod ddl;
pub mod view;

use tracing::{debug, error, info, warn};

use crate::config::TransferConfig;
use crate::core::identifier::{quote_mysql, safe_identifier, safe_identifier_with_length};
use crate::core::schema::{IndexOrigin, IndexSpec, TableSpec, ViewSpec};
use crate::core::traits::{SourceReader, TargetWriter};
use crate::drivers::mysql::{
    ER_BAD_FT_COLUMN, ER_BAD_TABLE_ERROR, ER_DUP_KEYNAME, ER_INVALID_DEFAULT, ER_UNKNOWN_TABLE,
    ER_WRONG_OBJECT,
};
use crate::error::{MigrateError, Result};

pub use ddl::{DdlContext, IndexKind};

/// Identifier room left for the base of a renamed index.
const RENAMED_INDEX_BASE_LENGTH: usize = 60;

/// Attempts at finding a free index name before giving up.
const MAX_INDEX_NAME_ATTEMPTS: usize = 1000;

/// Outcome of adding one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Created under this name.
    Created(String),
    /// Skipped because the name exists and duplicates are ignored.
    SkippedDuplicate,
    /// Skipped because it covers an expression or a column that is not migrated.
    SkippedUnsupported,
}

/// Executes DDL for one table at a time.
pub struct SchemaBuilder<'a> {
    source: &'a dyn SourceReader,
    target: &'a dyn TargetWriter,
    ctx: &'a DdlContext,
    config: &'a TransferConfig,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(
        source: &'a dyn SourceReader,
        target: &'a dyn TargetWriter,
        ctx: &'a DdlContext,
        config: &'a TransferConfig,
    ) -> Self {
        Self {
            source,
            target,
            ctx,
            config,
        }
    }

    /// Create the table and commit.
    ///
    /// When the server rejects a DEFAULT value the table is created once more
    /// with every DEFAULT left out.
    pub async fn create_table(&self, table: &TableSpec, with_rowid: bool) -> Result<()> {
        let sql = ddl::create_table_sql(table, with_rowid, self.ctx).inspect_err(|e| {
            error!("Failed translating table {}: {}", table.name, e);
        })?;

        debug!("{}", sql);
        match self.target.execute(&sql).await {
            Ok(()) => {}
            Err(e) if e.server_code() == Some(ER_INVALID_DEFAULT) => {
                warn!(
                    "MySQL failed creating table {} with DEFAULT values: {}. Retrying without DEFAULT values",
                    table.name, e
                );
                let sql = ddl::create_table_sql_without_defaults(table, with_rowid, self.ctx)?;
                debug!("{}", sql);
                if let Err(e) = self.target.execute(&sql).await {
                    error!("MySQL failed creating table {}: {}", table.name, e);
                    return Err(e);
                }
            }
            Err(e) => {
                error!("MySQL failed creating table {}: {}", table.name, e);
                return Err(e);
            }
        }
        self.target.commit().await
    }

    /// Add every non primary key index of the table. Returns how many were
    /// created.
    pub async fn add_indices(&self, table: &TableSpec) -> Result<usize> {
        let mut created = 0;

        for index in table
            .indexes
            .iter()
            .filter(|i| i.origin != IndexOrigin::PrimaryKey)
        {
            let kind = ddl::index_kind(table, index, self.ctx)?;

            let outcome = match self.add_index(table, index, kind).await {
                Err(e)
                    if kind == IndexKind::Fulltext
                        && e.server_code() == Some(ER_BAD_FT_COLUMN) =>
                {
                    warn!(
                        "Failed adding FULLTEXT index {} to table {}, retrying without FULLTEXT: {}",
                        index.name, table.name, e
                    );
                    self.add_index(table, index, IndexKind::plain(index.is_unique))
                        .await
                }
                other => other,
            };

            match outcome {
                Ok(IndexOutcome::Created(_)) => created += 1,
                Ok(_) => {}
                Err(e) => {
                    error!(
                        "MySQL failed adding index {} to table {}: {}",
                        index.name, table.name, e
                    );
                    return Err(e);
                }
            }
        }

        self.target.commit().await?;
        Ok(created)
    }

    /// Add one index, renaming it on duplicate names unless duplicates are
    /// ignored.
    pub async fn add_index(
        &self,
        table: &TableSpec,
        index: &IndexSpec,
        kind: IndexKind,
    ) -> Result<IndexOutcome> {
        let Some(columns) = ddl::index_columns(table, index, kind, self.ctx)? else {
            warn!(
                "Skipping index {} on table {}: it covers an expression or a column that is not migrated",
                index.name, table.name
            );
            return Ok(IndexOutcome::SkippedUnsupported);
        };

        let rename_base = safe_identifier_with_length(&index.name, RENAMED_INDEX_BASE_LENGTH);
        let mut name = index.name.clone();

        for attempt in 1..=MAX_INDEX_NAME_ATTEMPTS {
            let sql = ddl::add_index_sql(&table.name, &name, kind, &columns)?;
            debug!("{}", sql);

            match self.target.execute(&sql).await {
                Ok(()) => {
                    info!("Added {} index {} to table {}", kind.keyword(), name, table.name);
                    return Ok(IndexOutcome::Created(name));
                }
                Err(e) if e.server_code() == Some(ER_DUP_KEYNAME) => {
                    if self.config.ignore_duplicate_keys {
                        warn!(
                            "Ignoring duplicate key {} in table {}",
                            name, table.name
                        );
                        return Ok(IndexOutcome::SkippedDuplicate);
                    }
                    let renamed = format!("{}_{}", rename_base, attempt);
                    warn!(
                        "Duplicate key {} in table {} detected, trying {}",
                        name, table.name, renamed
                    );
                    name = renamed;
                }
                Err(e) => return Err(e),
            }
        }

        Err(MigrateError::schema(
            &table.name,
            format!(
                "no free name for index {} after {} attempts",
                index.name, MAX_INDEX_NAME_ATTEMPTS
            ),
        ))
    }

    /// Add every foreign key of the table. Returns how many were created.
    pub async fn add_foreign_keys(&self, table: &TableSpec) -> Result<usize> {
        for fk in &table.foreign_keys {
            let to_column = match &fk.to_column {
                Some(column) => column.clone(),
                None => {
                    self.referenced_primary_key(&table.name, &fk.to_table, fk.seq)
                        .await?
                }
            };

            let sql = ddl::add_foreign_key_sql(&table.name, fk, &to_column)?;
            debug!("{}", sql);

            if let Err(e) = self.target.execute(&sql).await {
                error!(
                    "MySQL failed adding foreign key to {}.{} referencing {}.{}: {}",
                    table.name, fk.from_column, fk.to_table, to_column, e
                );
                return Err(e);
            }
            info!(
                "Added foreign key {}.{} -> {}.{}",
                table.name, fk.from_column, fk.to_table, to_column
            );
        }

        self.target.commit().await?;
        Ok(table.foreign_keys.len())
    }

    /// Replace whatever has the view's name on the target with the
    /// translated view, committing after each step.
    ///
    /// Returns `false` when the view was skipped because it has no stored
    /// definition or its definition cannot be translated.
    pub async fn create_view(&self, view: &ViewSpec) -> Result<bool> {
        let Some(definition) = view.sql.as_deref() else {
            warn!("Skipping view {}: the source catalog has no definition for it", view.name);
            return Ok(false);
        };
        let sql = match view::translate_view(&view.name, definition) {
            Ok(sql) => sql,
            Err(e) => {
                warn!("Skipping view {}: {}", view.name, e);
                return Ok(false);
            }
        };

        let target_name = quote_mysql(&safe_identifier(&view.name))?;
        match self
            .target
            .execute(&format!("DROP TABLE IF EXISTS {}", target_name))
            .await
        {
            Ok(()) => {}
            Err(e)
                if matches!(
                    e.server_code(),
                    Some(ER_BAD_TABLE_ERROR | ER_UNKNOWN_TABLE | ER_WRONG_OBJECT)
                ) =>
            {
                debug!("No table to drop in place of view {}: {}", view.name, e);
            }
            Err(e) => return Err(e),
        }
        self.target.commit().await?;
        self.target
            .execute(&format!("DROP VIEW IF EXISTS {}", target_name))
            .await?;
        self.target.commit().await?;

        debug!("{}", sql);
        if let Err(e) = self.target.execute(&sql).await {
            error!("MySQL failed creating view {}: {}", view.name, e);
            return Err(e);
        }
        self.target.commit().await?;
        info!("Created view {}", view.name);
        Ok(true)
    }

    /// A foreign key without an explicit target column references the
    /// primary key column at the same position.
    async fn referenced_primary_key(
        &self,
        table: &str,
        to_table: &str,
        seq: i64,
    ) -> Result<String> {
        let ordinal = u32::try_from(seq + 1).unwrap_or(0);
        self.source
            .load_columns(to_table)
            .await?
            .into_iter()
            .find(|c| c.pk_ordinal == ordinal)
            .map(|c| c.name)
            .ok_or_else(|| {
                MigrateError::schema(
                    table,
                    format!(
                        "foreign key references {} without a column and it has \
                         no primary key column {}",
                        to_table, ordinal
                    ),
                )
            })
    }
}
