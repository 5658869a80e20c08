//! MySQL DDL rendering.
//!
//! Everything here is pure: the same table descriptor and context always
//! render the same statements.

use tracing::warn;

use crate::config::TransferConfig;
use crate::core::identifier::{quote_mysql, safe_identifier, suffixed_identifier};
use crate::core::schema::{ColumnSpec, ForeignKeySpec, IndexSpec, TableSpec};
use crate::dialect::typemap::{
    base_keyword, is_blob_type, is_text_or_json_type, supports_default,
};
use crate::dialect::{length_suffix, translate, translate_default, Capabilities, TypeDefaults};
use crate::error::Result;

/// Prefix length applied to text and blob columns in keys.
pub const KEY_PREFIX_LENGTH: u32 = 255;

/// Name of the synthetic rowid column.
pub const ROWID_COLUMN: &str = "rowid";

/// String types whose declared length is reused as an index prefix.
const PREFIXABLE_STRING_TYPES: &[&str] = &["CHAR", "VARCHAR", "BINARY", "VARBINARY"];

/// Settings that shape the generated DDL.
#[derive(Debug, Clone)]
pub struct DdlContext {
    pub defaults: TypeDefaults,
    pub capabilities: Capabilities,
    pub charset: String,
    pub collation: String,
    pub use_fulltext: bool,
}

impl DdlContext {
    pub fn new(config: &TransferConfig, capabilities: Capabilities) -> Self {
        Self {
            defaults: TypeDefaults::from(config),
            capabilities,
            charset: config.charset.clone(),
            collation: config.get_collation(),
            use_fulltext: config.use_fulltext,
        }
    }

    /// Target type for a column, downgrading JSON when the server lacks it.
    pub fn column_type(&self, column: &ColumnSpec) -> Result<String> {
        let translated = translate(&column.declared_type, &self.defaults)?;
        if base_keyword(&translated) == "JSON" && !self.capabilities.json {
            return Ok(self.defaults.text_type.clone());
        }
        Ok(translated)
    }
}

/// Index flavour in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Index,
    Unique,
    Fulltext,
}

impl IndexKind {
    pub fn keyword(self) -> &'static str {
        match self {
            IndexKind::Index => "INDEX",
            IndexKind::Unique => "UNIQUE",
            IndexKind::Fulltext => "FULLTEXT",
        }
    }

    /// The kind used when FULLTEXT is rejected.
    pub fn plain(unique: bool) -> Self {
        if unique {
            IndexKind::Unique
        } else {
            IndexKind::Index
        }
    }
}

/// Primary key column with its prefix length where one is required.
fn key_column(name: &str, column_type: &str) -> Result<String> {
    let base = base_keyword(column_type);
    let needs_length = is_text_or_json_type(column_type)
        || is_blob_type(column_type)
        || base.starts_with("CHAR")
        || base.starts_with("VARCHAR");

    let quoted = quote_mysql(name)?;
    if needs_length {
        Ok(format!(
            "{}{}",
            quoted,
            length_suffix(column_type, Some(KEY_PREFIX_LENGTH))
        ))
    } else {
        Ok(quoted)
    }
}

/// One column definition inside CREATE TABLE.
fn column_definition(
    column: &ColumnSpec,
    column_type: &str,
    auto_increment: bool,
    with_defaults: bool,
    ctx: &DdlContext,
) -> Result<String> {
    let mut def = format!("{} {}", quote_mysql(&safe_identifier(&column.name))?, column_type);

    if !column.nullable || column.is_primary_key() {
        def.push_str(" NOT NULL");
    } else {
        def.push_str(" NULL");
    }

    if auto_increment {
        def.push_str(" AUTO_INCREMENT");
    } else if with_defaults && supports_default(column_type) {
        if let Some(default) = column.default_value.as_deref() {
            match translate_default(column_type, default, &ctx.capabilities) {
                Some(value) => {
                    def.push_str(" DEFAULT ");
                    def.push_str(&value);
                }
                None => warn!(
                    "Omitting DEFAULT {} of column {}: not expressible as a {} default on this server",
                    default, column.name, column_type
                ),
            }
        }
    }

    Ok(def)
}

fn is_auto_increment_type(column_type: &str) -> bool {
    let upper = column_type.trim().to_uppercase();
    upper.starts_with("INT") || upper.starts_with("BIGINT")
}

/// Render `CREATE TABLE IF NOT EXISTS` for a table.
///
/// Hidden and computed columns are left out. With `with_rowid` a leading
/// `rowid BIGINT NOT NULL` column and a `<table>_rowid` unique constraint are
/// added.
pub fn create_table_sql(table: &TableSpec, with_rowid: bool, ctx: &DdlContext) -> Result<String> {
    render_create_table(table, with_rowid, true, ctx)
}

/// [`create_table_sql`] with every DEFAULT clause left out, for servers that
/// reject a translated default.
pub fn create_table_sql_without_defaults(
    table: &TableSpec,
    with_rowid: bool,
    ctx: &DdlContext,
) -> Result<String> {
    render_create_table(table, with_rowid, false, ctx)
}

fn render_create_table(
    table: &TableSpec,
    with_rowid: bool,
    with_defaults: bool,
    ctx: &DdlContext,
) -> Result<String> {
    let compound_pk = table.has_compound_primary_key();
    let mut definitions = Vec::with_capacity(table.columns.len() + 3);

    if with_rowid {
        definitions.push(format!("{} BIGINT NOT NULL", quote_mysql(ROWID_COLUMN)?));
    }

    let mut primary_key = Vec::new();
    for column in table.visible_columns() {
        let column_type = ctx.column_type(column)?;
        let auto_increment =
            column.is_primary_key() && !compound_pk && is_auto_increment_type(&column_type);
        definitions.push(column_definition(
            column,
            &column_type,
            auto_increment,
            with_defaults,
            ctx,
        )?);
        if column.is_primary_key() {
            primary_key.push((column.pk_ordinal, safe_identifier(&column.name), column_type));
        }
    }

    if !primary_key.is_empty() {
        primary_key.sort_by_key(|(ordinal, _, _)| *ordinal);
        let keys = primary_key
            .iter()
            .map(|(_, name, column_type)| key_column(name, column_type))
            .collect::<Result<Vec<_>>>()?;
        definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    if with_rowid {
        definitions.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quote_mysql(&suffixed_identifier(&table.name, "_rowid"))?,
            quote_mysql(ROWID_COLUMN)?
        ));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n) ENGINE=InnoDB DEFAULT CHARSET={} COLLATE={}",
        quote_mysql(&safe_identifier(&table.name))?,
        definitions.join(",\n  "),
        ctx.charset,
        ctx.collation
    ))
}

/// Pick the target index kind for a source index.
pub fn index_kind(table: &TableSpec, index: &IndexSpec, ctx: &DdlContext) -> Result<IndexKind> {
    if ctx.use_fulltext && ctx.capabilities.fulltext {
        for name in index.columns.iter().flatten() {
            if let Some(column) = table.column(name) {
                if is_text_or_json_type(&ctx.column_type(column)?) {
                    return Ok(IndexKind::Fulltext);
                }
            }
        }
    }
    Ok(IndexKind::plain(index.is_unique))
}

/// Column list for an index, or `None` when the index covers an expression
/// or a column that is not migrated.
pub fn index_columns(
    table: &TableSpec,
    index: &IndexSpec,
    kind: IndexKind,
    ctx: &DdlContext,
) -> Result<Option<String>> {
    let mut parts = Vec::with_capacity(index.columns.len());

    for name in &index.columns {
        let Some(name) = name else {
            return Ok(None);
        };
        let Some(column) = table.column(name).filter(|c| c.is_visible()) else {
            return Ok(None);
        };

        let column_type = ctx.column_type(column)?;
        let quoted = quote_mysql(&safe_identifier(name))?;
        let prefix = if is_blob_type(&column_type) {
            format!("({})", KEY_PREFIX_LENGTH)
        } else if is_text_or_json_type(&column_type) {
            if kind == IndexKind::Fulltext {
                String::new()
            } else {
                format!("({})", KEY_PREFIX_LENGTH)
            }
        } else if PREFIXABLE_STRING_TYPES.contains(&base_keyword(&column_type).as_str()) {
            length_suffix(&column_type, None)
        } else {
            String::new()
        };
        parts.push(format!("{}{}", quoted, prefix));
    }

    Ok(Some(parts.join(", ")))
}

/// Render `ALTER TABLE ... ADD <kind> <name>(<columns>)`.
pub fn add_index_sql(table: &str, name: &str, kind: IndexKind, columns: &str) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD {} {}({})",
        quote_mysql(&safe_identifier(table))?,
        kind.keyword(),
        quote_mysql(&safe_identifier(name))?,
        columns
    ))
}

/// Referential action in target syntax: upper-cased, SET DEFAULT becomes
/// NO ACTION.
pub fn referential_action(action: &str) -> String {
    let upper = action
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    match upper.as_str() {
        "SET DEFAULT" => "NO ACTION".to_string(),
        "" => "NO ACTION".to_string(),
        _ => upper,
    }
}

/// Constraint name `<table>_FK_<id>_<seq>`.
pub fn foreign_key_name(table: &str, fk: &ForeignKeySpec) -> String {
    suffixed_identifier(table, &format!("_FK_{}_{}", fk.id, fk.seq))
}

/// Render `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`.
pub fn add_foreign_key_sql(table: &str, fk: &ForeignKeySpec, to_column: &str) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
        quote_mysql(&safe_identifier(table))?,
        quote_mysql(&foreign_key_name(table, fk))?,
        quote_mysql(&safe_identifier(&fk.from_column))?,
        quote_mysql(&safe_identifier(&fk.to_table))?,
        quote_mysql(&safe_identifier(to_column))?,
        referential_action(&fk.on_delete),
        referential_action(&fk.on_update)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnVisibility, IndexOrigin};

    fn ctx() -> DdlContext {
        DdlContext::new(&TransferConfig::default(), Capabilities::from_version("8.0.36"))
    }

    fn col(name: &str, declared: &str, pk: u32) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            declared_type: declared.to_string(),
            nullable: true,
            pk_ordinal: pk,
            default_value: None,
            visibility: ColumnVisibility::Visible,
        }
    }

    fn table(name: &str, columns: Vec<ColumnSpec>) -> TableSpec {
        TableSpec {
            name: name.to_string(),
            columns,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            row_count: 0,
        }
    }

    fn index(name: &str, unique: bool, columns: &[&str]) -> IndexSpec {
        IndexSpec {
            name: name.to_string(),
            is_unique: unique,
            columns: columns.iter().map(|c| Some(c.to_string())).collect(),
            origin: IndexOrigin::Regular,
        }
    }

    // ==========================================================================
    // CREATE TABLE
    // ==========================================================================

    #[test]
    fn test_round_trip_table() {
        let t = table(
            "stock",
            vec![
                col("id", "INTEGER", 1),
                col("name", "TEXT", 0),
                col("qty", "UNSIGNED BIG INT(10)", 0),
            ],
        );
        let sql = create_table_sql(&t, false, &ctx()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `stock` (\n  \
             `id` INT(11) NOT NULL AUTO_INCREMENT,\n  \
             `name` TEXT NULL,\n  \
             `qty` BIGINT(10) UNSIGNED NULL,\n  \
             PRIMARY KEY (`id`)\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"
        );
    }

    #[test]
    fn test_compound_key_disables_auto_increment() {
        let t = table(
            "pairs",
            vec![col("a", "INTEGER", 1), col("b", "VARCHAR(20)", 2)],
        );
        let sql = create_table_sql(&t, false, &ctx()).unwrap();
        assert!(!sql.contains("AUTO_INCREMENT"));
        assert!(sql.contains("PRIMARY KEY (`a`, `b`(20))"));
    }

    #[test]
    fn test_text_primary_key_gets_prefix() {
        let t = table("kv", vec![col("k", "TEXT", 1), col("v", "BLOB", 0)]);
        let sql = create_table_sql(&t, false, &ctx()).unwrap();
        assert!(sql.contains("`k` TEXT NOT NULL"));
        assert!(sql.contains("PRIMARY KEY (`k`(255))"));
        assert!(!sql.contains("AUTO_INCREMENT"));
    }

    #[test]
    fn test_with_rowid() {
        let t = table("notes", vec![col("body", "TEXT", 0)]);
        let sql = create_table_sql(&t, true, &ctx()).unwrap();
        assert!(sql.contains("(\n  `rowid` BIGINT NOT NULL,\n  `body` TEXT NULL"));
        assert!(sql.contains("CONSTRAINT `notes_rowid` UNIQUE (`rowid`)"));
    }

    #[test]
    fn test_hidden_columns_skipped() {
        let mut generated = col("total", "INTEGER", 0);
        generated.visibility = ColumnVisibility::ComputedStored;
        let t = table("t", vec![col("a", "INTEGER", 0), generated]);
        let sql = create_table_sql(&t, false, &ctx()).unwrap();
        assert!(!sql.contains("total"));
    }

    #[test]
    fn test_defaults() {
        let mut created = col("created", "TIMESTAMP", 0);
        created.default_value = Some("CURRENT_TIMESTAMP".to_string());
        let mut flag = col("flag", "BOOLEAN", 0);
        flag.default_value = Some("FALSE".to_string());
        let mut body = col("body", "TEXT", 0);
        body.default_value = Some("''".to_string());
        let mut count = col("count", "INTEGER", 0);
        count.nullable = false;
        count.default_value = Some("(0)".to_string());

        let t = table("t", vec![created, flag, body, count]);
        let sql = create_table_sql(&t, false, &ctx()).unwrap();
        assert!(sql.contains("`created` TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP"));
        assert!(sql.contains("`flag` TINYINT(1) NULL DEFAULT 0"));
        assert!(sql.contains("`body` TEXT NULL,"));
        assert!(sql.contains("`count` INT(11) NOT NULL DEFAULT 0"));

        let bare = create_table_sql_without_defaults(&t, false, &ctx()).unwrap();
        assert!(!bare.contains("DEFAULT CURRENT_TIMESTAMP"));
        assert!(bare.contains("`flag` TINYINT(1) NULL,"));
        assert!(bare.contains("`count` INT(11) NOT NULL\n"));
    }

    #[test]
    fn test_temporal_defaults() {
        let mut day = col("day", "DATE", 0);
        day.default_value = Some("(date('now'))".to_string());
        let mut stamp = col("stamp", "DATETIME(3)", 0);
        stamp.default_value = Some("(strftime('%Y-%m-%d %H:%M:%f', 'now'))".to_string());
        let mut odd = col("odd", "INTEGER", 0);
        odd.default_value = Some("(abs(random()))".to_string());

        let t = table("t", vec![day, stamp, odd]);
        let sql = create_table_sql(&t, false, &ctx()).unwrap();
        assert!(sql.contains("`day` DATE NULL DEFAULT (CURRENT_DATE)"));
        assert!(sql.contains("`stamp` DATETIME(3) NULL DEFAULT CURRENT_TIMESTAMP(3)"));
        assert!(sql.contains("`odd` INT(11) NULL\n"));
    }

    #[test]
    fn test_json_downgraded_without_support() {
        let old = DdlContext::new(&TransferConfig::default(), Capabilities::from_version("5.6.40"));
        let c = col("doc", "JSON", 0);
        assert_eq!(old.column_type(&c).unwrap(), "TEXT");
        assert_eq!(ctx().column_type(&c).unwrap(), "JSON");
    }

    #[test]
    fn test_invalid_column_type_propagates() {
        let t = table("t", vec![col("a", "", 0)]);
        let err = create_table_sql(&t, false, &ctx()).unwrap_err();
        assert!(matches!(err, crate::MigrateError::InvalidColumnType(_)));
    }

    #[test]
    fn test_long_table_name_truncated() {
        let name = "t".repeat(70);
        let t = table(&name, vec![col("a", "INTEGER", 0)]);
        let sql = create_table_sql(&t, true, &ctx()).unwrap();
        assert!(sql.contains(&format!("`{}`", "t".repeat(64))));
        assert!(sql.contains(&format!("`{}_rowid`", "t".repeat(58))));
    }

    // ==========================================================================
    // Indexes
    // ==========================================================================

    #[test]
    fn test_index_columns_prefixes() {
        let t = table(
            "t",
            vec![
                col("code", "VARCHAR(32)", 0),
                col("body", "TEXT", 0),
                col("data", "BLOB", 0),
                col("n", "INTEGER(7)", 0),
            ],
        );
        let idx = index("ix", false, &["code", "body", "data", "n"]);
        let cols = index_columns(&t, &idx, IndexKind::Index, &ctx()).unwrap();
        assert_eq!(
            cols.as_deref(),
            Some("`code`(32), `body`(255), `data`(255), `n`")
        );

        let cols = index_columns(&t, &idx, IndexKind::Fulltext, &ctx()).unwrap();
        assert_eq!(
            cols.as_deref(),
            Some("`code`(32), `body`, `data`(255), `n`")
        );
    }

    #[test]
    fn test_expression_index_has_no_columns() {
        let t = table("t", vec![col("a", "INTEGER", 0)]);
        let idx = IndexSpec {
            name: "expr".to_string(),
            is_unique: false,
            columns: vec![None],
            origin: IndexOrigin::Regular,
        };
        assert_eq!(index_columns(&t, &idx, IndexKind::Index, &ctx()).unwrap(), None);
    }

    #[test]
    fn test_index_kind() {
        let t = table("t", vec![col("body", "TEXT", 0), col("n", "INTEGER", 0)]);
        let text_idx = index("ix_body", true, &["body"]);
        let int_idx = index("ix_n", false, &["n"]);

        assert_eq!(index_kind(&t, &text_idx, &ctx()).unwrap(), IndexKind::Unique);

        let mut fulltext = ctx();
        fulltext.use_fulltext = true;
        assert_eq!(index_kind(&t, &text_idx, &fulltext).unwrap(), IndexKind::Fulltext);
        assert_eq!(index_kind(&t, &int_idx, &fulltext).unwrap(), IndexKind::Index);

        let mut unsupported = DdlContext::new(
            &TransferConfig::default(),
            Capabilities::from_version("5.5.62"),
        );
        unsupported.use_fulltext = true;
        assert_eq!(index_kind(&t, &text_idx, &unsupported).unwrap(), IndexKind::Unique);
    }

    #[test]
    fn test_add_index_sql() {
        assert_eq!(
            add_index_sql("users", "users_email", IndexKind::Unique, "`email`(255)").unwrap(),
            "ALTER TABLE `users` ADD UNIQUE `users_email`(`email`(255))"
        );
    }

    // ==========================================================================
    // Foreign keys
    // ==========================================================================

    fn fk(on_delete: &str, on_update: &str) -> ForeignKeySpec {
        ForeignKeySpec {
            id: 0,
            seq: 0,
            from_column: "parent_id".to_string(),
            to_table: "parents".to_string(),
            to_column: Some("id".to_string()),
            on_delete: on_delete.to_string(),
            on_update: on_update.to_string(),
        }
    }

    #[test]
    fn test_referential_action() {
        assert_eq!(referential_action("cascade"), "CASCADE");
        assert_eq!(referential_action("SET DEFAULT"), "NO ACTION");
        assert_eq!(referential_action("set  null"), "SET NULL");
        assert_eq!(referential_action("NO ACTION"), "NO ACTION");
        assert_eq!(referential_action("RESTRICT"), "RESTRICT");
    }

    #[test]
    fn test_add_foreign_key_sql() {
        let sql = add_foreign_key_sql("children", &fk("CASCADE", "SET DEFAULT"), "id").unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE `children` ADD CONSTRAINT `children_FK_0_0` FOREIGN KEY (`parent_id`) \
             REFERENCES `parents`(`id`) ON DELETE CASCADE ON UPDATE NO ACTION"
        );
    }

    #[test]
    fn test_foreign_key_name_fits_limit() {
        let name = foreign_key_name(&"c".repeat(80), &fk("", ""));
        assert_eq!(name.chars().count(), 64);
        assert!(name.ends_with("_FK_0_0"));
    }
}
