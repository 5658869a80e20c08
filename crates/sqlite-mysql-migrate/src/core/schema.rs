//! Source catalog metadata: tables, columns, indexes and foreign keys.
//!
//! Records are populated once per catalog query and only read afterwards.

use serde::{Deserialize, Serialize};

/// Column visibility as reported by the extended column catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnVisibility {
    #[default]
    Visible,
    Hidden,
    ComputedVirtual,
    ComputedStored,
}

impl ColumnVisibility {
    /// Map the catalog's `hidden` code (0 visible, 1 hidden, 2 virtual, 3 stored).
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => ColumnVisibility::Hidden,
            2 => ColumnVisibility::ComputedVirtual,
            3 => ColumnVisibility::ComputedStored,
            _ => ColumnVisibility::Visible,
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,

    /// Declared type exactly as written in the source schema.
    pub declared_type: String,

    /// Whether the column accepts NULL.
    pub nullable: bool,

    /// 1-based position in the primary key, 0 when not part of it.
    pub pk_ordinal: u32,

    /// Raw default expression.
    pub default_value: Option<String>,

    /// Hidden and computed columns are never migrated.
    pub visibility: ColumnVisibility,
}

impl ColumnSpec {
    pub fn is_visible(&self) -> bool {
        self.visibility == ColumnVisibility::Visible
    }

    pub fn is_primary_key(&self) -> bool {
        self.pk_ordinal > 0
    }
}

/// How an index came to exist in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOrigin {
    /// CREATE INDEX.
    Regular,
    /// Implied by a PRIMARY KEY constraint.
    PrimaryKey,
    /// Implied by a UNIQUE constraint.
    Auto,
}

impl IndexOrigin {
    /// Map the catalog's origin code (`c`, `pk`, `u`).
    pub fn from_code(code: &str) -> Self {
        match code {
            "pk" => IndexOrigin::PrimaryKey,
            "u" => IndexOrigin::Auto,
            _ => IndexOrigin::Regular,
        }
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name.
    pub name: String,

    /// Whether the index enforces uniqueness.
    pub is_unique: bool,

    /// Indexed columns in key order. `None` marks an expression column.
    pub columns: Vec<Option<String>>,

    /// Where the index came from.
    pub origin: IndexOrigin,
}

/// One column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    /// Groups the rows of a multi-column key.
    pub id: i64,

    /// Position within the key.
    pub seq: i64,

    /// Referencing column.
    pub from_column: String,

    /// Referenced table.
    pub to_table: String,

    /// Referenced column. `None` means the referenced table's primary key.
    pub to_column: Option<String>,

    /// ON DELETE action as declared.
    pub on_delete: String,

    /// ON UPDATE action as declared.
    pub on_update: String,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,

    /// Column definitions in declaration order.
    pub columns: Vec<ColumnSpec>,

    /// Indexes.
    pub indexes: Vec<IndexSpec>,

    /// Foreign key rows.
    pub foreign_keys: Vec<ForeignKeySpec>,

    /// Row count (0 when data transfer is disabled).
    pub row_count: i64,
}

impl TableSpec {
    /// Columns that take part in DDL and DML.
    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.is_visible())
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// More than one column in the primary key.
    pub fn has_compound_primary_key(&self) -> bool {
        self.columns.iter().filter(|c| c.is_primary_key()).count() > 1
    }
}

/// A source view and its stored definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSpec {
    /// View name.
    pub name: String,

    /// `CREATE VIEW` statement as stored in the catalog. `None` when the
    /// catalog has no text for it.
    pub sql: Option<String>,
}
