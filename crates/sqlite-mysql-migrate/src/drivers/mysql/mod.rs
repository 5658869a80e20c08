//! MySQL/MariaDB target driver.
//!
//! # Supported Versions
//!
//! - MySQL 5.5+, 8.0+
//! - MariaDB 10.0+
//!
//! Server features that depend on the version (JSON columns, FULLTEXT on
//! InnoDB, the upsert row alias) are detected through
//! [`Capabilities`](crate::dialect::Capabilities).

mod writer;

pub use writer::MysqlWriter;

/// Unknown database.
pub const ER_BAD_DB_ERROR: u16 = 1049;

/// Invalid default value for a column.
pub const ER_INVALID_DEFAULT: u16 = 1067;

/// Unknown table in DROP TABLE.
pub const ER_BAD_TABLE_ERROR: u16 = 1051;

/// Unknown table.
pub const ER_UNKNOWN_TABLE: u16 = 1109;

/// Object is not of the expected kind (a view where a base table was named).
pub const ER_WRONG_OBJECT: u16 = 1347;

/// Duplicate key name.
pub const ER_DUP_KEYNAME: u16 = 1061;

/// Column cannot be part of a FULLTEXT index.
pub const ER_BAD_FT_COLUMN: u16 = 1283;
