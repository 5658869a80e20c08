//! Core abstractions shared by the drivers and the migration stages.
//!
//! - [`schema`]: table, view, column, index and foreign key metadata
//! - [`value`]: row values and batches
//! - [`traits`]: the source and target engine seams
//! - [`identifier`]: identifier truncation and quoting

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use schema::{
    ColumnSpec, ColumnVisibility, ForeignKeySpec, IndexOrigin, IndexSpec, TableSpec, ViewSpec,
};
pub use traits::{ReadOptions, SourceReader, TableFilter, TargetWriter};
pub use value::{Batch, SqlValue};
