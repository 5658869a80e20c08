//! SQLite source driver.
//!
//! Catalog metadata comes from the `sqlite_master` table and the
//! `table_xinfo`, `index_list`, `index_info` and `foreign_key_list` pragmas.
//! Files are always opened read-only.

mod reader;

pub use reader::SqliteReader;
