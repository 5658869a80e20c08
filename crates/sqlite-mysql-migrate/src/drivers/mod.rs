//! Database driver implementations.
//!
//! - [`sqlite`]: source reader over a SQLite file (sqlx)
//! - [`mysql`]: target writer for MySQL and MariaDB (mysql_async)

pub mod mysql;
pub mod sqlite;

pub use mysql::MysqlWriter;
pub use sqlite::SqliteReader;
