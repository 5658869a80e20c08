//! INSERT statement construction for the configured conflict handling.

use crate::config::InsertMethod;
use crate::core::identifier::quote_mysql;
use crate::error::Result;

/// Maximum number of placeholders in one prepared statement.
pub const MYSQL_MAX_PLACEHOLDERS: usize = 65_535;

/// Row alias used by the upsert form.
const UPSERT_ALIAS: &str = "__new__";

/// A parameterized multi-row INSERT for one target table.
///
/// Column names are quoted once at construction; [`render`](Self::render)
/// only expands the VALUES list for a given row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    columns: Vec<String>,
    prefix: String,
    suffix: String,
}

impl InsertStatement {
    /// Build a statement for `table` with the already identifier-safe `columns`.
    ///
    /// `use_alias` selects `VALUES (...) AS __new__` for the UPDATE method; without
    /// it the update clause falls back to `col = VALUES(col)`.
    pub fn new(
        table: &str,
        columns: &[String],
        method: InsertMethod,
        use_alias: bool,
    ) -> Result<Self> {
        let quoted: Vec<String> = columns
            .iter()
            .map(|c| quote_mysql(c))
            .collect::<Result<_>>()?;

        let verb = match method {
            InsertMethod::Ignore => "INSERT IGNORE",
            InsertMethod::Default | InsertMethod::Update => "INSERT",
        };
        let prefix = format!(
            "{} INTO {} ({}) VALUES ",
            verb,
            quote_mysql(table)?,
            quoted.join(", ")
        );

        let suffix = match method {
            InsertMethod::Update if use_alias => {
                let alias = quote_mysql(UPSERT_ALIAS)?;
                let updates = quoted
                    .iter()
                    .map(|c| format!("{} = {}.{}", c, alias, c))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(" AS {} ON DUPLICATE KEY UPDATE {}", alias, updates)
            }
            InsertMethod::Update => {
                let updates = quoted
                    .iter()
                    .map(|c| format!("{} = VALUES({})", c, c))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(" ON DUPLICATE KEY UPDATE {}", updates)
            }
            _ => String::new(),
        };

        Ok(Self {
            table: table.to_string(),
            columns: columns.to_vec(),
            prefix,
            suffix,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Largest number of rows one statement can carry.
    pub fn max_rows_per_statement(&self) -> usize {
        if self.columns.is_empty() {
            return 0;
        }
        MYSQL_MAX_PLACEHOLDERS / self.columns.len()
    }

    /// Render the SQL for `rows` rows of `?` placeholders.
    pub fn render(&self, rows: usize) -> String {
        let row = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let values = std::iter::repeat_n(row, rows).collect::<Vec<_>>().join(", ");
        format!("{}{}{}", self.prefix, values, self.suffix)
    }
}
