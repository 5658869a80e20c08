//! Row values as they come out of SQLite storage classes.
//!
//! SQLite stores every value in one of five storage classes, so the value
//! enum mirrors them directly instead of the declared column type.

use std::borrow::Cow;

/// SQL value with borrowed or owned text and blob payloads.
///
/// Values decoded from the source are owned (`'static`) so a batch can cross
/// the reader's channel.
///
/// # Example
///
/// ```rust
/// use sqlite_mysql_migrate::core::SqlValue;
///
/// let name = SqlValue::text_owned("ada".to_string());
/// assert!(!name.is_null());
/// assert!(SqlValue::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    /// NULL storage class.
    Null,

    /// INTEGER storage class.
    Integer(i64),

    /// REAL storage class.
    Real(f64),

    /// TEXT storage class.
    Text(Cow<'a, str>),

    /// BLOB storage class, also used for text that is not valid UTF-8.
    Blob(Cow<'a, [u8]>),
}

impl SqlValue<'_> {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Create a text value from an owned String.
    #[must_use]
    pub fn text_owned(s: String) -> SqlValue<'static> {
        SqlValue::Text(Cow::Owned(s))
    }

    /// Create a blob value from an owned Vec<u8>.
    #[must_use]
    pub fn bytes_owned(b: Vec<u8>) -> SqlValue<'static> {
        SqlValue::Blob(Cow::Owned(b))
    }
}

/// A batch of rows for streaming transfer.
///
/// Rows are owned so a batch can cross the reader's channel.
#[derive(Debug)]
pub struct Batch {
    /// Rows in this batch, in the reader's column order.
    pub rows: Vec<Vec<SqlValue<'static>>>,

    /// Whether this is the final batch for the table.
    pub is_last: bool,
}

impl Batch {
    /// Create a new batch with the given rows.
    pub fn new(rows: Vec<Vec<SqlValue<'static>>>) -> Self {
        Self {
            rows,
            is_last: false,
        }
    }

    /// Mark this as the final batch.
    pub fn mark_final(mut self) -> Self {
        self.is_last = true;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_constructors() {
        assert_eq!(
            SqlValue::text_owned("hello".to_string()),
            SqlValue::Text(Cow::Owned("hello".to_string()))
        );
        assert_eq!(SqlValue::bytes_owned(vec![0, 1]), SqlValue::Blob(Cow::Owned(vec![0, 1])));
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::Integer(0).is_null());
    }

    #[test]
    fn test_batch_operations() {
        let batch = Batch::new(vec![
            vec![SqlValue::Integer(1), SqlValue::text_owned("a".to_string())],
            vec![SqlValue::Integer(2), SqlValue::text_owned("b".to_string())],
        ]);

        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert!(!batch.is_last);

        let final_batch = batch.mark_final();
        assert!(final_batch.is_last);
        assert!(Batch::new(Vec::new()).mark_final().is_empty());
    }
}
