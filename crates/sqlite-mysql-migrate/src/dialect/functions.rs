//! SQLite date/time functions and their MySQL counterparts.
//!
//! Shared by DEFAULT translation and view rewriting.

/// Which part of the current moment a function returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Timestamp,
    Date,
    Time,
}

impl Clock {
    /// Clock for a SQLite `datetime`/`date`/`time` function name.
    pub fn from_sqlite_function(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "datetime" => Some(Clock::Timestamp),
            "date" => Some(Clock::Date),
            "time" => Some(Clock::Time),
            _ => None,
        }
    }

    /// MySQL function name for this clock, in session time or UTC.
    pub fn mysql_function(self, utc: bool) -> &'static str {
        match (self, utc) {
            (Clock::Timestamp, false) => "CURRENT_TIMESTAMP",
            (Clock::Timestamp, true) => "UTC_TIMESTAMP",
            (Clock::Date, false) => "CURRENT_DATE",
            (Clock::Date, true) => "UTC_DATE",
            (Clock::Time, false) => "CURRENT_TIME",
            (Clock::Time, true) => "UTC_TIME",
        }
    }
}

/// Whether a SQLite modifier list asks for UTC.
///
/// `'localtime'` and no modifier both mean the session clock.
pub fn is_utc_modifier(modifier: Option<&str>) -> bool {
    modifier.is_some_and(|m| m.eq_ignore_ascii_case("utc"))
}

/// Convert a SQLite `strftime` format to a MySQL `DATE_FORMAT` format.
///
/// Returns `None` when the format uses a conversion MySQL cannot express
/// (`%s` epoch seconds, `%J` Julian day) or ends in a lone `%`.
pub fn mysql_date_format(sqlite_format: &str) -> Option<String> {
    let mut out = String::with_capacity(sqlite_format.len() + 4);
    let mut chars = sqlite_format.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let converted = match chars.next()? {
            'Y' => "%Y",
            'y' => "%y",
            'm' => "%m",
            'd' => "%d",
            'e' => "%e",
            'H' => "%H",
            'k' => "%k",
            'I' => "%h",
            'l' => "%l",
            'M' => "%i",
            'S' => "%s",
            'f' => "%s.%f",
            'p' => "%p",
            'j' => "%j",
            'w' => "%w",
            'W' => "%u",
            'U' => "%U",
            'F' => "%Y-%m-%d",
            'T' => "%H:%i:%s",
            'R' => "%H:%i",
            '%' => "%%",
            _ => return None,
        };
        out.push_str(converted);
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_from_sqlite_function() {
        assert_eq!(Clock::from_sqlite_function("DateTime"), Some(Clock::Timestamp));
        assert_eq!(Clock::from_sqlite_function("date"), Some(Clock::Date));
        assert_eq!(Clock::from_sqlite_function("time"), Some(Clock::Time));
        assert_eq!(Clock::from_sqlite_function("julianday"), None);
    }

    #[test]
    fn test_mysql_function() {
        assert_eq!(Clock::Timestamp.mysql_function(false), "CURRENT_TIMESTAMP");
        assert_eq!(Clock::Date.mysql_function(true), "UTC_DATE");
        assert_eq!(Clock::Time.mysql_function(true), "UTC_TIME");
    }

    #[test]
    fn test_utc_modifier() {
        assert!(is_utc_modifier(Some("UTC")));
        assert!(!is_utc_modifier(Some("localtime")));
        assert!(!is_utc_modifier(None));
    }

    #[test]
    fn test_mysql_date_format() {
        assert_eq!(
            mysql_date_format("%Y-%m-%d %H:%M:%S").as_deref(),
            Some("%Y-%m-%d %H:%i:%s")
        );
        assert_eq!(
            mysql_date_format("%Y-%m-%d %H:%M:%f").as_deref(),
            Some("%Y-%m-%d %H:%i:%s.%f")
        );
        assert_eq!(mysql_date_format("week %W, 100%%").as_deref(), Some("week %u, 100%%"));
        assert_eq!(mysql_date_format("%s"), None);
        assert_eq!(mysql_date_format("%J"), None);
        assert_eq!(mysql_date_format("trailing %"), None);
    }
}
