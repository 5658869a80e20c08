//! Column DEFAULT expression translation.
//!
//! Only defaults with a known MySQL spelling are emitted: NULL, numeric and
//! quoted literals, booleans, and the current date/time in its SQLite forms
//! (`CURRENT_*`, `datetime('now')`, `strftime(fmt, 'now')`). Anything else is
//! omitted.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::functions::{is_utc_modifier, mysql_date_format, Clock};
use super::typemap::base_keyword;
use super::version::Capabilities;

static CURRENT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^CURRENT_(TIMESTAMP|DATE|TIME)(?:\s*\(\s*\))?$")
        .expect("valid CURRENT_* pattern")
});

static SQLITE_NOW_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(datetime|date|time)\s*\(\s*'now'(?:\s*,\s*'(localtime|utc)')?\s*\)$")
        .expect("valid now function pattern")
});

static STRFTIME_NOW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^strftime\s*\(\s*'([^']+)'\s*,\s*'now'(?:\s*,\s*'(localtime|utc)')?\s*\)$")
        .expect("valid strftime pattern")
});

static NUMERIC_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$")
        .expect("valid numeric literal pattern")
});

static LENGTH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("valid length suffix pattern"));

/// Remove fully wrapping parentheses: `((0))` becomes `0`, `(a) + (b)` is kept.
pub fn strip_wrapping_parentheses(expr: &str) -> &str {
    let mut s = expr.trim();
    while s.starts_with('(') {
        let mut depth = 0usize;
        let mut closing = None;
        for (i, ch) in s.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        closing = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        match closing {
            Some(i) if i == s.len() - 1 => s = s[1..i].trim(),
            _ => break,
        }
    }
    s
}

/// A default that reads the current moment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NowDefault {
    /// `CURRENT_TIMESTAMP`, `CURRENT_DATE` or `CURRENT_TIME`.
    Keyword(Clock),
    /// `datetime('now')`, `date('now')` or `time('now')`.
    Function { clock: Clock, utc: bool },
    /// `strftime(format, 'now')`.
    Strftime { format: String, utc: bool },
}

impl NowDefault {
    fn parse(expr: &str) -> Option<Self> {
        if let Some(caps) = CURRENT_KEYWORD.captures(expr) {
            let clock = match caps[1].to_uppercase().as_str() {
                "DATE" => Clock::Date,
                "TIME" => Clock::Time,
                _ => Clock::Timestamp,
            };
            return Some(NowDefault::Keyword(clock));
        }
        if let Some(caps) = SQLITE_NOW_FUNCTION.captures(expr) {
            let clock = Clock::from_sqlite_function(&caps[1])?;
            return Some(NowDefault::Function {
                clock,
                utc: utc_capture(&caps),
            });
        }
        if let Some(caps) = STRFTIME_NOW.captures(expr) {
            return Some(NowDefault::Strftime {
                format: caps[1].to_string(),
                utc: utc_capture(&caps),
            });
        }
        None
    }

    fn utc(&self) -> bool {
        match self {
            NowDefault::Keyword(_) => false,
            NowDefault::Function { utc, .. } | NowDefault::Strftime { utc, .. } => *utc,
        }
    }

    /// Whether the default can fill a column of the given temporal kind.
    ///
    /// Every `strftime(..., 'now')` and `CURRENT_TIMESTAMP` qualify for all
    /// three; `datetime('now')` also fills a DATE column.
    fn fits(&self, column: Clock) -> bool {
        match self {
            NowDefault::Strftime { .. } => true,
            NowDefault::Keyword(clock) => *clock == column || *clock == Clock::Timestamp,
            NowDefault::Function { clock, .. } => {
                *clock == column || (column == Clock::Date && *clock == Clock::Timestamp)
            }
        }
    }
}

fn utc_capture(caps: &Captures<'_>) -> bool {
    is_utc_modifier(caps.get(2).map(|m| m.as_str()))
}

/// Temporal kind of a translated column type.
fn temporal_kind(base: &str) -> Option<Clock> {
    match base {
        "TIMESTAMP" | "DATETIME" => Some(Clock::Timestamp),
        "DATE" => Some(Clock::Date),
        "TIME" => Some(Clock::Time),
        _ => None,
    }
}

/// `(n)` for a column declared with 1 to 6 fractional digits, when the
/// server supports fractional seconds.
fn fractional_precision(column_type: &str, caps: &Capabilities) -> String {
    if !caps.fractional_seconds {
        return String::new();
    }
    LENGTH_SUFFIX
        .captures(column_type)
        .and_then(|c| c[1].parse::<u8>().ok())
        .filter(|n| (1..=6).contains(n))
        .map(|n| format!("({})", n))
        .unwrap_or_default()
}

/// Default for a temporal column from a current-moment expression.
fn temporal_default(
    base: &str,
    clock: Clock,
    now: &NowDefault,
    column_type: &str,
    caps: &Capabilities,
) -> Option<String> {
    if !now.fits(clock) {
        return None;
    }
    let fsp = match clock {
        Clock::Date => String::new(),
        Clock::Timestamp | Clock::Time => fractional_precision(column_type, caps),
    };
    let function = format!("{}{}", clock.mysql_function(now.utc()), fsp);

    match clock {
        // Only CURRENT_TIMESTAMP is accepted without parentheses.
        Clock::Timestamp if !now.utc() => {
            if base == "DATETIME" && !caps.current_timestamp_datetime {
                return None;
            }
            Some(function)
        }
        _ if caps.expression_defaults => Some(format!("({})", function)),
        _ => None,
    }
}

/// Expression default for a non-temporal column, e.g. a VARCHAR stamped with
/// `strftime('%Y', 'now')`.
fn expression_default(now: &NowDefault, caps: &Capabilities) -> Option<String> {
    if !caps.expression_defaults {
        return None;
    }
    let expr = match now {
        NowDefault::Keyword(clock) => clock.mysql_function(false).to_string(),
        NowDefault::Function { clock, utc } => clock.mysql_function(*utc).to_string(),
        NowDefault::Strftime { format, utc } => format!(
            "DATE_FORMAT({}, '{}')",
            Clock::Timestamp.mysql_function(*utc),
            mysql_date_format(format)?.replace('\'', "''")
        ),
    };
    Some(format!("({})", expr))
}

/// Translate a SQLite column default into the text following `DEFAULT`.
///
/// Returns `None` when the default must be omitted for this target.
pub fn translate_default(column_type: &str, default: &str, caps: &Capabilities) -> Option<String> {
    let raw = default.trim();
    if raw.is_empty() {
        return None;
    }

    let expr = strip_wrapping_parentheses(raw);
    let upper = expr.to_uppercase();
    if upper == "NULL" {
        return Some("NULL".to_string());
    }

    let base = base_keyword(column_type);

    if let Some(now) = NowDefault::parse(expr) {
        return match temporal_kind(&base) {
            Some(clock) => temporal_default(&base, clock, &now, column_type, caps),
            None => expression_default(&now, caps),
        };
    }

    if base == "BOOL" || base == "BOOLEAN" || base.starts_with("TINYINT") {
        match upper.trim_matches(|c| c == '\'' || c == '"') {
            "TRUE" => return Some("1".to_string()),
            "FALSE" => return Some("0".to_string()),
            _ => {}
        }
    }
    if upper == "TRUE" || upper == "FALSE" {
        return Some(upper);
    }

    if NUMERIC_LITERAL.is_match(expr) || is_quoted_literal(expr) {
        return Some(expr.to_string());
    }

    None
}

/// Single or double quoted string, or an `X'..'` blob literal.
fn is_quoted_literal(expr: &str) -> bool {
    let quoted = |q: char| expr.len() >= 2 && expr.starts_with(q) && expr.ends_with(q);
    let blob = expr.len() >= 3
        && expr.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("x'"))
        && expr.ends_with('\'');
    quoted('\'') || quoted('"') || blob
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modern() -> Capabilities {
        Capabilities::from_version("8.0.36")
    }

    #[test]
    fn test_strip_wrapping_parentheses() {
        assert_eq!(strip_wrapping_parentheses("((0))"), "0");
        assert_eq!(strip_wrapping_parentheses(" ( 'x' ) "), "'x'");
        assert_eq!(strip_wrapping_parentheses("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_wrapping_parentheses("42"), "42");
    }

    #[test]
    fn test_literals_pass_through() {
        let caps = modern();
        assert_eq!(translate_default("INT(11)", "0", &caps).as_deref(), Some("0"));
        assert_eq!(translate_default("INT(11)", "-12", &caps).as_deref(), Some("-12"));
        assert_eq!(translate_default("DOUBLE", "(1.5e3)", &caps).as_deref(), Some("1.5e3"));
        assert_eq!(
            translate_default("VARCHAR(255)", "'hello'", &caps).as_deref(),
            Some("'hello'")
        );
        assert_eq!(
            translate_default("VARCHAR(255)", "\"hi\"", &caps).as_deref(),
            Some("\"hi\"")
        );
        assert_eq!(
            translate_default("VARBINARY(4)", "x'00ff'", &caps).as_deref(),
            Some("x'00ff'")
        );
        assert_eq!(translate_default("INT(11)", "NULL", &caps).as_deref(), Some("NULL"));
        assert_eq!(translate_default("INT(11)", "   ", &caps), None);
    }

    #[test]
    fn test_unknown_expressions_are_omitted() {
        let caps = modern();
        assert_eq!(translate_default("INT(11)", "(abs(random()))", &caps), None);
        assert_eq!(translate_default("DOUBLE", "julianday('now')", &caps), None);
        assert_eq!(translate_default("VARCHAR(255)", "lower(hex(randomblob(4)))", &caps), None);
    }

    #[test]
    fn test_current_timestamp_defaults() {
        let caps = modern();
        for expr in [
            "CURRENT_TIMESTAMP",
            "current_timestamp()",
            "datetime('now')",
            "(datetime( 'now' , 'localtime'))",
            "strftime('%Y-%m-%d %H:%M:%S', 'now')",
        ] {
            assert_eq!(
                translate_default("TIMESTAMP", expr, &caps).as_deref(),
                Some("CURRENT_TIMESTAMP"),
                "{}",
                expr
            );
        }
        assert_eq!(
            translate_default("DATETIME", "datetime('now', 'utc')", &caps).as_deref(),
            Some("(UTC_TIMESTAMP)")
        );
    }

    #[test]
    fn test_fractional_second_precision() {
        let caps = modern();
        assert_eq!(
            translate_default("DATETIME(3)", "(strftime('%Y-%m-%d %H:%M:%f','now'))", &caps)
                .as_deref(),
            Some("CURRENT_TIMESTAMP(3)")
        );
        assert_eq!(
            translate_default("TIMESTAMP(6)", "CURRENT_TIMESTAMP", &caps).as_deref(),
            Some("CURRENT_TIMESTAMP(6)")
        );
        assert_eq!(
            translate_default("TIMESTAMP(9)", "CURRENT_TIMESTAMP", &caps).as_deref(),
            Some("CURRENT_TIMESTAMP")
        );
        let no_fsp = Capabilities::from_version("5.6.3");
        assert_eq!(
            translate_default("TIMESTAMP(3)", "CURRENT_TIMESTAMP", &no_fsp).as_deref(),
            Some("CURRENT_TIMESTAMP")
        );
    }

    #[test]
    fn test_date_and_time_defaults() {
        let caps = modern();
        assert_eq!(
            translate_default("DATE", "(date('now'))", &caps).as_deref(),
            Some("(CURRENT_DATE)")
        );
        assert_eq!(
            translate_default("DATE", "CURRENT_TIMESTAMP", &caps).as_deref(),
            Some("(CURRENT_DATE)")
        );
        assert_eq!(
            translate_default("DATE", "date('now', 'utc')", &caps).as_deref(),
            Some("(UTC_DATE)")
        );
        assert_eq!(
            translate_default("TIME", "(time('now'))", &caps).as_deref(),
            Some("(CURRENT_TIME)")
        );
        assert_eq!(
            translate_default("TIME(2)", "CURRENT_TIME", &caps).as_deref(),
            Some("(CURRENT_TIME(2))")
        );
        assert_eq!(translate_default("TIME", "date('now')", &caps), None);
    }

    #[test]
    fn test_expression_defaults_need_server_support() {
        let old = Capabilities::from_version("5.7.44");
        assert_eq!(translate_default("DATE", "date('now')", &old), None);
        assert_eq!(translate_default("TIME", "time('now')", &old), None);
        assert_eq!(translate_default("DATETIME", "datetime('now', 'utc')", &old), None);
        assert_eq!(
            translate_default("VARCHAR(10)", "strftime('%Y', 'now')", &old),
            None
        );
    }

    #[test]
    fn test_now_on_non_temporal_columns() {
        let caps = modern();
        assert_eq!(
            translate_default("VARCHAR(10)", "strftime('%Y-%m', 'now')", &caps).as_deref(),
            Some("(DATE_FORMAT(CURRENT_TIMESTAMP, '%Y-%m'))")
        );
        assert_eq!(
            translate_default("VARCHAR(32)", "datetime('now', 'utc')", &caps).as_deref(),
            Some("(UTC_TIMESTAMP)")
        );
        assert_eq!(translate_default("BIGINT(20)", "strftime('%s', 'now')", &caps), None);
    }

    #[test]
    fn test_datetime_default_omitted_on_old_servers() {
        let old = Capabilities::from_version("5.5.62");
        assert_eq!(translate_default("DATETIME", "CURRENT_TIMESTAMP", &old), None);
        assert_eq!(
            translate_default("TIMESTAMP", "CURRENT_TIMESTAMP", &old).as_deref(),
            Some("CURRENT_TIMESTAMP")
        );
    }

    #[test]
    fn test_boolean_defaults() {
        let caps = modern();
        assert_eq!(translate_default("TINYINT(1)", "TRUE", &caps).as_deref(), Some("1"));
        assert_eq!(translate_default("TINYINT(1)", "'false'", &caps).as_deref(), Some("0"));
        assert_eq!(translate_default("TINYINT(1)", "1", &caps).as_deref(), Some("1"));
        assert_eq!(translate_default("INT(11)", "true", &caps).as_deref(), Some("TRUE"));
    }
}
