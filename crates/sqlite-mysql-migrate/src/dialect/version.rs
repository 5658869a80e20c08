//! Target server version parsing and capability detection.
//!
//! Capabilities are derived once from the live server version string and
//! cached in [`Capabilities`] for the rest of the run.

use serde::Serialize;
use std::fmt;

/// A `major.minor.patch` server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parse a server version string, ignoring any `-<suffix>`.
///
/// `"10.6.12-MariaDB-1:10.6.12+maria~ubu2004"` parses as `10.6.12`.
/// Missing components default to zero. Returns `None` when the leading
/// component is not numeric.
pub fn parse_version(version_string: &str) -> Option<Version> {
    let numeric = version_string.trim().split('-').next().unwrap_or_default();
    let mut parts = numeric.split('.').map(|part| {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse::<u32>().ok()
    });

    let major = parts.next().flatten()?;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some(Version::new(major, minor, patch))
}

/// True when the version string identifies the MariaDB fork.
pub fn is_mariadb(version_string: &str) -> bool {
    version_string.to_lowercase().contains("-mariadb")
}

/// JSON column support.
///
/// MariaDB needs 10.2.7. For MySQL the check accepts 8.0.0 and later, or any
/// version whose minor is at least 7 and patch at least 8. The second branch
/// also accepts versions such as 5.9.9 that never shipped JSON; the behavior
/// is kept as observed.
pub fn supports_json(version_string: &str) -> bool {
    let Some(v) = parse_version(version_string) else {
        return false;
    };
    if is_mariadb(version_string) {
        return v >= Version::new(10, 2, 7);
    }
    v.major >= 8 || (v.minor >= 7 && v.patch >= 8)
}

/// FULLTEXT index support (InnoDB).
pub fn supports_fulltext(version_string: &str) -> bool {
    let Some(v) = parse_version(version_string) else {
        return false;
    };
    if is_mariadb(version_string) {
        return v >= Version::new(10, 0, 5);
    }
    v.major >= 8 || v.minor >= 6
}

/// `INSERT ... VALUES (...) AS alias ON DUPLICATE KEY UPDATE` support.
pub fn supports_upsert_alias(version_string: &str) -> bool {
    if is_mariadb(version_string) {
        return false;
    }
    parse_version(version_string).is_some_and(|v| v >= Version::new(8, 0, 19))
}

/// `DEFAULT CURRENT_TIMESTAMP` on DATETIME columns.
pub fn supports_current_timestamp_datetime(version_string: &str) -> bool {
    let Some(v) = parse_version(version_string) else {
        return false;
    };
    if is_mariadb(version_string) {
        return v >= Version::new(10, 0, 1);
    }
    v >= Version::new(5, 6, 5)
}

/// Parenthesized expression defaults such as `DEFAULT (CURRENT_DATE)`.
pub fn supports_expression_defaults(version_string: &str) -> bool {
    let Some(v) = parse_version(version_string) else {
        return false;
    };
    if is_mariadb(version_string) {
        return v >= Version::new(10, 2, 1);
    }
    v >= Version::new(8, 0, 13)
}

/// Fractional seconds precision on temporal types and `CURRENT_TIMESTAMP(n)`.
pub fn supports_fractional_seconds(version_string: &str) -> bool {
    let Some(v) = parse_version(version_string) else {
        return false;
    };
    if is_mariadb(version_string) {
        return v >= Version::new(10, 1, 2);
    }
    v >= Version::new(5, 6, 4)
}

/// Capabilities of the target server, computed once at setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub version: String,
    pub mariadb: bool,
    pub json: bool,
    pub fulltext: bool,
    pub upsert_alias: bool,
    pub current_timestamp_datetime: bool,
    pub expression_defaults: bool,
    pub fractional_seconds: bool,
}

impl Capabilities {
    pub fn from_version(version_string: &str) -> Self {
        Self {
            version: version_string.to_string(),
            mariadb: is_mariadb(version_string),
            json: supports_json(version_string),
            fulltext: supports_fulltext(version_string),
            upsert_alias: supports_upsert_alias(version_string),
            current_timestamp_datetime: supports_current_timestamp_datetime(version_string),
            expression_defaults: supports_expression_defaults(version_string),
            fractional_seconds: supports_fractional_seconds(version_string),
        }
    }
}
