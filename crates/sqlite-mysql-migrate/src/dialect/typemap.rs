//! SQLite to MySQL column type translation.
//!
//! A declared SQLite type is tokenized once into a [`DeclaredType`]
//! (base keyword, length suffix, precision/scale suffix, unsigned flag) and
//! then dispatched through [`RULES`], an ordered table of
//! `(predicate, transform)` pairs. The first matching rule wins.
//!
//! Translation depends only on the declared type and the configured
//! [`TypeDefaults`], so identical inputs always yield identical output.

use crate::config::TransferConfig;
use crate::error::{MigrateError, Result};

/// MySQL column type keywords recognized as valid targets.
pub const MYSQL_COLUMN_TYPES: &[&str] = &[
    "BIGINT",
    "BINARY",
    "BIT",
    "BLOB",
    "BOOLEAN",
    "CHAR",
    "DATE",
    "DATETIME",
    "DECIMAL",
    "DOUBLE",
    "ENUM",
    "FLOAT",
    "INTEGER",
    "JSON",
    "LONGBLOB",
    "LONGTEXT",
    "MEDIUMBLOB",
    "MEDIUMINT",
    "MEDIUMTEXT",
    "NCHAR",
    "NVARCHAR",
    "NUMERIC",
    "SET",
    "SMALLINT",
    "REAL",
    "TEXT",
    "TIME",
    "TIMESTAMP",
    "TINYBLOB",
    "TINYINT",
    "TINYTEXT",
    "VARBINARY",
    "VARCHAR",
    "YEAR",
];

/// Text family types.
pub const MYSQL_TEXT_TYPES: &[&str] = &["LONGTEXT", "MEDIUMTEXT", "TEXT", "TINYTEXT"];

/// Blob family types.
pub const MYSQL_BLOB_TYPES: &[&str] = &["LONGBLOB", "MEDIUMBLOB", "BLOB", "TINYBLOB"];

/// Types that cannot carry a DEFAULT clause (besides text and blob families).
const MYSQL_NO_DEFAULT_EXTRA: &[&str] = &["GEOMETRY", "JSON"];

/// Configured fallback types used by the translation rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefaults {
    pub integer_type: String,
    pub string_type: String,
    pub text_type: String,
}

impl Default for TypeDefaults {
    fn default() -> Self {
        Self {
            integer_type: "INT(11)".to_string(),
            string_type: "VARCHAR(255)".to_string(),
            text_type: "TEXT".to_string(),
        }
    }
}

impl From<&TransferConfig> for TypeDefaults {
    fn from(config: &TransferConfig) -> Self {
        Self {
            integer_type: config.integer_type.clone(),
            string_type: config.string_type.clone(),
            text_type: config.text_type.clone(),
        }
    }
}

/// A declared column type split into the parts the rules look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    /// Trimmed, upper-cased input.
    pub full: String,
    /// Everything before the first `(`, trimmed.
    pub base: String,
    /// Single numeric suffix such as `(11)`.
    pub length: Option<String>,
    /// Precision and scale suffix such as `(10,5)`.
    pub precision_scale: Option<String>,
    /// `UNSIGNED` appears as a word anywhere in the input.
    pub unsigned: bool,
}

impl DeclaredType {
    /// Tokenize a declared column type.
    pub fn parse(declared: &str) -> Result<Self> {
        let full = declared.trim().to_uppercase();
        let base = full.split('(').next().unwrap_or_default().trim().to_string();

        if !base.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(MigrateError::InvalidColumnType(declared.to_string()));
        }

        let (length, precision_scale) = parse_suffixes(&full);
        let unsigned = contains_unsigned(&full);

        Ok(Self {
            full,
            base,
            length,
            precision_scale,
            unsigned,
        })
    }

    fn base_starts_with(&self, prefixes: &[&str]) -> bool {
        prefixes.iter().any(|p| self.base.starts_with(p))
    }

    fn base_in(&self, set: &[&str]) -> bool {
        set.contains(&self.base.as_str())
    }

    fn length_or_empty(&self) -> &str {
        self.length.as_deref().unwrap_or("")
    }

    fn unsigned_suffix(&self) -> &'static str {
        if self.unsigned {
            " UNSIGNED"
        } else {
            ""
        }
    }
}

/// Find the first `(n)` and the first `(p,s)` group in a type string.
fn parse_suffixes(full: &str) -> (Option<String>, Option<String>) {
    let mut length = None;
    let mut precision_scale = None;
    let mut rest = full;

    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(')') else {
            break;
        };
        let inner: Vec<&str> = after[..close].split(',').map(str::trim).collect();
        let numeric = inner
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
        if numeric {
            match inner.as_slice() {
                [n] if length.is_none() => length = Some(format!("({})", n)),
                [p, s] if precision_scale.is_none() => {
                    precision_scale = Some(format!("({},{})", p, s))
                }
                _ => {}
            }
        }
        rest = &after[close + 1..];
    }

    (length, precision_scale)
}

/// Length-suffix helper.
///
/// Returns the parenthesized numeric suffix of `type_string` if present,
/// `(default)` when a default is given, and an empty string otherwise.
pub fn length_suffix(type_string: &str, default: Option<u32>) -> String {
    match parse_suffixes(&type_string.to_uppercase()).0 {
        Some(length) => length,
        None => default.map(|d| format!("({})", d)).unwrap_or_default(),
    }
}

/// Upper-cased keyword part of a type string (text before the first `(`).
pub fn base_keyword(type_string: &str) -> String {
    type_string
        .trim()
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_uppercase()
}

/// Keyword of a configured type with any `UNSIGNED` word removed.
fn keyword_without_unsigned(type_string: &str) -> String {
    base_keyword(type_string)
        .split_whitespace()
        .filter(|w| *w != "UNSIGNED")
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_unsigned(type_string: &str) -> bool {
    type_string
        .to_uppercase()
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .any(|w| w == "UNSIGNED")
}

/// True for TEXT-family type strings (compared on the keyword).
pub fn is_text_type(type_string: &str) -> bool {
    MYSQL_TEXT_TYPES.contains(&base_keyword(type_string).as_str())
}

/// True for TEXT-family or JSON type strings.
pub fn is_text_or_json_type(type_string: &str) -> bool {
    let base = base_keyword(type_string);
    base == "JSON" || MYSQL_TEXT_TYPES.contains(&base.as_str())
}

/// True for BLOB-family type strings.
pub fn is_blob_type(type_string: &str) -> bool {
    MYSQL_BLOB_TYPES.contains(&base_keyword(type_string).as_str())
}

/// True when a column of this translated type may carry a DEFAULT clause.
pub fn supports_default(type_string: &str) -> bool {
    let base = base_keyword(type_string);
    !(MYSQL_NO_DEFAULT_EXTRA.contains(&base.as_str())
        || MYSQL_TEXT_TYPES.contains(&base.as_str())
        || MYSQL_BLOB_TYPES.contains(&base.as_str()))
}

/// One translation rule.
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&DeclaredType) -> bool,
    pub apply: fn(&DeclaredType, &TypeDefaults) -> String,
}

/// Translation rules in priority order.
pub static RULES: &[Rule] = &[
    Rule {
        name: "text",
        matches: |t| t.base_in(&["TEXT", "CLOB", "STRING"]),
        apply: |_, d| d.text_type.clone(),
    },
    Rule {
        name: "character",
        matches: |t| t.base_in(&["CHARACTER", "NCHAR", "NATIVE CHARACTER"]),
        apply: |t, _| format!("CHAR{}", t.length_or_empty()),
    },
    Rule {
        name: "varchar",
        matches: |t| t.base_in(&["VARYING CHARACTER", "NVARCHAR", "VARCHAR"]),
        apply: |t, d| {
            let configured = d.string_type.trim().to_uppercase();
            if MYSQL_TEXT_TYPES.contains(&configured.as_str()) {
                return d.string_type.clone();
            }
            match &t.length {
                None => d.string_type.clone(),
                Some(length) => format!("{}{}", keyword_without_unsigned(&d.string_type), length),
            }
        },
    },
    Rule {
        name: "unsigned_big_int",
        matches: |t| t.base == "UNSIGNED BIG INT",
        apply: |t, _| format!("BIGINT{} UNSIGNED", t.length_or_empty()),
    },
    Rule {
        name: "tinyint",
        matches: |t| t.base_starts_with(&["TINYINT", "INT1"]),
        apply: |t, _| format!("TINYINT{}{}", t.length_or_empty(), t.unsigned_suffix()),
    },
    Rule {
        name: "smallint",
        matches: |t| t.base_starts_with(&["SMALLINT", "INT2"]),
        apply: |t, _| format!("SMALLINT{}{}", t.length_or_empty(), t.unsigned_suffix()),
    },
    Rule {
        name: "mediumint",
        matches: |t| t.base_starts_with(&["MEDIUMINT", "INT3"]),
        apply: |t, _| format!("MEDIUMINT{}{}", t.length_or_empty(), t.unsigned_suffix()),
    },
    Rule {
        name: "int4",
        matches: |t| t.base_starts_with(&["INT4"]),
        apply: |t, _| format!("INT{}{}", t.length_or_empty(), t.unsigned_suffix()),
    },
    Rule {
        name: "bigint",
        matches: |t| t.base_starts_with(&["BIGINT", "INT8"]),
        apply: |t, _| format!("BIGINT{}{}", t.length_or_empty(), t.unsigned_suffix()),
    },
    Rule {
        name: "int64_numeric",
        matches: |t| t.base_starts_with(&["INT64", "NUMERIC"]),
        apply: |t, _| match &t.precision_scale {
            Some(ps) if t.base == "NUMERIC" => format!("DECIMAL{}{}", ps, t.unsigned_suffix()),
            _ => format!(
                "BIGINT{}{}",
                t.length.as_deref().unwrap_or("(19)"),
                t.unsigned_suffix()
            ),
        },
    },
    Rule {
        name: "integer",
        matches: |t| t.base_starts_with(&["INTEGER", "INT"]),
        apply: |t, d| {
            let configured_unsigned = contains_unsigned(&d.integer_type);
            match &t.length {
                None if configured_unsigned => d.integer_type.clone(),
                None => format!("{}{}", d.integer_type, t.unsigned_suffix()),
                Some(length) => {
                    let keyword = keyword_without_unsigned(&d.integer_type);
                    if configured_unsigned || t.unsigned {
                        format!("{}{} UNSIGNED", keyword, length)
                    } else {
                        format!("{}{}", keyword, length)
                    }
                }
            }
        },
    },
    Rule {
        name: "boolean",
        matches: |t| t.base_in(&["BOOL", "BOOLEAN"]),
        apply: |_, _| "TINYINT(1)".to_string(),
    },
    Rule {
        name: "floating_point",
        matches: |t| t.base_starts_with(&["REAL", "DOUBLE", "FLOAT", "DECIMAL", "DEC", "FIXED"]),
        apply: |t, _| t.full.clone(),
    },
    Rule {
        name: "unknown",
        matches: |t| !t.base_in(MYSQL_COLUMN_TYPES),
        apply: |_, d| d.string_type.clone(),
    },
    Rule {
        name: "passthrough",
        matches: |_| true,
        apply: |t, _| t.full.clone(),
    },
];

/// Name of the first rule matching a tokenized type.
pub fn matching_rule(declared: &DeclaredType) -> &'static str {
    RULES
        .iter()
        .find(|rule| (rule.matches)(declared))
        .map(|rule| rule.name)
        .unwrap_or("passthrough")
}

/// Translate a declared SQLite column type into a MySQL column type.
pub fn translate(declared_type: &str, defaults: &TypeDefaults) -> Result<String> {
    let declared = DeclaredType::parse(declared_type)?;
    let translated = RULES
        .iter()
        .find(|rule| (rule.matches)(&declared))
        .map(|rule| (rule.apply)(&declared, defaults))
        .unwrap_or_else(|| declared.full.clone());
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> TypeDefaults {
        TypeDefaults::default()
    }

    fn tr(declared: &str) -> String {
        translate(declared, &defaults()).unwrap()
    }

    fn with(integer: &str, string: &str, text: &str) -> TypeDefaults {
        TypeDefaults {
            integer_type: integer.to_string(),
            string_type: string.to_string(),
            text_type: text.to_string(),
        }
    }

    // ==========================================================================
    // Tokenizer
    // ==========================================================================

    #[test]
    fn test_parse_declared_type() {
        let t = DeclaredType::parse("  unsigned big int(10) ").unwrap();
        assert_eq!(t.full, "UNSIGNED BIG INT(10)");
        assert_eq!(t.base, "UNSIGNED BIG INT");
        assert_eq!(t.length.as_deref(), Some("(10)"));
        assert_eq!(t.precision_scale, None);
        assert!(t.unsigned);
    }

    #[test]
    fn test_parse_precision_and_scale() {
        let t = DeclaredType::parse("decimal(10, 5) unsigned").unwrap();
        assert_eq!(t.base, "DECIMAL");
        assert_eq!(t.length, None);
        assert_eq!(t.precision_scale.as_deref(), Some("(10,5)"));
        assert!(t.unsigned);
    }

    #[test]
    fn test_parse_rejects_unparseable() {
        for bad in ["", "   ", "(10)", "(", "123"] {
            let err = DeclaredType::parse(bad).unwrap_err();
            assert!(matches!(err, MigrateError::InvalidColumnType(_)), "{:?}", bad);
        }
        assert!(translate("(255) VARCHAR", &defaults()).is_err());
    }

    #[test]
    fn test_unsigned_is_a_word_match() {
        assert!(!DeclaredType::parse("UNSIGNEDX").unwrap().unsigned);
        assert!(DeclaredType::parse("INT(5) UNSIGNED").unwrap().unsigned);
    }

    #[test]
    fn test_length_suffix_helper() {
        assert_eq!(length_suffix("VARCHAR(42)", None), "(42)");
        assert_eq!(length_suffix("TEXT", Some(255)), "(255)");
        assert_eq!(length_suffix("TEXT", None), "");
        assert_eq!(length_suffix("DECIMAL(10,5)", None), "");
    }

    #[test]
    fn test_matching_rule_order() {
        let rule = |s: &str| matching_rule(&DeclaredType::parse(s).unwrap());
        assert_eq!(rule("INT1"), "tinyint");
        assert_eq!(rule("INT8"), "bigint");
        assert_eq!(rule("INT64"), "int64_numeric");
        assert_eq!(rule("INTEGER"), "integer");
        assert_eq!(rule("NVARCHAR(10)"), "varchar");
        assert_eq!(rule("DOUBLE PRECISION"), "floating_point");
        assert_eq!(rule("META"), "unknown");
        assert_eq!(rule("DATETIME"), "passthrough");
    }

    // ==========================================================================
    // Rules
    // ==========================================================================

    #[test]
    fn test_text_family() {
        let d = with("INT(11)", "VARCHAR(255)", "MEDIUMTEXT");
        assert_eq!(translate("TEXT", &d).unwrap(), "MEDIUMTEXT");
        assert_eq!(translate("CLOB", &d).unwrap(), "MEDIUMTEXT");
        assert_eq!(translate("string", &d).unwrap(), "MEDIUMTEXT");
    }

    #[test]
    fn test_character_types() {
        assert_eq!(tr("CHARACTER"), "CHAR");
        assert_eq!(tr("CHARACTER(20)"), "CHAR(20)");
        assert_eq!(tr("NCHAR(55)"), "CHAR(55)");
        assert_eq!(tr("NATIVE CHARACTER(70)"), "CHAR(70)");
        assert_eq!(tr("CHAR(5)"), "CHAR(5)");
    }

    #[test]
    fn test_varchar_types() {
        assert_eq!(tr("VARCHAR"), "VARCHAR(255)");
        assert_eq!(tr("VARCHAR(42)"), "VARCHAR(42)");
        assert_eq!(tr("VARYING CHARACTER(255)"), "VARCHAR(255)");
        assert_eq!(tr("NVARCHAR(100)"), "VARCHAR(100)");

        let text_string = with("INT(11)", "MEDIUMTEXT", "TEXT");
        assert_eq!(translate("VARCHAR(42)", &text_string).unwrap(), "MEDIUMTEXT");

        let char_string = with("INT(11)", "CHAR(100)", "TEXT");
        assert_eq!(translate("VARCHAR", &char_string).unwrap(), "CHAR(100)");
        assert_eq!(translate("VARCHAR(12)", &char_string).unwrap(), "CHAR(12)");
    }

    #[test]
    fn test_unsigned_big_int() {
        assert_eq!(tr("UNSIGNED BIG INT"), "BIGINT UNSIGNED");
        assert_eq!(tr("UNSIGNED BIG INT(10)"), "BIGINT(10) UNSIGNED");
    }

    #[test]
    fn test_sized_integer_aliases() {
        let cases = [
            ("TINYINT", "TINYINT"),
            ("TINYINT(4) UNSIGNED", "TINYINT(4) UNSIGNED"),
            ("INT1(3)", "TINYINT(3)"),
            ("SMALLINT UNSIGNED", "SMALLINT UNSIGNED"),
            ("INT2(6) UNSIGNED", "SMALLINT(6) UNSIGNED"),
            ("MEDIUMINT(9)", "MEDIUMINT(9)"),
            ("INT3 UNSIGNED", "MEDIUMINT UNSIGNED"),
            ("INT4", "INT"),
            ("INT4(11) UNSIGNED", "INT(11) UNSIGNED"),
            ("BIGINT(20)", "BIGINT(20)"),
            ("INT8 UNSIGNED", "BIGINT UNSIGNED"),
            ("INT8(19)", "BIGINT(19)"),
        ];
        for (input, expected) in cases {
            assert_eq!(tr(input), expected, "translating {}", input);
        }
    }

    #[test]
    fn test_int64_and_numeric() {
        assert_eq!(tr("INT64"), "BIGINT(19)");
        assert_eq!(tr("NUMERIC"), "BIGINT(19)");
        assert_eq!(tr("NUMERIC(5)"), "BIGINT(5)");
        assert_eq!(tr("NUMERIC UNSIGNED"), "BIGINT(19) UNSIGNED");
        assert_eq!(tr("NUMERIC(10,5)"), "DECIMAL(10,5)");
    }

    #[test]
    fn test_integer_uses_configured_type() {
        assert_eq!(tr("INTEGER"), "INT(11)");
        assert_eq!(tr("INT"), "INT(11)");
        assert_eq!(tr("INTEGER(7)"), "INT(7)");
        assert_eq!(tr("INT UNSIGNED"), "INT(11) UNSIGNED");
        assert_eq!(tr("INT(5) UNSIGNED"), "INT(5) UNSIGNED");

        let big = with("BIGINT(19)", "VARCHAR(255)", "TEXT");
        assert_eq!(translate("INTEGER", &big).unwrap(), "BIGINT(19)");
        assert_eq!(translate("INT(8)", &big).unwrap(), "BIGINT(8)");
    }

    #[test]
    fn test_integer_with_unsigned_configured_type() {
        let d = with("BIGINT(20) UNSIGNED", "VARCHAR(255)", "TEXT");
        assert_eq!(translate("INTEGER", &d).unwrap(), "BIGINT(20) UNSIGNED");
        assert_eq!(translate("INT UNSIGNED", &d).unwrap(), "BIGINT(20) UNSIGNED");
        assert_eq!(translate("INT(10)", &d).unwrap(), "BIGINT(10) UNSIGNED");

        let bare = with("INT UNSIGNED", "VARCHAR(255)", "TEXT");
        assert_eq!(translate("INTEGER(4)", &bare).unwrap(), "INT(4) UNSIGNED");
    }

    #[test]
    fn test_boolean() {
        assert_eq!(tr("BOOL"), "TINYINT(1)");
        assert_eq!(tr("boolean"), "TINYINT(1)");
    }

    #[test]
    fn test_floating_point_kept_verbatim() {
        let cases = [
            "DOUBLE",
            "DOUBLE PRECISION",
            "DOUBLE PRECISION(10,5) UNSIGNED",
            "DECIMAL(10,5)",
            "REAL UNSIGNED",
            "FLOAT(10,5)",
            "DEC(10,5)",
            "FIXED UNSIGNED",
        ];
        for input in cases {
            assert_eq!(tr(input), input);
        }
        assert_eq!(tr("double precision"), "DOUBLE PRECISION");
    }

    #[test]
    fn test_unknown_types_fall_back_to_string_type() {
        for input in ["META", "FOO", "BAR(12)", "GEOGRAPHY"] {
            assert_eq!(tr(input), "VARCHAR(255)");
        }
    }

    #[test]
    fn test_known_types_pass_through() {
        for input in ["DATETIME", "DATE", "TIMESTAMP", "BLOB", "JSON", "VARBINARY(16)", "YEAR"] {
            assert_eq!(tr(input), input);
        }
        assert_eq!(tr("mediumblob"), "MEDIUMBLOB");
    }

    #[test]
    fn test_translation_is_deterministic() {
        let d = with("BIGINT(19)", "CHAR(64)", "LONGTEXT");
        for input in ["TEXT", "VARCHAR(3)", "INT UNSIGNED", "NUMERIC(4,2)", "WHATEVER"] {
            assert_eq!(translate(input, &d).unwrap(), translate(input, &d).unwrap());
        }
    }

    // ==========================================================================
    // Families
    // ==========================================================================

    #[test]
    fn test_type_families() {
        assert!(is_text_type("MEDIUMTEXT"));
        assert!(!is_text_type("JSON"));
        assert!(is_text_or_json_type("JSON"));
        assert!(is_blob_type("TINYBLOB"));
        assert!(!is_blob_type("VARBINARY(16)"));
    }

    #[test]
    fn test_supports_default() {
        assert!(supports_default("INT(11)"));
        assert!(supports_default("VARCHAR(255)"));
        assert!(!supports_default("TEXT"));
        assert!(!supports_default("LONGBLOB"));
        assert!(!supports_default("JSON"));
        assert!(!supports_default("GEOMETRY"));
    }
}
