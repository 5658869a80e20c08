//! SQLite view definitions rewritten as MySQL views.
//!
//! The stored `CREATE VIEW` statement is parsed with the SQLite dialect and
//! the query is rendered back for MySQL:
//!
//! - identifiers are backtick-quoted and table names go through
//!   [`safe_identifier`], matching the tables created earlier in the run
//! - `datetime('now')`, `date('now')`, `time('now')` become `CURRENT_*()`
//!   (`UTC_*()` with the `'utc'` modifier)
//! - `strftime(fmt, x)` becomes `DATE_FORMAT(x, fmt)`
//! - `a || b` becomes `CONCAT(a, b)`

use std::ops::ControlFlow;

use sqlparser::ast::{
    visit_expressions_mut, visit_relations_mut, BinaryOperator, Expr, Function, FunctionArg,
    FunctionArgExpr, FunctionArguments, Ident, Query, SelectItem, SetExpr, Statement,
    TableFactor, TableWithJoins, Value,
};
use sqlparser::dialect::{MySqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use crate::core::identifier::{quote_mysql, safe_identifier};
use crate::dialect::functions::{is_utc_modifier, mysql_date_format, Clock};
use crate::error::{MigrateError, Result};

/// Translate a SQLite `CREATE VIEW` statement into
/// `CREATE OR REPLACE VIEW` for MySQL.
pub fn translate_view(name: &str, sqlite_sql: &str) -> Result<String> {
    let failed = |message: String| MigrateError::schema(name, message);

    let mut statements = Parser::parse_sql(&SQLiteDialect {}, sqlite_sql)
        .map_err(|e| failed(format!("unable to parse view definition: {}", e)))?;
    if statements.len() != 1 {
        return Err(failed(format!(
            "expected one statement in view definition, found {}",
            statements.len()
        )));
    }

    let Statement::CreateView { query, columns, .. } = statements.remove(0) else {
        return Err(failed("view definition is not a CREATE VIEW statement".to_string()));
    };
    let mut query = query;

    quote_identifiers(&mut query);
    if let ControlFlow::Break(e) = visit_expressions_mut(&mut *query, |expr| {
        match rewrite_expr(expr) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => ControlFlow::Break(e),
        }
    }) {
        return Err(failed(e));
    }

    let column_list = if columns.is_empty() {
        String::new()
    } else {
        let names = columns
            .iter()
            .map(|c| quote_mysql(&safe_identifier(&c.name.value)))
            .collect::<Result<Vec<_>>>()?;
        format!(" ({})", names.join(", "))
    };

    Ok(format!(
        "CREATE OR REPLACE VIEW {}{} AS {}",
        quote_mysql(&safe_identifier(name))?,
        column_list,
        query
    ))
}

fn backtick(ident: &mut Ident) {
    ident.quote_style = Some('`');
}

/// Backtick every column reference, alias and table name.
fn quote_identifiers(query: &mut Query) {
    let _ = visit_relations_mut(query, |relation| {
        for part in &mut relation.0 {
            part.value = safe_identifier(&part.value);
            backtick(part);
        }
        ControlFlow::<()>::Continue(())
    });
    let _ = visit_expressions_mut(query, |expr| {
        match expr {
            Expr::Identifier(ident) => backtick(ident),
            Expr::CompoundIdentifier(idents) => idents.iter_mut().for_each(backtick),
            _ => {}
        }
        ControlFlow::<()>::Continue(())
    });
    quote_aliases(&mut query.body);
}

fn quote_aliases(body: &mut SetExpr) {
    match body {
        SetExpr::Select(select) => {
            for item in &mut select.projection {
                if let SelectItem::ExprWithAlias { alias, .. } = item {
                    backtick(alias);
                }
            }
            select.from.iter_mut().for_each(quote_table_aliases);
        }
        SetExpr::Query(query) => quote_aliases(&mut query.body),
        SetExpr::SetOperation { left, right, .. } => {
            quote_aliases(left);
            quote_aliases(right);
        }
        _ => {}
    }
}

fn quote_table_aliases(table: &mut TableWithJoins) {
    let joined = table.joins.iter_mut().map(|j| &mut j.relation);
    let factors = std::iter::once(&mut table.relation).chain(joined);
    for factor in factors {
        match factor {
            TableFactor::Table {
                alias: Some(alias), ..
            } => backtick(&mut alias.name),
            TableFactor::Derived {
                subquery,
                alias,
                ..
            } => {
                quote_aliases(&mut subquery.body);
                if let Some(alias) = alias {
                    backtick(&mut alias.name);
                }
            }
            _ => {}
        }
    }
}

/// Replace SQLite-only functions and operators in place.
fn rewrite_expr(expr: &mut Expr) -> std::result::Result<(), String> {
    let replacement = match expr {
        Expr::Function(function) => rewrite_function(function)?,
        Expr::BinaryOp {
            left,
            op: BinaryOperator::StringConcat,
            right,
        } => Some(format!("CONCAT({}, {})", left, right)),
        _ => None,
    };

    if let Some(sql) = replacement {
        *expr = Parser::new(&MySqlDialect {})
            .try_with_sql(&sql)
            .and_then(|mut parser| parser.parse_expr())
            .map_err(|e| format!("unable to render {}: {}", sql, e))?;
    }
    Ok(())
}

/// MySQL text for a SQLite date/time function call, `None` when the call
/// needs no change.
fn rewrite_function(function: &Function) -> std::result::Result<Option<String>, String> {
    let Some(name) = function.name.0.last().map(|i| i.value.to_lowercase()) else {
        return Ok(None);
    };
    let args = unnamed_args(function);

    if let Some(clock) = Clock::from_sqlite_function(&name) {
        if args.first().and_then(|a| string_literal(a)).is_some_and(is_now) {
            let modifier = now_modifier(&name, &args[1..])?;
            return Ok(Some(format!("{}()", clock.mysql_function(is_utc_modifier(modifier)))));
        }
        return Ok(None);
    }

    if name == "strftime" {
        let format = args
            .first()
            .and_then(|a| string_literal(a))
            .ok_or_else(|| "strftime needs a literal format".to_string())?;
        let mysql_format = mysql_date_format(format)
            .ok_or_else(|| format!("strftime format '{}' has no MySQL equivalent", format))?;
        let Some(&value) = args.get(1) else {
            return Err("strftime needs a time value".to_string());
        };

        let source = if string_literal(value).is_some_and(is_now) {
            let modifier = now_modifier(&name, &args[2..])?;
            format!("{}()", Clock::Timestamp.mysql_function(is_utc_modifier(modifier)))
        } else if args.len() == 2 {
            value.to_string()
        } else {
            return Err("strftime modifiers are only supported with 'now'".to_string());
        };

        return Ok(Some(format!(
            "DATE_FORMAT({}, '{}')",
            source,
            mysql_format.replace('\'', "''")
        )));
    }

    Ok(None)
}

fn unnamed_args(function: &Function) -> Vec<&Expr> {
    let FunctionArguments::List(list) = &function.args else {
        return Vec::new();
    };
    list.args
        .iter()
        .filter_map(|arg| match arg {
            FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => Some(expr),
            _ => None,
        })
        .collect()
}

fn string_literal(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Value(Value::SingleQuotedString(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn is_now(value: &str) -> bool {
    value.eq_ignore_ascii_case("now")
}

/// The single `'utc'`/`'localtime'` modifier following `'now'`, if any.
fn now_modifier<'a>(
    function: &str,
    rest: &[&'a Expr],
) -> std::result::Result<Option<&'a str>, String> {
    match rest {
        [] => Ok(None),
        [modifier] => match string_literal(*modifier) {
            Some(m) if m.eq_ignore_ascii_case("utc") || m.eq_ignore_ascii_case("localtime") => {
                Ok(Some(m))
            }
            _ => Err(format!("unsupported {} modifier {}", function, modifier)),
        },
        _ => Err(format!("unsupported {} modifiers", function)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_view() {
        let sql = translate_view(
            "active_users",
            "CREATE VIEW active_users AS SELECT id, \"name\" FROM users WHERE active = 1",
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE OR REPLACE VIEW `active_users` AS \
             SELECT `id`, `name` FROM `users` WHERE `active` = 1"
        );
    }

    #[test]
    fn test_column_list_and_aliases() {
        let sql = translate_view(
            "totals",
            "CREATE VIEW totals (username, total) AS \
             SELECT u.name, SUM(o.qty) AS \"sum\" \
             FROM users AS u JOIN orders o ON o.user_id = u.id GROUP BY u.name",
        )
        .unwrap();
        assert!(sql.starts_with("CREATE OR REPLACE VIEW `totals` (`username`, `total`) AS SELECT"));
        assert!(sql.contains("`u`.`name`"));
        assert!(sql.contains("SUM(`o`.`qty`) AS `sum`"));
        assert!(sql.contains("FROM `users` AS `u`"), "{}", sql);
        assert!(sql.contains("JOIN `orders` AS `o` ON `o`.`user_id` = `u`.`id`"), "{}", sql);
    }

    #[test]
    fn test_now_functions() {
        let sql = translate_view(
            "stamps",
            "CREATE VIEW stamps AS SELECT datetime('now') AS a, date('now', 'utc') AS b, \
             time('now', 'localtime') AS c FROM t",
        )
        .unwrap();
        assert!(sql.contains("CURRENT_TIMESTAMP() AS `a`"), "{}", sql);
        assert!(sql.contains("UTC_DATE() AS `b`"), "{}", sql);
        assert!(sql.contains("CURRENT_TIME() AS `c`"), "{}", sql);
    }

    #[test]
    fn test_strftime_and_concat() {
        let sql = translate_view(
            "labels",
            "CREATE VIEW labels AS SELECT first_name || ' ' || last_name AS full_name, \
             strftime('%Y-%m', created) AS ym, strftime('%H:%M', 'now') AS now_hm FROM people",
        )
        .unwrap();
        assert!(
            sql.contains("CONCAT(CONCAT(`first_name`, ' '), `last_name`) AS `full_name`"),
            "{}",
            sql
        );
        assert!(sql.contains("DATE_FORMAT(`created`, '%Y-%m') AS `ym`"), "{}", sql);
        assert!(
            sql.contains("DATE_FORMAT(CURRENT_TIMESTAMP(), '%H:%i') AS `now_hm`"),
            "{}",
            sql
        );
    }

    #[test]
    fn test_long_names_are_truncated() {
        let long = "v".repeat(70);
        let table = "t".repeat(70);
        let definition = format!("CREATE VIEW {} AS SELECT a FROM {}", long, table);
        let sql = translate_view(&long, &definition).unwrap();
        assert!(sql.starts_with(&format!("CREATE OR REPLACE VIEW `{}` AS", "v".repeat(64))));
        assert!(sql.ends_with(&format!("FROM `{}`", "t".repeat(64))));
    }

    #[test]
    fn test_untranslatable_views() {
        assert!(translate_view("v", "CREATE VIEW v AS SELEC nothing").is_err());
        assert!(translate_view("v", "CREATE TABLE v (a INTEGER)").is_err());
        let err = translate_view(
            "v",
            "CREATE VIEW v AS SELECT strftime('%s', 'now') AS epoch FROM t",
        )
        .unwrap_err();
        assert!(matches!(err, MigrateError::Schema { .. }));
    }
}
