//! Statement preparation before submission.
//!
//! Uses the sqlparser tokenizer to find the leading keyword of a statement
//! (skipping whitespace and comments), and wraps ordinary queries in an
//! outer `LIMIT` so the engine itself stops early.

use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Statements that cannot be used as a subquery.
const NON_WRAPPABLE: &[&str] = &[
    "SHOW", "DESCRIBE", "EXPLAIN", "MSCK", "USE", "SET", "CREATE", "DROP", "ALTER", "INSERT",
    "UPDATE", "DELETE",
];

/// Alias given to the wrapped statement.
const WRAP_ALIAS: &str = "_q";

/// Removes surrounding whitespace and a single trailing `;`.
fn strip_terminator(sql: &str) -> &str {
    let trimmed = sql.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim()
}

/// Skips leading whitespace, `--` line comments and `/* */` block comments.
fn skip_leading_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.split_once('\n').map_or("", |(_, after)| after);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.split_once("*/").map_or("", |(_, after)| after);
        } else {
            return sql;
        }
    }
}

/// Returns the first keyword of `sql`, upper-cased.
///
/// Leading whitespace and comments are skipped. Falls back to a plain scan
/// when the tokenizer rejects the input (unterminated strings and the like).
pub fn leading_keyword(sql: &str) -> Option<String> {
    let dialect = GenericDialect {};
    match Tokenizer::new(&dialect, sql).tokenize() {
        Ok(tokens) => tokens.into_iter().find_map(|token| match token {
            Token::Whitespace(_) => None,
            Token::Word(word) if word.quote_style.is_none() => {
                Some(Some(word.value.to_ascii_uppercase()))
            }
            _ => Some(None),
        })?,
        Err(_) => {
            let word: String = skip_leading_comments(sql)
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            (!word.is_empty()).then(|| word.to_ascii_uppercase())
        }
    }
}

/// Returns true if `sql` can safely be wrapped in an outer `SELECT`.
pub fn is_wrappable(sql: &str) -> bool {
    match leading_keyword(strip_terminator(sql)) {
        Some(keyword) => !NON_WRAPPABLE.contains(&keyword.as_str()),
        None => true,
    }
}

/// Wraps `sql` in `SELECT * FROM (...) AS _q LIMIT <limit>`.
///
/// Each part sits on its own line so a trailing `--` comment in the
/// original cannot swallow the closing parenthesis.
pub fn wrap_with_limit(sql: &str, limit: usize) -> String {
    format!(
        "SELECT * FROM (\n{}\n) AS {WRAP_ALIAS}\nLIMIT {limit}",
        strip_terminator(sql)
    )
}

/// Returns the text to submit for `sql` under an optional server-side cap.
///
/// Without a cap, or for statements that cannot be wrapped, the text is
/// returned unmodified.
pub fn prepare_statement(sql: &str, server_cap: Option<usize>) -> String {
    match server_cap {
        Some(limit) if is_wrappable(sql) => wrap_with_limit(sql, limit),
        _ => sql.to_string(),
    }
}
