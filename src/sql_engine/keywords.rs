//! Keyword tables used by the lexer and the table extractor

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Keywords after which a table reference is expected
pub const PRECEDES_TABLE_NAME: &[&str] = &["FROM", "JOIN", "DESC", "DESCRIBE", "WITH"];

/// Keywords marking a set-operation boundary between SELECT branches
pub const RESULT_OPERATIONS: &[&str] = &["UNION", "INTERSECT", "EXCEPT", "SELECT"];

pub const ON_KEYWORD: &str = "ON";

/// Keywords that end a WHERE clause
pub const WHERE_CLOSE: &[&str] = &[
    "ORDER BY",
    "GROUP BY",
    "LIMIT",
    "HAVING",
    "UNION",
    "UNION ALL",
    "EXCEPT",
    "INTERSECT",
    "INTO",
];

/// Multi-word keywords collapsed into a single keyword token.
/// Longer sequences come first so `LEFT OUTER JOIN` wins over `LEFT JOIN`.
pub const COMPOUND_KEYWORDS: &[&[&str]] = &[
    &["LEFT", "OUTER", "JOIN"],
    &["RIGHT", "OUTER", "JOIN"],
    &["FULL", "OUTER", "JOIN"],
    &["LEFT", "JOIN"],
    &["RIGHT", "JOIN"],
    &["FULL", "JOIN"],
    &["INNER", "JOIN"],
    &["CROSS", "JOIN"],
    &["NATURAL", "JOIN"],
    &["GROUP", "BY"],
    &["ORDER", "BY"],
    &["PARTITION", "BY"],
    &["UNION", "ALL"],
];

// Anything not listed here lexes as a name and keeps its original casing.
static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CREATE", "CROSS",
        "DELETE", "DESC", "DESCRIBE", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXISTS",
        "EXPLAIN", "FALSE", "FROM", "FULL", "GROUP", "HAVING", "IF", "ILIKE", "IN", "INNER",
        "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "LATERAL", "LEFT", "LIKE", "LIMIT",
        "MERGE", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "OVER",
        "OVERWRITE", "PARTITION", "RECURSIVE", "REPLACE", "RIGHT", "SELECT", "SET", "SHOW",
        "TABLE", "TEMP", "TEMPORARY", "THEN", "TRUE", "TRUNCATE", "UNION", "UPDATE", "USE",
        "USING", "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
    ]
    .into_iter()
    .collect()
});

/// Returns true if the (unquoted) word is treated as a SQL keyword
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word.to_ascii_uppercase().as_str())
}

/// Substring match against [`PRECEDES_TABLE_NAME`]; `value` must already be uppercase
pub fn precedes_table_name(value: &str) -> bool {
    PRECEDES_TABLE_NAME
        .iter()
        .any(|keyword| value.contains(keyword))
}

/// Substring match against [`RESULT_OPERATIONS`]
pub fn is_result_operation(keyword: &str) -> bool {
    let upper = keyword.to_uppercase();
    RESULT_OPERATIONS
        .iter()
        .any(|operation| upper.contains(operation))
}

/// Exact match against [`WHERE_CLOSE`]; inner whitespace of compound
/// keywords is collapsed first
pub fn closes_where(keyword: &str) -> bool {
    let normalized = keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    WHERE_CLOSE.contains(&normalized.as_str())
}
