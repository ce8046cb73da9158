//! # SQLite Specific SQL Queries
//!
//! This module centralizes SQL query strings for the SQLite provider and the
//! discovery engine. All user-derived input is bound as a parameter.

/// Lists user tables, skipping SQLite's internal ones.
pub const LIST_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

/// Lists the indexes of one table. Expects the table name as `?1`.
pub const LIST_INDEXES: &str =
    "SELECT name, sql FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 ORDER BY name";

/// Returns the query that finds attribute names containing a term in a side
/// key-value table. Expects the `%term%` pattern as `?1`, with `\` escaping
/// literal wildcards.
pub fn discover_meta_keys(meta_table: &str, limit: usize) -> String {
    format!(
        "SELECT meta_key, COUNT(*) AS occurrences
         FROM {meta_table}
         WHERE LOWER(meta_key) LIKE ?1 ESCAPE '\\'
         GROUP BY meta_key
         ORDER BY occurrences DESC, meta_key ASC
         LIMIT {limit}"
    )
}

/// Returns the query that samples distinct values of one attribute, most
/// frequent first. Expects the attribute name as `?1`.
pub fn sample_meta_values(meta_table: &str, limit: usize) -> String {
    format!(
        "SELECT meta_value, COUNT(*) AS occurrences
         FROM {meta_table}
         WHERE meta_key = ?1
         GROUP BY meta_value
         ORDER BY occurrences DESC, meta_value ASC
         LIMIT {limit}"
    )
}

/// Returns the query that counts all and non-empty rows of one attribute.
/// Expects the attribute name as `?1`.
pub fn count_meta_rows(meta_table: &str) -> String {
    format!(
        "SELECT COUNT(*) AS total_rows,
                SUM(CASE WHEN meta_value IS NOT NULL AND meta_value <> '' THEN 1 ELSE 0 END) AS non_empty_rows
         FROM {meta_table}
         WHERE meta_key = ?1"
    )
}

/// Returns the query listing distinct attribute names of a side table.
pub fn list_meta_keys(meta_table: &str, limit: usize) -> String {
    format!(
        "SELECT meta_key, COUNT(*) AS occurrences
         FROM {meta_table}
         GROUP BY meta_key
         ORDER BY occurrences DESC, meta_key ASC
         LIMIT {limit}"
    )
}
