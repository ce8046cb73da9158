//! # Default Prompt Templates
//!
//! Placeholders are written as `{name}` and filled with `str::replace`.

/// The system instruction for query generation.
///
/// Placeholders: `{dialect}`, `{db_name}`, `{context}`
pub const QUERY_GENERATION_SYSTEM_PROMPT: &str = r#"You are a {dialect} expert for the `{db_name}` database. You translate an operator's question into a single read-only query.

{context}"#;

/// Appended to the system instruction when a previous attempt returned nothing.
pub const CORRECTION_SYSTEM_ADDENDUM: &str = r#"# Correction
A previous attempt returned zero rows. The user turn contains evidence gathered from the live data about why. Use the attribute names and stored values it lists exactly as written, and do not repeat the failed conditions."#;

/// The user turn for a first attempt.
///
/// Placeholders: `{question}`, `{final_instruction}`
pub const QUERY_GENERATION_USER_PROMPT: &str = r#"{question}

{final_instruction}"#;

/// The user turn for a correction attempt.
///
/// Placeholders: `{evidence}`, `{final_instruction}`
pub const CORRECTION_USER_PROMPT: &str = r#"{evidence}

{final_instruction}"#;

/// Closes every user turn.
///
/// Placeholders: `{dialect}`
pub const FINAL_INSTRUCTION: &str = "Respond with exactly one raw {dialect} SELECT statement. Do not add explanations, prose, or markdown code fences.";

/// Generation constraints that end the context.
///
/// Placeholders: `{prefix}`
pub const QUERY_CONSTRUCTION_RULES: &str = r#"# Query Construction Rules
1. Write exactly one SELECT statement. Never write INSERT, UPDATE, DELETE, DROP, ALTER, CREATE, TRUNCATE, REPLACE, GRANT, REVOKE, EXEC, EXECUTE, CALL, LOCK or UNLOCK, and never chain statements with `;`.
2. Every table name carries the `{prefix}` prefix. Use only tables and columns listed above.
3. Sparse attributes are rows in the meta tables: filter with `meta_key = '<name>'` and compare `meta_value`. Use attribute names exactly as listed under the discovered attributes.
4. For boolean-like attributes, compare `meta_value` with the stored checked value shown in the samples; do not assume `1` or `yes`.
5. Join meta rows to their owner through the relationships listed above (for example `{prefix}usermeta.user_id = {prefix}users.ID`).
6. For counting questions use `COUNT(*)` or `COUNT(DISTINCT ...)` with a descriptive alias. Otherwise add `LIMIT 100`.
7. Do not format values in the query; return raw numbers and dates."#;
