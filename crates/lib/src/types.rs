//! # Core Data Types
//!
//! The records exchanged between pipeline stages. All of them are built fresh
//! per request and never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

// --- Schema ---

/// The role a column plays in the table's keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyRole {
    #[default]
    None,
    Primary,
    Indexed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
    pub key_role: KeyRole,
    pub default: Option<String>,
    pub extra: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    /// Always names a column present in `columns` when set.
    pub primary_key: Option<String>,
    pub indexes: Vec<IndexInfo>,
    pub row_count: u64,
    pub engine: String,
    pub charset: String,
    pub sample_row: Option<BTreeMap<String, String>>,
}

impl TableInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Inferred,
}

/// A foreign-key-like link guessed from column naming. A hint only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub database_name: String,
    pub table_prefix: String,
    pub tables: BTreeMap<String, TableInfo>,
    pub core_table_names: BTreeSet<String>,
    pub custom_table_names: BTreeSet<String>,
    pub relationships: Vec<Relationship>,
    pub table_descriptions: BTreeMap<String, String>,
}

impl SchemaSnapshot {
    /// Looks up a table by its unprefixed name (e.g. `usermeta`).
    pub fn table(&self, short_name: &str) -> Option<&TableInfo> {
        self.tables
            .get(&format!("{}{short_name}", self.table_prefix))
    }

    pub fn prefixed(&self, short_name: &str) -> String {
        format!("{}{short_name}", self.table_prefix)
    }
}

// --- Discovery ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredAttribute {
    pub key_name: String,
    pub occurrence_count: u64,
    pub matched_search_term: String,
}

/// Discovered attributes grouped by source side-table (`usermeta`, `postmeta`).
pub type Discovery = BTreeMap<String, Vec<DiscoveredAttribute>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSample {
    pub value: String,
    pub count: u64,
    pub length: usize,
}

/// Value profiles keyed by `profile_key`. The same attribute name stored in
/// both side tables keeps one profile per table.
pub type ValueProfiles = BTreeMap<String, ValueProfile>;

pub fn profile_key(source: &str, key_name: &str) -> String {
    format!("{source}.{key_name}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueProfile {
    pub key_name: String,
    pub source_table: String,
    pub value_samples: Vec<ValueSample>,
    pub total_row_count: u64,
    pub non_empty_row_count: u64,
    pub detected_patterns: BTreeMap<String, Vec<String>>,
}

impl ValueProfile {
    pub fn affirmative_values(&self) -> &[String] {
        self.detected_patterns
            .get(crate::constants::AFFIRMATIVE_PATTERN)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_value(&self, value: &str) -> bool {
        self.value_samples
            .iter()
            .any(|s| s.value.eq_ignore_ascii_case(value))
    }
}

// --- Conversation ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

// --- Troubleshooting ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugReport {
    pub query: String,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub corrected: bool,
}

// --- Execution ---

/// One result row, preserving column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row(pub Vec<(String, Value)>);

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    /// Renders every value as a string; NULL becomes an empty string.
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value_to_string(value)))
            .collect()
    }
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// --- Request / outcome ---

/// An inbound question with its caller-supplied history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryTrace {
    pub search_terms: Vec<String>,
    pub discovered_attributes: Discovery,
    pub value_samples: ValueProfiles,
}

/// The result of one pass through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    pub sql_query: String,
    pub rows: Vec<Row>,
    pub discovery_trace: DiscoveryTrace,
    pub debug_report: Option<DebugReport>,
}
