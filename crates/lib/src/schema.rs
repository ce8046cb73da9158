//! # Schema Inspector
//!
//! Builds a `SchemaSnapshot` of every table carrying the deployment's prefix:
//! columns, indexes, row counts, storage details, a truncated sample row and
//! relationships guessed from `<word>_id` column names.

use crate::{
    constants::{CORE_TABLE_NAMES, MAX_SAMPLE_COLUMNS, MAX_SAMPLE_VALUE_CHARS},
    errors::PromptError,
    providers::db::storage::Storage,
    types::{
        value_to_string, Confidence, KeyRole, Relationship, SchemaSnapshot, TableInfo,
    },
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Target column used when the referenced table has no detectable primary key.
const CONVENTIONAL_PRIMARY_KEY: &str = "ID";

/// Enumerates the catalog and builds a snapshot. Only reads; issues a fixed
/// number of round trips per table.
pub async fn inspect(storage: &dyn Storage, table_prefix: &str) -> Result<SchemaSnapshot, PromptError> {
    let table_names = storage.list_tables().await.map_err(|e| match e {
        PromptError::StorageConnection(msg) => PromptError::StorageConnection(msg),
        other => PromptError::StorageConnection(other.to_string()),
    })?;

    let mut snapshot = SchemaSnapshot {
        database_name: storage.database_name().to_string(),
        table_prefix: table_prefix.to_string(),
        ..Default::default()
    };

    for name in table_names.into_iter().filter(|n| n.starts_with(table_prefix)) {
        let table = inspect_table(storage, &name).await?;
        let short_name = &name[table_prefix.len()..];
        if CORE_TABLE_NAMES.contains(&short_name) {
            snapshot.core_table_names.insert(name.clone());
        } else {
            snapshot.custom_table_names.insert(name.clone());
        }
        snapshot
            .table_descriptions
            .insert(name.clone(), describe_table(&table));
        snapshot.tables.insert(name, table);
    }

    snapshot.relationships = infer_relationships(&snapshot.tables, table_prefix);
    info!(
        tables = snapshot.tables.len(),
        core = snapshot.core_table_names.len(),
        custom = snapshot.custom_table_names.len(),
        relationships = snapshot.relationships.len(),
        "Schema inspected."
    );
    Ok(snapshot)
}

async fn inspect_table(storage: &dyn Storage, name: &str) -> Result<TableInfo, PromptError> {
    let mut columns = storage.table_columns(name).await?;
    let indexes = storage.table_indexes(name).await?;
    let row_count = storage.count_rows(name).await?;
    let (engine, charset) = storage.table_status(name).await?;

    for column in columns.iter_mut() {
        if column.key_role == KeyRole::None
            && indexes.iter().any(|idx| idx.columns.contains(&column.name))
        {
            column.key_role = KeyRole::Indexed;
        }
    }

    let primary_key = columns
        .iter()
        .find(|c| c.key_role == KeyRole::Primary)
        .map(|c| c.name.clone());

    let sample_columns: Vec<String> = columns
        .iter()
        .take(MAX_SAMPLE_COLUMNS)
        .map(|c| c.name.clone())
        .collect();
    let sample_row = storage
        .sample_row(name, &sample_columns)
        .await?
        .map(|row| {
            row.0
                .iter()
                .map(|(col, value)| (col.clone(), truncate_value(&value_to_string(value))))
                .collect::<BTreeMap<_, _>>()
        });

    debug!(table = %name, columns = columns.len(), row_count, "Inspected table.");
    Ok(TableInfo {
        name: name.to_string(),
        columns,
        primary_key,
        indexes,
        row_count,
        engine,
        charset,
        sample_row,
    })
}

/// Truncates a sample value to the display limit, appending an ellipsis.
pub fn truncate_value(value: &str) -> String {
    if value.chars().count() > MAX_SAMPLE_VALUE_CHARS {
        let mut truncated: String = value.chars().take(MAX_SAMPLE_VALUE_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        value.to_string()
    }
}

fn describe_table(table: &TableInfo) -> String {
    format!(
        "{} columns, {} rows, {} indexes",
        table.columns.len(),
        table.row_count,
        table.indexes.len()
    )
}

/// Guesses relationships from `<word>_id` columns. A column links to
/// `<prefix><word>` (or the plural `<prefix><word>s`) when such a table
/// exists. The result is a naming heuristic, never a verified constraint.
pub fn infer_relationships(
    tables: &BTreeMap<String, TableInfo>,
    table_prefix: &str,
) -> Vec<Relationship> {
    let mut relationships = Vec::new();
    for table in tables.values() {
        for column in &table.columns {
            let lower = column.name.to_lowercase();
            let Some(word) = lower.strip_suffix("_id") else {
                continue;
            };
            if word.is_empty() {
                continue;
            }
            let candidates = [
                format!("{table_prefix}{word}"),
                format!("{table_prefix}{word}s"),
            ];
            let Some(target) = candidates
                .iter()
                .find_map(|candidate| tables.get(candidate))
            else {
                continue;
            };
            if target.name == table.name {
                continue;
            }
            relationships.push(Relationship {
                from_table: table.name.clone(),
                from_column: column.name.clone(),
                to_table: target.name.clone(),
                to_column: target
                    .primary_key
                    .clone()
                    .unwrap_or_else(|| CONVENTIONAL_PRIMARY_KEY.to_string()),
                confidence: Confidence::Inferred,
            });
        }
    }
    relationships
}
