//! # Query Executor
//!
//! Runs a validated statement and returns its rows. An empty result is a
//! successful outcome, distinct from a database failure.

use crate::{
    errors::PromptError, providers::db::storage::Storage, types::Row, validator::ValidatedQuery,
};
use tracing::{error, info};

/// Trims the statement and removes one trailing semicolon.
pub fn prepare_statement(query: &str) -> &str {
    let trimmed = query.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end()
}

/// Executes a validated query. Every storage failure surfaces as
/// `PromptError::StorageOperationFailed`.
pub async fn execute(storage: &dyn Storage, query: &ValidatedQuery) -> Result<Vec<Row>, PromptError> {
    let statement = prepare_statement(query.as_str());
    let rows = storage.execute_query(statement).await.map_err(|e| {
        error!("Query execution failed: {e}");
        match e {
            PromptError::StorageOperationFailed(msg) | PromptError::StorageConnection(msg) => {
                PromptError::StorageOperationFailed(msg)
            }
            other => PromptError::StorageOperationFailed(other.to_string()),
        }
    })?;
    info!(rows = rows.len(), "Query executed.");
    Ok(rows)
}
