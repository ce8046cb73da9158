use crate::errors::PromptError;
use crate::types::{ColumnInfo, IndexInfo, Row};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a storage backend.
///
/// It covers the two things the pipeline needs from a database: catalog
/// introspection for the schema inspector and row retrieval for discovery and
/// execution. Implementations must never issue writes on their own.
#[async_trait]
pub trait Storage: Send + Sync + DynClone + Debug {
    /// Returns the name of the storage provider (e.g., "SQLite").
    fn name(&self) -> &str;

    /// The query language the generator should target.
    fn dialect(&self) -> &str;

    /// A human-readable name for the connected database.
    fn database_name(&self) -> &str;

    /// Executes a statement and returns its rows in column order.
    async fn execute_query(&self, query: &str) -> Result<Vec<Row>, PromptError>;

    /// Executes a statement with positional text parameters (`?1`, `?2`, ...).
    async fn execute_with_params(
        &self,
        query: &str,
        params: Vec<String>,
    ) -> Result<Vec<Row>, PromptError>;

    /// Lists every user table.
    async fn list_tables(&self) -> Result<Vec<String>, PromptError>;

    /// Column metadata in declaration order. Key roles are limited to
    /// `Primary`/`None`; index membership is merged in by the inspector.
    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, PromptError>;

    /// Index metadata, one entry per index name.
    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexInfo>, PromptError>;

    /// Exact row count.
    async fn count_rows(&self, table: &str) -> Result<u64, PromptError>;

    /// Returns `(engine, charset)` for the table.
    async fn table_status(&self, table: &str) -> Result<(String, String), PromptError>;

    /// Fetches the first row restricted to the given columns.
    async fn sample_row(&self, table: &str, columns: &[String])
        -> Result<Option<Row>, PromptError>;
}

dyn_clone::clone_trait_object!(Storage);

/// Quotes an identifier for interpolation into catalog SQL.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
