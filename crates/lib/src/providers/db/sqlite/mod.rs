use crate::{
    errors::PromptError,
    providers::db::storage::{quote_identifier, Storage},
    types::{ColumnInfo, IndexInfo, KeyRole, Row},
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fmt::{self, Debug},
    path::Path,
    sync::{Arc, OnceLock},
};
use tracing::{debug, info};
use turso::{Database, Value as TursoValue};

pub mod sql;

/// A provider for interacting with a local SQLite database using Turso.
///
/// When cloned, it shares the same underlying database, so an in-memory
/// instance can be seeded through one clone and read through another.
#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
    database_name: Arc<str>,
}

impl SqliteProvider {
    /// Creates a new `SqliteProvider` from a file path or in-memory.
    ///
    /// Use ":memory:" for an isolated in-memory database. To share it across
    /// several providers (e.g. in tests), create one and `.clone()` it.
    pub async fn new(db_path: &str) -> Result<Self, PromptError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        let database_name = Path::new(db_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("memory")
            .trim_start_matches(':')
            .trim_end_matches(':')
            .to_string();

        Ok(Self {
            db,
            database_name: database_name.into(),
        })
    }

    /// A helper for tests and fixtures to pre-populate data by executing
    /// multiple `;`-separated statements.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), PromptError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ())
                .await
                .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;
        }
        Ok(())
    }

    async fn run(&self, query: &str, params: Vec<TursoValue>) -> Result<Vec<Row>, PromptError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        let mut stmt = conn
            .prepare(query)
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut rows = stmt
            .query(params)
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?
        {
            let mut values = Vec::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                let value = row
                    .get_value(i)
                    .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;
                values.push((name.clone(), turso_value_to_json(value)));
            }
            results.push(Row(values));
        }
        Ok(results)
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider")
            .field("database_name", &self.database_name)
            .finish_non_exhaustive()
    }
}

impl AsRef<Database> for SqliteProvider {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}

/// Converts a Turso value to a serde_json::Value.
fn turso_value_to_json(v: TursoValue) -> Value {
    match v {
        TursoValue::Null => Value::Null,
        TursoValue::Integer(i) => Value::Number(i.into()),
        TursoValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        TursoValue::Text(s) => Value::String(s),
        TursoValue::Blob(_) => Value::String("<blob>".to_string()),
    }
}

fn index_columns_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*CREATE\s+(UNIQUE\s+)?INDEX\b.*?\((.*)\)\s*;?\s*$")
            .expect("index regex is valid")
    })
}

/// Parses the column list and uniqueness out of a `CREATE INDEX` statement.
pub fn parse_index_definition(create_sql: &str) -> (Vec<String>, bool) {
    let Some(caps) = index_columns_regex().captures(create_sql) else {
        return (Vec::new(), false);
    };
    let unique = caps.get(1).is_some();
    let columns = caps
        .get(2)
        .map(|m| {
            m.as_str()
                .split(',')
                .filter_map(|part| part.split_whitespace().next())
                .map(|col| col.trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']'))
                .filter(|col| !col.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    (columns, unique)
}

#[async_trait]
impl Storage for SqliteProvider {
    fn name(&self) -> &str {
        "SQLite"
    }

    fn dialect(&self) -> &str {
        "SQLite SQL"
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn execute_query(&self, query: &str) -> Result<Vec<Row>, PromptError> {
        debug!(query = %query, "--> Executing SQLite query");
        self.run(query, Vec::new()).await
    }

    async fn execute_with_params(
        &self,
        query: &str,
        params: Vec<String>,
    ) -> Result<Vec<Row>, PromptError> {
        debug!(query = %query, params = ?params, "--> Executing parameterised SQLite query");
        let params = params.into_iter().map(TursoValue::Text).collect();
        self.run(query, params).await
    }

    async fn list_tables(&self) -> Result<Vec<String>, PromptError> {
        info!("Listing all tables in SQLite database.");
        let rows = self
            .run(sql::LIST_TABLES, Vec::new())
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("name").and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, PromptError> {
        let query = format!("PRAGMA table_info({});", quote_identifier(table));
        let rows = self.run(&query, Vec::new()).await?;

        // PRAGMA table_info columns: cid, name, type, notnull, dflt_value, pk
        let columns = rows
            .iter()
            .filter_map(|row| {
                let name = row.get("name")?.as_str()?.to_string();
                let declared_type = row
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let not_null = row.get("notnull").and_then(Value::as_i64).unwrap_or(0) != 0;
                let pk = row.get("pk").and_then(Value::as_i64).unwrap_or(0);
                let default = row.get("dflt_value").and_then(|v| match v {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                });
                let is_integer_pk = pk > 0 && declared_type.eq_ignore_ascii_case("INTEGER");
                Some(ColumnInfo {
                    name,
                    declared_type,
                    nullable: !not_null && pk == 0,
                    key_role: if pk > 0 { KeyRole::Primary } else { KeyRole::None },
                    default,
                    extra: if is_integer_pk {
                        "auto_increment".to_string()
                    } else {
                        String::new()
                    },
                })
            })
            .collect();
        Ok(columns)
    }

    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexInfo>, PromptError> {
        let rows = self
            .run(sql::LIST_INDEXES, vec![TursoValue::Text(table.to_string())])
            .await?;

        let mut by_name: BTreeMap<String, IndexInfo> = BTreeMap::new();
        for row in &rows {
            let Some(name) = row.get("name").and_then(Value::as_str) else {
                continue;
            };
            let (columns, unique) = row
                .get("sql")
                .and_then(Value::as_str)
                .map(parse_index_definition)
                .unwrap_or_default();
            by_name.entry(name.to_string()).or_insert(IndexInfo {
                name: name.to_string(),
                columns,
                unique,
            });
        }
        Ok(by_name.into_values().collect())
    }

    async fn count_rows(&self, table: &str) -> Result<u64, PromptError> {
        let query = format!("SELECT COUNT(*) AS row_count FROM {}", quote_identifier(table));
        let rows = self.run(&query, Vec::new()).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("row_count"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    async fn table_status(&self, _table: &str) -> Result<(String, String), PromptError> {
        // Older Turso builds do not implement `PRAGMA encoding`; SQLite defaults to UTF-8.
        let charset = match self.run("PRAGMA encoding;", Vec::new()).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.0.first())
                .and_then(|(_, v)| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "UTF-8".to_string()),
            Err(e) => {
                debug!("PRAGMA encoding unavailable ({e}); assuming UTF-8.");
                "UTF-8".to_string()
            }
        };
        Ok((self.name().to_string(), charset))
    }

    async fn sample_row(
        &self,
        table: &str,
        columns: &[String],
    ) -> Result<Option<Row>, PromptError> {
        if columns.is_empty() {
            return Ok(None);
        }
        let projection = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT {projection} FROM {} LIMIT 1",
            quote_identifier(table)
        );
        Ok(self.run(&query, Vec::new()).await?.into_iter().next())
    }
}
