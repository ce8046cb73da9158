//! # SQLite Provider Tests
//!
//! Verifies the `SqliteProvider` catalog and query operations the inspector
//! and discovery engine rely on. Each test uses its own in-memory database.

mod common;

use crate::common::setup_tracing;
use askdb::providers::db::{sqlite::SqliteProvider, storage::Storage};
use askdb::types::KeyRole;
use askdb::{schema, PromptError};
use serde_json::{json, Value};

async fn provider_with(sql: &str) -> SqliteProvider {
    let provider = SqliteProvider::new(":memory:")
        .await
        .expect("Failed to create SqliteProvider");
    provider
        .initialize_with_data(sql)
        .await
        .expect("Failed to initialize database with test data");
    provider
}

#[tokio::test]
async fn test_execute_query_returns_ordered_rows() {
    setup_tracing();

    // 1. Arrange: a small table with a NULL value.
    let provider = provider_with(
        "CREATE TABLE wp_users (ID INTEGER PRIMARY KEY, user_login TEXT NOT NULL, nickname TEXT);
         INSERT INTO wp_users (ID, user_login, nickname) VALUES (1, 'alice', 'Al');
         INSERT INTO wp_users (ID, user_login, nickname) VALUES (2, 'bob', NULL);",
    )
    .await;

    // 2. Act
    let rows = provider
        .execute_query("SELECT ID, user_login, nickname FROM wp_users ORDER BY ID ASC")
        .await
        .expect("Failed to execute query");

    // 3. Assert: columns keep the projection order and NULL stays NULL.
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].columns().collect::<Vec<_>>(),
        vec!["ID", "user_login", "nickname"]
    );
    assert_eq!(rows[0].get("user_login"), Some(&json!("alice")));
    assert_eq!(rows[1].get("nickname"), Some(&Value::Null));
    assert_eq!(rows[1].to_string_map()["nickname"], "");
}

#[tokio::test]
async fn test_execute_with_params_binds_text() {
    setup_tracing();
    let provider = provider_with(
        "CREATE TABLE wp_usermeta (umeta_id INTEGER PRIMARY KEY, user_id INTEGER, meta_key TEXT, meta_value TEXT);
         INSERT INTO wp_usermeta (user_id, meta_key, meta_value) VALUES (1, 'first_name', 'O''Brien');",
    )
    .await;

    let rows = provider
        .execute_with_params(
            "SELECT meta_value FROM wp_usermeta WHERE meta_key = ?1",
            vec!["first_name".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(rows[0].get("meta_value"), Some(&json!("O'Brien")));

    // A quote in a bound value is data, never SQL.
    let rows = provider
        .execute_with_params(
            "SELECT meta_value FROM wp_usermeta WHERE meta_key = ?1",
            vec!["x' OR '1'='1".to_string()],
        )
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_catalog_operations() {
    setup_tracing();
    let provider = provider_with(
        "CREATE TABLE wp_posts (ID INTEGER PRIMARY KEY, post_title TEXT NOT NULL DEFAULT '', post_author INTEGER);
         CREATE INDEX post_author ON wp_posts (post_author);
         CREATE UNIQUE INDEX post_title_author ON wp_posts (post_title, post_author);
         INSERT INTO wp_posts (post_title, post_author) VALUES ('Hello', 1);",
    )
    .await;

    assert_eq!(provider.list_tables().await.unwrap(), vec!["wp_posts"]);

    let columns = provider.table_columns("wp_posts").await.unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0].name, "ID");
    assert_eq!(columns[0].key_role, KeyRole::Primary);
    assert_eq!(columns[0].extra, "auto_increment");
    assert!(!columns[1].nullable);

    let indexes = provider.table_indexes("wp_posts").await.unwrap();
    assert_eq!(indexes.len(), 2);
    let composite = indexes
        .iter()
        .find(|i| i.name == "post_title_author")
        .unwrap();
    assert!(composite.unique);
    assert_eq!(composite.columns, vec!["post_title", "post_author"]);

    assert_eq!(provider.count_rows("wp_posts").await.unwrap(), 1);
    let (engine, charset) = provider.table_status("wp_posts").await.unwrap();
    assert_eq!(engine, provider.name());
    assert!(!charset.is_empty());

    let sample = provider
        .sample_row("wp_posts", &["ID".to_string(), "post_title".to_string()])
        .await
        .unwrap()
        .expect("one row");
    assert_eq!(sample.columns().collect::<Vec<_>>(), vec!["ID", "post_title"]);
}

#[tokio::test]
async fn test_database_name_from_file_stem() {
    setup_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wordpress.db");

    let provider = SqliteProvider::new(path.to_str().unwrap()).await.unwrap();
    assert_eq!(provider.database_name(), "wordpress");

    let memory = SqliteProvider::new(":memory:").await.unwrap();
    assert_eq!(memory.database_name(), "memory");
}

/// Opening and inspecting an existing database file leaves its bytes alone.
#[tokio::test]
async fn test_open_and_inspect_do_not_modify_database_file() {
    setup_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.db");
    let path_str = path.to_str().unwrap();

    {
        let seeding = SqliteProvider::new(path_str).await.unwrap();
        seeding
            .initialize_with_data(
                "CREATE TABLE wp_users (ID INTEGER PRIMARY KEY, user_login TEXT);
                 INSERT INTO wp_users (ID, user_login) VALUES (1, 'admin');",
            )
            .await
            .unwrap();
    }
    // Settle anything the seeding connection left behind.
    drop(SqliteProvider::new(path_str).await.unwrap());
    let before = std::fs::read(&path).unwrap();

    {
        let provider = SqliteProvider::new(path_str).await.unwrap();
        let snapshot = schema::inspect(&provider, "wp_").await.unwrap();
        assert_eq!(snapshot.table("users").unwrap().row_count, 1);
    }

    let after = std::fs::read(&path).unwrap();
    assert_eq!(before.len(), after.len());
    assert!(before == after, "database file changed on open");
}

/// Verifies that each in-memory provider instance is isolated from the others.
#[tokio::test]
async fn test_sqlite_in_memory_is_isolated() {
    setup_tracing();

    let _provider1 =
        provider_with("CREATE TABLE t1 (id INTEGER); INSERT INTO t1 (id) VALUES (1);").await;
    let provider2 = SqliteProvider::new(":memory:")
        .await
        .expect("Failed to create provider 2");

    let error = provider2
        .execute_query("SELECT * FROM t1")
        .await
        .expect_err("Querying table from provider1 on provider2 should fail");
    match error {
        PromptError::StorageOperationFailed(msg) => {
            assert!(
                msg.contains("no such table"),
                "Expected 'no such table' error, but got: {msg}"
            );
        }
        _ => panic!("Expected StorageOperationFailed, but got {error:?}"),
    }
}
