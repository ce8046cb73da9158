//! # Schema Inspector Tests
//!
//! Inspects the WordPress fixture and checks the snapshot's invariants:
//! core/custom classification, key roles, row counts, sample truncation and
//! inferred relationships.

mod common;

use crate::common::{fixture_with_schema, setup_tracing};
use askdb::providers::db::sqlite::SqliteProvider;
use askdb::schema::inspect;
use askdb::types::KeyRole;
use askdb::PromptError;
use askdb_test_utils::FIXTURE_USER_COUNT;

#[tokio::test]
async fn test_inspect_classifies_core_and_custom_tables() -> anyhow::Result<()> {
    setup_tracing();
    let (_provider, snapshot) = fixture_with_schema().await?;

    assert_eq!(snapshot.database_name, "memory");
    for core in ["wp_users", "wp_usermeta", "wp_posts", "wp_postmeta", "wp_comments", "wp_options"] {
        assert!(snapshot.core_table_names.contains(core), "{core} should be core");
    }
    assert!(snapshot.custom_table_names.contains("wp_course_enrollments"));
    assert!(snapshot
        .core_table_names
        .is_disjoint(&snapshot.custom_table_names));
    assert_eq!(
        snapshot.core_table_names.len() + snapshot.custom_table_names.len(),
        snapshot.tables.len()
    );
    Ok(())
}

#[tokio::test]
async fn test_inspect_reads_columns_keys_and_counts() -> anyhow::Result<()> {
    setup_tracing();
    let (_provider, snapshot) = fixture_with_schema().await?;

    let users = snapshot.table("users").expect("wp_users is inspected");
    assert_eq!(users.row_count, FIXTURE_USER_COUNT as u64);
    assert_eq!(users.primary_key.as_deref(), Some("ID"));
    let id = users.column("ID").expect("ID column");
    assert_eq!(id.key_role, KeyRole::Primary);
    assert!(!users.column("user_login").unwrap().nullable);

    let usermeta = snapshot.table("usermeta").unwrap();
    assert_eq!(usermeta.column("meta_key").unwrap().key_role, KeyRole::Indexed);
    assert!(usermeta
        .indexes
        .iter()
        .any(|i| i.name == "usermeta_user_id" && i.columns == vec!["user_id".to_string()]));

    let options = snapshot.table("options").unwrap();
    assert!(options.indexes.iter().any(|i| i.name == "option_name" && i.unique));

    // Every primary key names a real column.
    for table in snapshot.tables.values() {
        if let Some(pk) = &table.primary_key {
            assert!(table.column(pk).is_some(), "{} pk {pk} missing", table.name);
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_inspect_samples_first_row() -> anyhow::Result<()> {
    setup_tracing();
    let (_provider, snapshot) = fixture_with_schema().await?;

    let sample = snapshot
        .table("users")
        .and_then(|t| t.sample_row.as_ref())
        .expect("wp_users has a sample row");
    assert_eq!(sample.get("user_login").map(String::as_str), Some("user1"));
    Ok(())
}

#[tokio::test]
async fn test_inspect_truncates_long_sample_values() -> anyhow::Result<()> {
    setup_tracing();
    let provider = SqliteProvider::new(":memory:").await?;
    let long_value = "x".repeat(250);
    provider
        .initialize_with_data(&format!(
            "CREATE TABLE wp_notes (id INTEGER PRIMARY KEY, body TEXT);
             INSERT INTO wp_notes (body) VALUES ('{long_value}');"
        ))
        .await?;

    let snapshot = inspect(&provider, "wp_").await?;
    let body = snapshot.table("notes").unwrap().sample_row.as_ref().unwrap()["body"].clone();
    assert_eq!(body.chars().count(), 103);
    assert!(body.ends_with("..."));
    Ok(())
}

#[tokio::test]
async fn test_inspect_ignores_tables_without_prefix() -> anyhow::Result<()> {
    setup_tracing();
    let provider = SqliteProvider::new(":memory:").await?;
    provider
        .initialize_with_data(
            "CREATE TABLE wp_users (ID INTEGER PRIMARY KEY);
             CREATE TABLE other_users (ID INTEGER PRIMARY KEY);",
        )
        .await?;

    let snapshot = inspect(&provider, "wp_").await?;
    assert!(snapshot.tables.contains_key("wp_users"));
    assert!(!snapshot.tables.contains_key("other_users"));
    Ok(())
}

#[tokio::test]
async fn test_inspect_empty_table_has_no_sample() -> anyhow::Result<()> {
    setup_tracing();
    let provider = SqliteProvider::new(":memory:").await?;
    provider
        .initialize_with_data("CREATE TABLE wp_links (link_id INTEGER PRIMARY KEY, link_url TEXT)")
        .await?;

    let snapshot = inspect(&provider, "wp_").await?;
    let links = snapshot.table("links").unwrap();
    assert_eq!(links.row_count, 0);
    assert!(links.sample_row.is_none());
    Ok(())
}

#[tokio::test]
async fn test_inspect_infers_relationships() -> anyhow::Result<()> {
    setup_tracing();
    let (_provider, snapshot) = fixture_with_schema().await?;

    let rel = snapshot
        .relationships
        .iter()
        .find(|r| r.from_table == "wp_course_enrollments" && r.from_column == "user_id")
        .expect("user_id links to wp_users");
    assert_eq!(rel.to_table, "wp_users");
    assert_eq!(rel.to_column, "ID");
    assert!(snapshot
        .relationships
        .iter()
        .all(|r| r.from_table != r.to_table));
    assert!(snapshot
        .relationships
        .iter()
        .any(|r| r.from_table == "wp_postmeta" && r.to_table == "wp_posts"));
    Ok(())
}

#[tokio::test]
async fn test_inspect_empty_database() -> Result<(), PromptError> {
    setup_tracing();
    let provider = SqliteProvider::new(":memory:").await?;
    let snapshot = inspect(&provider, "wp_").await?;
    assert!(snapshot.tables.is_empty());
    assert!(snapshot.relationships.is_empty());
    Ok(())
}
