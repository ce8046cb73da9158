#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared setup for the integration tests: tracing initialisation and
//! helpers around the WordPress fixture from `askdb-test-utils`.

use askdb::providers::db::sqlite::SqliteProvider;
use askdb::schema;
use askdb::types::SchemaSnapshot;
use askdb_test_utils::TestSetup;
use dotenvy::dotenv;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Seeds a fresh fixture database and inspects it.
pub async fn fixture_with_schema() -> anyhow::Result<(SqliteProvider, SchemaSnapshot)> {
    let setup = TestSetup::new().await?;
    let snapshot = schema::inspect(&setup.provider, "wp_").await?;
    Ok((setup.provider, snapshot))
}
