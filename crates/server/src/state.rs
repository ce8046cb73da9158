//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. Handlers build a fresh `AskPipeline` from it
//! for every request.

use crate::config::AppConfig;
use askdb::{
    providers::{ai::AiProvider, db::sqlite::SqliteProvider, factory::create_provider},
    AskPipeline, AskPipelineBuilder, PromptError,
};
use std::{path::Path, sync::Arc};
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    /// The database the questions are answered from.
    pub sqlite_provider: Arc<SqliteProvider>,
    /// The configured completion client.
    pub ai_provider: Box<dyn AiProvider>,
}

impl AppState {
    /// Assembles a pipeline over the shared providers.
    pub fn pipeline(&self) -> Result<AskPipeline, PromptError> {
        AskPipelineBuilder::new()
            .ai_provider(self.ai_provider.clone())
            .storage_provider(Box::new(self.sqlite_provider.as_ref().clone()))
            .table_prefix(self.config.table_prefix.clone())
            .build()
    }
}

/// Builds the shared application state from the configuration.
///
/// A missing API key does not fail startup; it is reported per request.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let ai_provider = create_provider(&config.llm.to_settings())?;

    if let Some(parent) = Path::new(&config.db_url).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let sqlite_provider = SqliteProvider::new(&config.db_url).await?;
    info!(db_path = %config.db_url, prefix = %config.table_prefix, "Initialized storage provider (SQLite).");

    Ok(AppState {
        config: Arc::new(config),
        sqlite_provider: Arc::new(sqlite_provider),
        ai_provider,
    })
}
