//! # Common Test Utilities
//!
//! `TestApp` spawns the real server on a random port, backed by a temporary
//! SQLite file seeded with the WordPress fixture and a completion endpoint
//! served by `httpmock`.

// Allow unused code because this is a test utility module, and not all
// functions might be used by every test file that includes it.
#![allow(unused)]

use anyhow::Result;
use askdb::providers::db::storage::Storage;
use askdb_server::{
    config, router,
    state::{build_app_state, AppState},
};
use axum::serve;
use httpmock::{Method::POST, Mock, MockServer};
use reqwest::Client;
use serde_json::json;
use std::{fs::File, io::Write, net::SocketAddr};
use tempfile::{tempdir, NamedTempFile, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    _db_file: NamedTempFile,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server with a configured API key.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_key(Some("test-key")).await
    }

    /// Spawns the application server; `None` leaves the API key unset.
    pub async fn spawn_with_key(api_key: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start();
        let db_file = NamedTempFile::new()?;
        let db_path = db_file.path().to_path_buf();

        let config_dir = tempdir()?;
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
db_url: "{}"
table_prefix: "wp_"
llm:
  provider: "openai"
  api_url: "{}"
  provider_api_key: {}
  model_name: "mock-chat-model"
  timeout_secs: 5
"#,
            db_path.to_str().unwrap(),
            mock_server.url(CHAT_COMPLETIONS_PATH),
            api_key.map_or("null".to_string(), |k| format!("\"{k}\"")),
        );
        File::create(&config_path)?.write_all(config_content.as_bytes())?;

        let config = config::get_config(Some(config_path.to_str().unwrap()))?;
        let app_state = build_app_state(config).await?;
        app_state
            .sqlite_provider
            .initialize_with_data(&askdb_test_utils::fixture_sql())
            .await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let state_for_server = app_state.clone();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(state_for_server);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state,
            _db_file: db_file,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Programs the completion endpoint to answer requests whose body
    /// contains `marker` with `content`.
    pub fn mock_completion(&self, marker: &str, content: &str) -> Mock<'_> {
        self.mock_server.mock(|when, then| {
            when.method(POST)
                .path(CHAT_COMPLETIONS_PATH)
                .body_contains(marker);
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            }));
        })
    }

    /// Posts a question to `/chat`.
    pub async fn chat(&self, message: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}/chat", self.address))
            .json(&json!({ "message": message }))
            .send()
            .await?)
    }

    pub async fn user_count(&self) -> Result<u64> {
        Ok(self.app_state.sqlite_provider.count_rows("wp_users").await?)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
