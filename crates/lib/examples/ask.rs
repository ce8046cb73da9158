//! Asks one question against a SQLite copy of a WordPress database.
//!
//! ```sh
//! AI_API_KEY=... cargo run --example ask -- db/wordpress.db "How many users are registered?"
//! ```

use askdb::{
    providers::{
        ai::GenerationSettings,
        db::sqlite::SqliteProvider,
        factory::{create_provider, ProviderSettings},
    },
    AskPipelineBuilder, ChatRequest,
};
use dotenvy::dotenv;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging and load .env file
    tracing_subscriber::fmt::init();
    dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <sqlite_path> '<question>'", args[0]);
        return Ok(());
    }

    let settings = ProviderSettings {
        provider: env::var("AI_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
        api_url: env::var("AI_API_URL").ok().filter(|url| !url.is_empty()),
        provider_api_key: env::var("AI_API_KEY").ok(),
        model_name: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        generation: GenerationSettings::default(),
    };

    let pipeline = AskPipelineBuilder::new()
        .ai_provider(create_provider(&settings)?)
        .storage_provider(Box::new(SqliteProvider::new(&args[1]).await?))
        .table_prefix(env::var("TABLE_PREFIX").unwrap_or_else(|_| "wp_".to_string()))
        .build()?;

    let outcome = pipeline
        .ask(&ChatRequest {
            message: args[2].clone(),
            history: Vec::new(),
        })
        .await?;

    println!("SQL: {}", outcome.sql_query);
    for row in &outcome.rows {
        println!("{:?}", row.to_string_map());
    }
    if let Some(report) = &outcome.debug_report {
        println!("Debug report: {}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}
