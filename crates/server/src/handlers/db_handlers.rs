//! # Database Diagnostic Handlers
//!
//! Read-only views for operators: the inspected schema and a dry run of the
//! security validator.

use super::{AppError, AppState};
use crate::types::{ValidateRequest, ValidateResponse};
use askdb::{schema, types::SchemaSnapshot, LexicalValidator, QueryValidator};
use axum::{extract::State, Json};
use tracing::info;

/// Returns the current schema snapshot.
pub async fn schema_handler(
    State(app_state): State<AppState>,
) -> Result<Json<SchemaSnapshot>, AppError> {
    let snapshot = schema::inspect(
        app_state.sqlite_provider.as_ref(),
        &app_state.config.table_prefix,
    )
    .await?;
    Ok(Json(snapshot))
}

/// Runs only the security validator on a statement. Nothing is executed.
pub async fn validate_handler(
    Json(payload): Json<ValidateRequest>,
) -> Json<ValidateResponse> {
    let verdict = LexicalValidator::new().validate(&payload.query);
    info!(valid = verdict.is_ok(), "Dry-run validation requested.");
    Json(ValidateResponse {
        valid: verdict.is_ok(),
        reason: verdict.err().map(|rejection| rejection.to_string()),
    })
}
