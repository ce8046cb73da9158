//! # Chat Handler
//!
//! The `/chat` endpoint: runs one question through the pipeline and shapes
//! the outcome for the client.

use super::{AppError, AppState};
use crate::types::ChatResponse;
use askdb::{
    export::encode_csv,
    types::{value_to_string, ChatOutcome},
    ChatRequest,
};
use axum::{extract::State, Json};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Builds the deterministic textual answer for an outcome.
pub fn summarize(outcome: &ChatOutcome) -> String {
    let corrected = outcome
        .debug_report
        .as_ref()
        .is_some_and(|report| report.corrected);

    let mut text = match outcome.rows.as_slice() {
        [] => return "No matching records were found.".to_string(),
        [row] if row.0.len() == 1 => format!("The answer is {}.", value_to_string(&row.0[0].1)),
        rows => format!("Found {} rows.", rows.len()),
    };
    if corrected {
        text.push_str(" The query was corrected automatically after the first attempt returned no rows.");
    }
    text
}

/// The handler for `POST /chat`.
pub async fn chat_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("chat", %request_id);

    async move {
        if payload.message.trim().is_empty() {
            return Err(AppError::BadRequest(
                "The `message` field must not be empty.".to_string(),
            ));
        }
        info!(history = payload.history.len(), "Received chat request.");

        let pipeline = app_state.pipeline()?;
        let outcome = pipeline.ask(&payload).await?;

        let csv_export = if app_state.config.csv_export {
            encode_csv(&outcome.rows)?
        } else {
            None
        };
        let response = summarize(&outcome);
        info!(rows = outcome.rows.len(), "Chat request answered.");

        Ok::<_, AppError>(Json(ChatResponse {
            success: true,
            response,
            sql_query: outcome.sql_query,
            columns: outcome
                .rows
                .first()
                .map(|row| row.columns().map(str::to_string).collect())
                .unwrap_or_default(),
            raw_rows: outcome.rows.iter().map(|row| row.to_string_map()).collect(),
            csv_export,
            discovery_trace: outcome.discovery_trace,
            debug_report: outcome.debug_report,
        }))
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdb::types::{DebugReport, Row};
    use serde_json::json;

    fn outcome(rows: Vec<Row>, corrected: bool) -> ChatOutcome {
        ChatOutcome {
            rows,
            debug_report: corrected.then(|| DebugReport {
                corrected: true,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_summarize_single_cell() {
        let rows = vec![Row(vec![("total".to_string(), json!(150))])];
        assert_eq!(summarize(&outcome(rows, false)), "The answer is 150.");
    }

    #[test]
    fn test_summarize_many_rows_with_correction_note() {
        let rows = vec![
            Row(vec![("user_login".to_string(), json!("a"))]),
            Row(vec![("user_login".to_string(), json!("b"))]),
        ];
        let text = summarize(&outcome(rows, true));
        assert!(text.starts_with("Found 2 rows."));
        assert!(text.contains("corrected automatically"));
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(
            summarize(&outcome(Vec::new(), false)),
            "No matching records were found."
        );
    }
}
