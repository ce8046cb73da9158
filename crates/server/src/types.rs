use askdb::types::{DebugReport, DiscoveryTrace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The success body of `POST /chat`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub sql_query: String,
    /// Column names in result order; `raw_rows` maps are keyed by these.
    pub columns: Vec<String>,
    /// Every value stringified, `NULL` as an empty string.
    pub raw_rows: Vec<BTreeMap<String, String>>,
    /// Base64 CSV of the rows, when enabled and non-empty.
    pub csv_export: Option<String>,
    pub discovery_trace: DiscoveryTrace,
    pub debug_report: Option<DebugReport>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub reason: Option<String>,
}
