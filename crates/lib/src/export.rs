//! Converts result rows into a CSV attachment.

use crate::{
    errors::PromptError,
    types::{value_to_string, Row},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Serializes rows with a header taken from the first row. `NULL` becomes an
/// empty field. Returns an empty string for an empty result.
pub fn rows_to_csv(rows: &[Row]) -> Result<String, PromptError> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&str> = first.columns().collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|column| row.get(column).map(value_to_string).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PromptError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PromptError::Csv(e.to_string()))
}

/// Base64 form of `rows_to_csv`, for embedding in a JSON response.
pub fn encode_csv(rows: &[Row]) -> Result<Option<String>, PromptError> {
    let csv = rows_to_csv(rows)?;
    if csv.is_empty() {
        return Ok(None);
    }
    Ok(Some(STANDARD.encode(csv.as_bytes())))
}
