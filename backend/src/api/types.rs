//! REST API types.
//!
//! Everything the HTTP layer returns is camelCase JSON; failures use a
//! single stable error envelope so clients never have to sniff shapes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::query::QueryOutput;
use crate::storage::DocumentMeta;

/// Response sent after a successful CSV upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Access code to use for later queries.
    pub access_code: String,

    /// Original file name, if the client sent one.
    pub file_name: Option<String>,

    /// Parse metadata for the uploaded document.
    pub metadata: CsvMetadata,
}

impl UploadResponse {
    pub fn new(meta: &DocumentMeta, parsed: &QueryOutput) -> Self {
        Self {
            access_code: meta.access_code.clone(),
            file_name: meta.file_name.clone(),
            metadata: CsvMetadata::from_output(parsed),
        }
    }
}

/// CSV parse metadata included in upload responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl CsvMetadata {
    pub fn from_output(output: &QueryOutput) -> Self {
        Self {
            encoding: output.encoding.clone(),
            delimiter: match output.delimiter {
                '\t' => "\\t".to_string(),
                c => c.to_string(),
            },
            row_count: output.row_count,
            columns: output.headers.clone(),
        }
    }
}

/// Response sent for a successful query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Access code the query ran against.
    pub access_code: String,

    /// Filter column, echoed back.
    pub column: Option<String>,

    /// Filter pattern, echoed back.
    pub pattern: Option<String>,

    /// Number of matched rows.
    pub match_count: usize,

    /// Matched rows in file order, column→value objects.
    pub rows: Vec<Value>,
}

impl QueryResponse {
    pub fn new(
        access_code: &str,
        column: Option<&str>,
        pattern: Option<&str>,
        output: QueryOutput,
    ) -> Self {
        Self {
            access_code: access_code.to_string(),
            column: column.map(|s| s.to_string()),
            pattern: pattern.map(|s| s.to_string()),
            match_count: output.records.len(),
            rows: output.records,
        }
    }
}

/// Create an error response envelope.
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
