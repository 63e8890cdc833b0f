//! Pattern-filtered query engine over CSV documents.
//!
//! This is the read path of the service: decode the stored bytes, detect
//! the delimiter, normalize the header row, then stream the data rows
//! once, building a column→value record per row and applying the optional
//! filter predicate. The whole pass is a pure synchronous function of its
//! input, so any number of queries may run concurrently against the same
//! immutable document.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{CsvError, EngineResult, QueryError};
use crate::parser::{
    decode_content, detect_delimiter, detect_encoding, normalize_headers, record_reader,
    trim_field,
};

pub mod pattern;

/// Result of a query: matched rows in file order, plus parse metadata.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    /// Matched records, each a column→value JSON object.
    pub records: Vec<Value>,

    /// Normalized column names, in file order.
    pub headers: Vec<String>,

    /// Detected encoding of the document.
    pub encoding: String,

    /// Detected delimiter.
    pub delimiter: char,

    /// Data rows scanned (header excluded, skipped and filtered rows
    /// included).
    pub row_count: usize,
}

/// Run a query against raw document bytes.
///
/// With both `filter_column` and `filter_pattern` given, only rows whose
/// value at the filter column matches the pattern are returned. With
/// neither, every non-blank row is returned. `filter_column` is validated
/// against the header set either way.
///
/// Repeated calls with identical input return identical output; nothing
/// here is retried or randomized.
pub fn query_bytes(
    bytes: &[u8],
    filter_column: Option<&str>,
    filter_pattern: Option<&str>,
) -> EngineResult<QueryOutput> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let mut reader = record_reader(&content, delimiter);
    let mut rows = reader.records();

    let header_row = match rows.next() {
        Some(row) => row.map_err(CsvError::from)?,
        None => return Err(CsvError::EmptyFile.into()),
    };
    let headers = normalize_headers(&header_row);
    if headers.is_empty() {
        return Err(CsvError::NoHeaders.into());
    }

    if let Some(column) = filter_column {
        if !headers.iter().any(|h| h == column) {
            return Err(QueryError::ColumnNotFound(column.to_string()));
        }
    }

    let mut records = Vec::new();
    let mut row_count = 0;

    for row in rows {
        let row = row.map_err(CsvError::from)?;
        row_count += 1;

        let fields: Vec<&str> = row.iter().map(trim_field).collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }

        // Zip against the headers: short rows read as empty trailing
        // fields, extra fields fall off the end. A duplicated header name
        // keeps the later column's value.
        let mut record = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = fields.get(i).copied().unwrap_or("");
            record.insert(header.clone(), json!(value));
        }

        if let (Some(column), Some(pat)) = (filter_column, filter_pattern) {
            let keep = match record.get(column) {
                Some(Value::String(v)) => pattern::matches(pat, v),
                // A record without the column never matches.
                _ => false,
            };
            if !keep {
                continue;
            }
        }

        records.push(Value::Object(record));
    }

    Ok(QueryOutput {
        records,
        headers,
        encoding,
        delimiter,
        row_count,
    })
}

/// Run a query against a CSV file on disk.
pub fn query_file(
    path: &std::path::Path,
    filter_column: Option<&str>,
    filter_pattern: Option<&str>,
) -> EngineResult<QueryOutput> {
    let bytes = std::fs::read(path).map_err(CsvError::from)?;
    query_bytes(&bytes, filter_column, filter_pattern)
}
