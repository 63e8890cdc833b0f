//! Error types for the csvbin service.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - CSV decoding and parsing errors
//! - [`QueryError`] - query execution errors
//! - [`StorageError`] - document store errors
//! - [`ServerError`] - top-level HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while decoding and parsing CSV content.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read input.
    #[error("Failed to read input: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV structure.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Header row normalized to nothing.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        CsvError::ParseError(err.to_string())
    }
}

// =============================================================================
// Query Errors
// =============================================================================

/// Errors while executing a filtered query against a document.
#[derive(Debug, Error)]
pub enum QueryError {
    /// CSV parsing error.
    #[error(transparent)]
    Csv(#[from] CsvError),

    /// Requested filter column is not part of the header set.
    #[error("Column '{0}' not found in CSV")]
    ColumnNotFound(String),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No document stored under the given access code.
    #[error("File not found")]
    NotFound,

    /// Access code is not a well-formed identifier.
    #[error("Invalid access code: {0}")]
    InvalidCode(String),

    /// Upload exceeds the configured size ceiling.
    #[error("Upload too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    /// Upload has a file extension the store does not accept.
    #[error("Unsupported file extension: {0}")]
    BadExtension(String),

    /// IO error.
    #[error("Storage IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Metadata sidecar (de)serialization error.
    #[error("Storage metadata error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Server Errors (top-level)
// =============================================================================

/// Top-level HTTP server errors.
///
/// This is the error type surfaced by API handlers. It wraps all
/// lower-level errors and adds request-validation variants.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Query error.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<CsvError> for ServerError {
    fn from(err: CsvError) -> Self {
        ServerError::Query(QueryError::Csv(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for query execution.
pub type EngineResult<T> = Result<T, QueryError>;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> QueryError
        let csv_err = CsvError::EmptyFile;
        let query_err: QueryError = csv_err.into();
        assert!(query_err.to_string().contains("empty"));

        // QueryError -> ServerError
        let query_err = QueryError::ColumnNotFound("Username".into());
        let server_err: ServerError = query_err.into();
        assert!(server_err.to_string().contains("Username"));

        // CsvError -> ServerError (two levels)
        let server_err: ServerError = CsvError::NoHeaders.into();
        assert!(matches!(server_err, ServerError::Query(QueryError::Csv(_))));
    }

    #[test]
    fn test_column_not_found_message() {
        let err = QueryError::ColumnNotFound("Nope".into());
        assert_eq!(err.to_string(), "Column 'Nope' not found in CSV");
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(StorageError::NotFound.to_string(), "File not found");
    }

    #[test]
    fn test_too_large_message() {
        let err = StorageError::TooLarge { size: 20, limit: 10 };
        let msg = err.to_string();
        assert!(msg.contains("20"));
        assert!(msg.contains("10"));
    }
}
