//! HTTP server for the csvbin API.
//!
//! # API Endpoints
//!
//! | Method | Path                | Description                          |
//! |--------|---------------------|--------------------------------------|
//! | GET    | `/health`           | Health check                         |
//! | POST   | `/api/upload`       | Upload a CSV, get an access code     |
//! | GET    | `/api/query/{code}` | Query rows by column + glob pattern  |
//! | GET    | `/api/logs`         | SSE stream of server events          |
//!
//! Anything else falls through to the static upload page in `static/`.
//!
//! Status mapping: malformed codes and bad parameters are 400, an unknown
//! access code is 404, CSV format and unknown-column failures are 400.
//! Parse details never reach the client; they go to the event log.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use super::logs::{log_error, log_info, log_success, EVENT_LOG};
use super::types::{error_response, QueryResponse, UploadResponse};
use crate::error::{QueryError, ServerError, StorageError};
use crate::query::query_bytes;
use crate::storage::DocumentStore;

type Rejection = (StatusCode, Json<Value>);

/// Start the HTTP server over the given document store.
pub async fn start_server(
    port: u16,
    store: DocumentStore,
) -> Result<(), Box<dyn std::error::Error>> {
    // Permissive CORS so the page can be served from anywhere during dev
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    // Leave headroom over the store's own ceiling so the store check, with
    // its explicit error message, is the one that fires.
    let body_limit = store.config().max_bytes + 64 * 1024;

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/query/{code}", get(query_rows))
        .route("/api/logs", get(sse_logs))
        .fallback_service(ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(Arc::new(store));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 csvbin server running on http://localhost:{}", port);
    println!("   POST /api/upload       - Upload CSV file");
    println!("   GET  /api/query/{{code}} - Query rows (column, value)");
    println!("   GET  /api/logs         - SSE event stream");
    println!("   GET  /health           - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "csvbin",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "query": "GET /api/query/{code}?column=..&value=..",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint streaming server events
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = EVENT_LOG.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint
async fn upload_csv(
    State(store): State<Arc<DocumentStore>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, Rejection> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        reject(ServerError::BadRequest(format!("Multipart error: {}", e)))
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| reject(ServerError::BadRequest(format!("Read error: {}", e))))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data
        .ok_or_else(|| reject(ServerError::BadRequest("No file provided".to_string())))?;

    log_info(format!(
        "Upload received: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unnamed"),
        bytes.len()
    ));

    // Parse once up front so a broken file is rejected now, not at query
    // time. The stored bytes stay exactly as uploaded.
    let parsed = query_bytes(&bytes, None, None).map_err(|e| reject(e.into()))?;

    let meta = store
        .save(&bytes, file_name.as_deref())
        .await
        .map_err(|e| reject(e.into()))?;

    log_success(format!(
        "Stored {} rows x {} columns as {}",
        parsed.row_count,
        parsed.headers.len(),
        meta.access_code
    ));

    Ok(Json(UploadResponse::new(&meta, &parsed)))
}

/// Query parameters for the query endpoint.
#[derive(Debug, Deserialize)]
struct QueryParams {
    column: Option<String>,
    value: Option<String>,
}

/// Query endpoint: rows of a stored document filtered by column + pattern
async fn query_rows(
    State(store): State<Arc<DocumentStore>>,
    Path(code): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>, Rejection> {
    // Both halves of the filter are required here; no-filter mode exists
    // only on the engine for CLI use.
    let (column, value) = match (params.column.as_deref(), params.value.as_deref()) {
        (Some(c), Some(v)) => (c, v),
        _ => {
            return Err(reject(ServerError::BadRequest(
                "Query parameters 'column' and 'value' are required".to_string(),
            )))
        }
    };

    let bytes = store.read(&code).await.map_err(|e| reject(e.into()))?;

    let output =
        query_bytes(&bytes, Some(column), Some(value)).map_err(|e| reject(e.into()))?;

    log_info(format!(
        "Query {}: {}='{}' -> {} of {} rows",
        code,
        column,
        value,
        output.records.len(),
        output.row_count
    ));

    Ok(Json(QueryResponse::new(&code, Some(column), Some(value), output)))
}

/// Map a server error to an HTTP rejection with a stable client message.
fn reject(err: ServerError) -> Rejection {
    let (status, message) = match &err {
        ServerError::Query(QueryError::Csv(detail)) => {
            log_error(format!("CSV parse failure: {}", detail));
            (StatusCode::BAD_REQUEST, "Invalid CSV format".to_string())
        }
        ServerError::Query(e @ QueryError::ColumnNotFound(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ServerError::Storage(StorageError::NotFound) => {
            (StatusCode::NOT_FOUND, "File not found".to_string())
        }
        ServerError::Storage(e @ StorageError::InvalidCode(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ServerError::Storage(e @ StorageError::TooLarge { .. }) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ServerError::Storage(e @ StorageError::BadExtension(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ServerError::Storage(e) => {
            log_error(format!("Storage failure: {}", e));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
        ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        ServerError::Internal(msg) => {
            log_error(format!("Internal error: {}", msg));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    (status, Json(error_response(&message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CsvError;

    #[test]
    fn test_csv_error_maps_to_400_with_stable_message() {
        let (status, Json(body)) = reject(CsvError::EmptyFile.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid CSV format");
    }

    #[test]
    fn test_column_not_found_maps_to_400_with_name() {
        let (status, Json(body)) =
            reject(ServerError::Query(QueryError::ColumnNotFound("Nope".into())));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Column 'Nope' not found in CSV");
    }

    #[test]
    fn test_missing_document_maps_to_404() {
        let (status, Json(body)) = reject(ServerError::Storage(StorageError::NotFound));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "File not found");
    }

    #[test]
    fn test_invalid_code_maps_to_400() {
        let (status, _) = reject(ServerError::Storage(StorageError::InvalidCode("x".into())));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_io_error_hides_detail() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let (status, Json(body)) = reject(ServerError::Storage(io.into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
