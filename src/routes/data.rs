use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, warn};

use crate::ingest::{parse_csv, ParsedCsv};
use crate::models::{AppState, MessageResponse, PageQuery, PaginatedResponse, UploadResponse};
use crate::types::{AppError, AppResult};

const FILE_FIELD: &str = "file";

pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.upload.max_upload_bytes;

    Router::new()
        .route("/api/upload", post(upload_csv))
        .route("/api/data", get(get_data))
        .route("/api/search", get(search_data))
        .route("/api/clear", delete(clear_data))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// POST /api/upload - Replace the dataset with an uploaded CSV file
async fn upload_csv(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| {
        warn!(error = %e, "Upload is not a multipart form");
        AppError::BadRequest("Failed to read file".to_string())
    })?;

    let content = read_file_field(&mut multipart).await?;
    info!(bytes = content.len(), "CSV upload received");

    let ParsedCsv {
        dataset,
        skipped_rows,
    } = tokio::task::spawn_blocking(move || parse_csv(&content[..]))
        .await
        .map_err(|e| AppError::Internal(format!("CSV parsing task failed: {e}")))??;

    if skipped_rows > 0 {
        warn!(skipped_rows, "Skipped malformed CSV records");
    }

    let row_count = dataset.total();
    let headers = dataset.headers().to_vec();
    let sample_data = dataset
        .rows()
        .iter()
        .take(state.config.upload.sample_size)
        .cloned()
        .collect();

    state.store.store(dataset);
    info!(rows = row_count, columns = headers.len(), "CSV upload stored");

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        row_count,
        headers,
        sample_data,
        skipped_rows,
    }))
}

async fn read_file_field(multipart: &mut Multipart) -> AppResult<Bytes> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(FILE_FIELD) {
            return field.bytes().await.map_err(multipart_error);
        }
    }

    Err(AppError::BadRequest("Failed to read file".to_string()))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("file too large".to_string())
    } else {
        warn!(error = %err, "Malformed multipart body");
        AppError::BadRequest("Failed to read file".to_string())
    }
}

/// GET /api/data - One page of the current dataset
async fn get_data(
    State(state): State<AppState>,
    params: Result<Query<PageQuery>, QueryRejection>,
) -> Json<PaginatedResponse> {
    let params = page_query(params);
    Json(state.store.get_paginated(params.page(), params.per_page()))
}

/// GET /api/search - One page of rows matching `q`
async fn search_data(
    State(state): State<AppState>,
    params: Result<Query<PageQuery>, QueryRejection>,
) -> Json<PaginatedResponse> {
    let params = page_query(params);
    Json(
        state
            .store
            .search(params.query(), params.page(), params.per_page()),
    )
}

/// DELETE /api/clear - Drop the current dataset
async fn clear_data(State(state): State<AppState>) -> Json<MessageResponse> {
    state.store.clear();

    Json(MessageResponse {
        message: "Data cleared successfully".to_string(),
    })
}

// An unparsable query string behaves like an absent one.
fn page_query(params: Result<Query<PageQuery>, QueryRejection>) -> PageQuery {
    params.map(|Query(p)| p).unwrap_or_default()
}
