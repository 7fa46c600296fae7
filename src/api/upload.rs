//! Upload endpoints
//!
//! Thin HTTP wrappers around [`CloudStorage`]. Storage failures collapse to a
//! single 500 response per operation; with `upload.expose_not_found` enabled
//! a missing object is reported as 404 instead.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::config::UploadConfig;
use crate::error::AppError;
use crate::metrics::{
    HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL, UPLOAD_BYTES_TOTAL, UPLOADS_TOTAL,
};

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
}

/// A file part read fully into memory
struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Create the upload router
///
/// The body limit leaves room for multipart framing; the per-file cap is
/// enforced while reading the part.
pub fn upload_router(max_file_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_file))
        .route("/upload/doc", post(upload_doc))
        .route("/upload/list", get(list_files))
        .route("/upload/files/:filename", get(download_file))
        .route("/upload/:filename", delete(delete_file))
        .layer(DefaultBodyLimit::max(
            max_file_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}

/// POST /upload
async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    handle_upload(state, multipart, "/upload").await
}

/// POST /upload/doc
async fn upload_doc(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    handle_upload(state, multipart, "/upload/doc").await
}

async fn handle_upload(
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
    endpoint: &str,
) -> Result<Json<UploadResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", endpoint])
        .start_timer();

    let result = async {
        let mut multipart =
            multipart.map_err(|_| AppError::Validation("No file uploaded".to_string()))?;
        let file = read_file_part(&mut multipart, state.config.upload.max_file_bytes)
            .await?
            .ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

        let size = file.data.len();
        let url = state
            .storage
            .upload(file.data, &file.filename, file.content_type.as_deref())
            .await
            .map_err(|e| collapse(&state.config.upload, e, "Upload failed"))?;

        UPLOADS_TOTAL.inc();
        UPLOAD_BYTES_TOTAL.inc_by(size as f64);

        Ok(Json(UploadResponse { url }))
    }
    .await;

    count_request("POST", endpoint, &result);
    result
}

/// GET /upload/list
async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/upload/list"])
        .start_timer();

    let prefix = query.prefix.as_deref().filter(|prefix| !prefix.is_empty());
    let result = state
        .storage
        .list(prefix)
        .await
        .map(|files| Json(ListResponse { files }))
        .map_err(|e| collapse(&state.config.upload, e, "List failed"));

    count_request("GET", "/upload/list", &result);
    result
}

/// GET /upload/files/:filename
async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/upload/files/:filename"])
        .start_timer();

    let result = state
        .storage
        .download(&filename)
        .await
        .map(|data| {
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/octet-stream")],
                data,
            )
                .into_response()
        })
        .map_err(|e| collapse(&state.config.upload, e, "Download failed"));

    count_request("GET", "/upload/files/:filename", &result);
    result
}

/// DELETE /upload/:filename
async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/upload/:filename"])
        .start_timer();

    let result = state
        .storage
        .delete(&filename)
        .await
        .map(|()| {
            Json(MessageResponse {
                message: "File deleted successfully".to_string(),
            })
        })
        .map_err(|e| collapse(&state.config.upload, e, "Delete failed"));

    count_request("DELETE", "/upload/:filename", &result);
    result
}

/// Read the first `file` part, enforcing the size cap chunk by chunk
///
/// Returns `None` when the form carries no `file` part.
async fn read_file_part(
    multipart: &mut Multipart,
    max_size: usize,
) -> Result<Option<UploadedFile>, AppError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_size))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}", ulid::Ulid::new()));
        let content_type = field.content_type().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_size))?
        {
            if data.len() + chunk.len() > max_size {
                return Err(AppError::PayloadTooLarge(max_size));
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(Some(UploadedFile {
            filename,
            content_type,
            data,
        }));
    }

    Ok(None)
}

fn multipart_error(error: axum::extract::multipart::MultipartError, max_size: usize) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(max_size)
    } else {
        AppError::Validation(format!("Failed to parse multipart: {}", error.body_text()))
    }
}

/// Map a storage failure to the client-facing error
fn collapse(config: &UploadConfig, error: AppError, message: &str) -> AppError {
    tracing::error!(error = %error, kind = error.kind(), "{message}");

    match error {
        AppError::NotFound(name) if config.expose_not_found => AppError::NotFound(name),
        _ => AppError::Storage(message.to_string()),
    }
}

fn count_request<T>(method: &str, endpoint: &str, result: &Result<T, AppError>) {
    let status = match result {
        Ok(_) => "200",
        Err(AppError::Validation(_)) => "400",
        Err(AppError::NotFound(_)) => "404",
        Err(AppError::PayloadTooLarge(_)) => "413",
        Err(_) => "500",
    };
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, status])
        .inc();
}
