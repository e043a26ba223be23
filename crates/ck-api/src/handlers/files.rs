//! File API handlers

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use ck_files::FileInfo;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::AppState;

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub size: usize,
    pub content_type: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FileList {
    pub files: Vec<FileInfo>,
    pub total: usize,
}

fn multipart_error(err: MultipartError, max_size: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::too_large(max_size)
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// POST /files/upload
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let max_size = state.storage.max_size();
    let failed = |err: MultipartError| multipart_error(err, max_size);

    while let Some(field) = multipart.next_field().await.map_err(failed)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => return Err(ApiError::bad_request("No filename provided")),
        };
        let data = field.bytes().await.map_err(failed)?;

        let stored = state.storage.save(&filename, data).await?;
        tracing::info!(
            storage = state.storage.name(),
            filename = %stored.filename,
            size = stored.size,
            digest = %stored.digest,
            "File uploaded"
        );

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                filename: stored.filename,
                size: stored.size,
                content_type: stored.content_type,
                message: "File uploaded successfully",
            }),
        ));
    }

    Err(ApiError::bad_request("No file provided"))
}

/// GET /files/download/:filename
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let data = state.storage.read(&filename).await?;
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}

/// GET /files/list
pub async fn list_files(State(state): State<AppState>) -> ApiResult<Json<FileList>> {
    let files = state.storage.list().await?;
    Ok(Json(FileList {
        total: files.len(),
        files,
    }))
}

/// DELETE /files/:filename
pub async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<StatusCode> {
    state.storage.delete(&filename).await?;
    tracing::info!(storage = state.storage.name(), filename = %filename, "File deleted");
    Ok(StatusCode::NO_CONTENT)
}
