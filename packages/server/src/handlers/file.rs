use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use hashbin_common::storage::ContentHash;
use hashbin_common::{DeleteOutcome, DownloadOutcome, UploadOutcome};
use tokio_util::io::ReaderStream;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::BasicAuthUser;
use crate::models::file::{HealthResponse, MessageResponse, UploadResponse};
use crate::state::AppState;
use crate::utils::filename::{FilenameError, validate_flat_filename};

const NOT_FOUND: &str = "File not found.";
const NOT_FOUND_OR_UNAUTHORIZED: &str = "File not found or unauthorized.";

/// Multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn upload_body_limit(max_upload_size: u64) -> DefaultBodyLimit {
    let limit = max_upload_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Files",
    operation_id = "uploadFile",
    summary = "Upload a file",
    description = "Stores the `file` multipart part under the SHA-256 of its content. \
        Content that is already stored is not written again; the response then \
        carries a message and the existing hash. Only the first uploader owns the content.",
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 201, description = "File stored, or already present", body = UploadResponse),
        (status = 400, description = "No file part, no filename, or storage failure", body = ErrorBody),
        (status = 401, description = "Missing or invalid credentials", body = ErrorBody),
    ),
    security(("basic" = [])),
)]
#[instrument(skip(state, user, multipart), fields(user = %user.username))]
pub async fn upload_file(
    user: BasicAuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max_size = state.config.storage.max_upload_size;
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let mut content = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(format!("Upload read error: {e}")))?
        {
            if (content.len() + chunk.len()) as u64 > max_size {
                return Err(AppError::BadRequest(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            content.extend_from_slice(&chunk);
        }
        upload = Some((file_name, content));
        break;
    }

    let (file_name, content) = upload.ok_or_else(|| AppError::BadRequest("No file part.".into()))?;

    let filename = match validate_flat_filename(file_name.as_deref().unwrap_or_default()) {
        Ok(name) => name.to_string(),
        Err(FilenameError::Empty) => return Err(AppError::BadRequest("No selected file.".into())),
        Err(e) => return Err(AppError::BadRequest(e.message().into())),
    };

    match state
        .engine
        .upload(&content, &filename, &user.principal())
        .await
    {
        UploadOutcome::Created { hash } => {
            info!(%hash, %filename, "File uploaded");
            Ok((
                StatusCode::CREATED,
                Json(UploadResponse {
                    message: None,
                    file_hash: hash.to_hex(),
                }),
            ))
        }
        UploadOutcome::AlreadyExists { hash } => Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                message: Some("File already exists.".into()),
                file_hash: hash.to_hex(),
            }),
        )),
        UploadOutcome::Failure(failure) => Err(failure.into()),
    }
}

#[utoipa::path(
    get,
    path = "/download/{hash}",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download a file",
    description = "Streams the stored content as an attachment under its original filename. \
        No authentication is required; the hash is the capability.",
    params(("hash" = String, Path, description = "SHA-256 content hash, hex")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "No such file", body = ErrorBody),
        (status = 500, description = "Stored content could not be read", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Response, AppError> {
    let hash: ContentHash = hash
        .parse()
        .map_err(|_| AppError::NotFound(NOT_FOUND.into()))?;

    let (record, blob) = match state.engine.download(&hash).await {
        DownloadOutcome::Found { record, blob } => (record, blob),
        DownloadOutcome::NotFound | DownloadOutcome::IntegrityAnomaly { .. } => {
            return Err(AppError::NotFound(NOT_FOUND.into()));
        }
        DownloadOutcome::Failure(failure) => return Err(failure.into()),
    };

    let body = Body::from_stream(ReaderStream::new(blob.reader));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, blob.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&record.filename),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    info!(filename = %record.filename, "File downloaded");
    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/delete/{hash}",
    tag = "Files",
    operation_id = "deleteFile",
    summary = "Delete a file",
    description = "Removes the content and its metadata. Only the original uploader may \
        delete; anyone else gets the same 404 as for a hash that was never stored.",
    params(("hash" = String, Path, description = "SHA-256 content hash, hex")),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorBody),
        (status = 404, description = "No such file, or not the owner", body = ErrorBody),
        (status = 500, description = "Deletion failed", body = ErrorBody),
    ),
    security(("basic" = [])),
)]
#[instrument(skip(state, user), fields(user = %user.username))]
pub async fn delete_file(
    user: BasicAuthUser,
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let hash: ContentHash = hash
        .parse()
        .map_err(|_| AppError::NotFound(NOT_FOUND_OR_UNAUTHORIZED.into()))?;

    match state.engine.delete(&hash, &user.principal()).await {
        DeleteOutcome::Deleted => Ok(Json(MessageResponse {
            message: "File deleted.".into(),
        })),
        DeleteOutcome::NotFound | DeleteOutcome::Unauthorized => {
            Err(AppError::NotFound(NOT_FOUND_OR_UNAUTHORIZED.into()))
        }
        DeleteOutcome::Failure(failure) => Err(failure.into()),
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "health",
    summary = "Liveness probe",
    responses((status = 200, description = "Server is up", body = HealthResponse)),
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.trim().is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    if encoded == ascii_name {
        format!("attachment; filename=\"{ascii_name}\"")
    } else {
        format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
    }
}
