//! File relay endpoints
//!
//! - `POST /api/files` - relay one or more files through the server
//! - `GET /api/files` - list files the script service has stored

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{info, warn};

use crate::models::{AppState, FileUploadOutcome};
use crate::relay::{IncomingFile, StoredFile};
use crate::types::{AppError, AppResult, UploadStatus};

/// Multipart field carrying files.
pub const FILE_FIELD: &str = "file";
pub const FILE_NAME_HEADER: &str = "x-file-name";
pub const FILE_TYPE_HEADER: &str = "x-file-type";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/files",
            get(list_files).post(upload_files).fallback(method_not_allowed),
        )
        .with_state(state)
}

async fn upload_files(
    State(state): State<AppState>,
    request: Request,
) -> AppResult<Json<Vec<FileUploadOutcome>>> {
    info!("Handling file relay request");

    let relay = state
        .relay
        .clone()
        .ok_or_else(|| AppError::Unavailable("relay target is not configured".to_string()))?;

    let files = collect_files(&state, request).await?;
    if files.is_empty() {
        return Err(AppError::BadRequest("No files in request".to_string()));
    }

    info!(
        count = files.len(),
        names = ?files.iter().map(|f| f.original_name.as_str()).collect::<Vec<_>>(),
        "Files received"
    );

    // One file at a time; each gets exactly one attempt
    let mut outcomes = Vec::with_capacity(files.len());
    for file in files {
        let name = file.original_name.clone();
        match relay.relay(file).await {
            Ok(stored) => outcomes.push(FileUploadOutcome::stored(name, stored)),
            Err(e) => {
                warn!(file = %name, error = %e, "File relay failed");
                outcomes.push(FileUploadOutcome::failed(name, e.to_string()));
            }
        }
    }

    let succeeded = outcomes
        .iter()
        .filter(|o| o.status() == UploadStatus::Success)
        .count();
    info!(
        succeeded,
        failed = outcomes.len() - succeeded,
        "File relay finished"
    );

    Ok(Json(outcomes))
}

async fn collect_files(state: &AppState, request: Request) -> AppResult<Vec<IncomingFile>> {
    if is_multipart(request.headers()) {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| AppError::FormParse(e.body_text()))?;

        let mut files = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::FormParse(e.body_text()))?
        {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            let name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::FormParse(e.body_text()))?;
            files.push(IncomingFile::new(name, content_type, data));
        }
        return Ok(files);
    }

    // Raw body: metadata travels in headers
    let headers = request.headers().clone();
    let name = header_str(&headers, FILE_NAME_HEADER)
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .unwrap_or_else(|| "upload".to_string());
    let content_type = header_str(&headers, FILE_TYPE_HEADER)
        .or_else(|| header_str(&headers, header::CONTENT_TYPE.as_str()))
        .map(str::to_string);

    let data = axum::body::to_bytes(request.into_body(), state.config.relay.max_upload_bytes)
        .await
        .map_err(|e| AppError::FormParse(e.to_string()))?;

    if data.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![IncomingFile::new(name, content_type, data)])
}

fn is_multipart(headers: &HeaderMap) -> bool {
    header_str(headers, header::CONTENT_TYPE.as_str())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

async fn list_files(State(state): State<AppState>) -> AppResult<Json<Vec<StoredFile>>> {
    let script = state
        .script
        .clone()
        .ok_or_else(|| AppError::Unavailable("SCRIPT_URL is not configured".to_string()))?;

    Ok(Json(script.list_files().await?))
}

async fn method_not_allowed(method: Method) -> impl IntoResponse {
    info!(method = %method, "Method not allowed on /api/files");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, POST")],
        format!("Method {} Not Allowed", method),
    )
}
