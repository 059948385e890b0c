//! Product image upload.
//!
//! Multipart upload for administrators. Files land in the configured upload
//! directory under a generated name and are served back via `/uploads/*`.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// File extensions accepted for product images.
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Where an uploaded image ended up.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
}

/// Accept a multipart image and store it under a unique name.
pub async fn upload(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
        .ok_or_else(|| AppError::BadRequest("no file in upload".to_string()))?;

    let extension = field
        .file_name()
        .and_then(|name| name.rsplit('.').next())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "unsupported file type; expected one of: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to read upload: {e}")))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("uploaded file is empty".to_string()));
    }

    let filename = format!("{}.{extension}", Uuid::new_v4());
    let dir = std::path::Path::new(&state.config().upload_dir);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("upload dir unavailable: {e}")))?;
    tokio::fs::write(dir.join(&filename), &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to store upload: {e}")))?;

    tracing::info!(%filename, size = bytes.len(), "stored product image");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            image_url: format!("/uploads/{filename}"),
        }),
    ))
}
