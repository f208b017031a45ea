//! Upload API endpoints
//!
//! Handles file uploads for content payloads:
//! - Images (image contents)
//! - Files (file contents)
//!
//! Uploads land under the configured upload directory and are served back
//! at /uploads/<name>. The returned path is what the content form submits
//! as image_path / file_path.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};

/// Response for successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Build the upload router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image", post(upload_image))
        .route("/file", post(upload_file))
}

/// POST /api/v1/upload/image - Upload a single image
///
/// Accepts multipart/form-data with a single file field named "file".
/// Only configured image MIME types are accepted.
async fn upload_image(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    save_upload(&state, multipart, true).await.map(Json)
}

/// POST /api/v1/upload/file - Upload a single file of any type
async fn upload_file(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    save_upload(&state, multipart, false).await.map(Json)
}

async fn save_upload(
    state: &AppState,
    mut multipart: Multipart,
    images_only: bool,
) -> Result<UploadResponse, ApiError> {
    let config = &state.upload_config;

    ensure_upload_dir(&config.path).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if images_only && !config.is_image_allowed(&content_type) {
            return Err(ApiError::validation_error(format!(
                "Invalid image type: {}. Allowed types: {:?}",
                content_type, config.image_types
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to read file: {}", e)))?;

        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::validation_error(format!(
                "File too large. Maximum size: {} bytes ({} MB)",
                config.max_file_size,
                config.max_file_size / 1024 / 1024
            )));
        }

        let ext = get_extension(&filename, &content_type, config);
        let new_filename = format!("{}.{}", Uuid::new_v4(), ext);
        let file_path = config.path.join(&new_filename);

        fs::write(&file_path, &data)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to save file: {}", e)))?;

        return Ok(UploadResponse {
            url: format!("/uploads/{}", new_filename),
            filename: new_filename,
            size: data.len() as u64,
            content_type,
        });
    }

    Err(ApiError::validation_error("No file provided"))
}

async fn ensure_upload_dir(path: &Path) -> Result<(), ApiError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create upload directory: {}", e)))
}

/// Preserve the original extension when present, otherwise derive one from
/// the MIME type.
fn get_extension(filename: &str, content_type: &str, config: &crate::config::UploadConfig) -> String {
    if let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) {
        if !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext.to_lowercase();
        }
    }
    config.get_extension(content_type).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;

    #[test]
    fn test_get_extension_prefers_filename() {
        let config = UploadConfig::default();
        assert_eq!(get_extension("photo.PNG", "image/jpeg", &config), "png");
    }

    #[test]
    fn test_get_extension_falls_back_to_mime() {
        let config = UploadConfig::default();
        assert_eq!(get_extension("photo", "image/jpeg", &config), "jpg");
        assert_eq!(get_extension("weird.....", "application/pdf", &config), "pdf");
    }
}
