// Video handlers: upload through a temporary file, list uploads, show channel description

use crate::error::AppError;
use crate::middleware::credential::{credential_middleware, SignedIn};
use crate::youtube_client::format_video_list;
use crate::AppState;
use axum::{
    extract::{
        multipart::{Field, MultipartError},
        DefaultBodyLimit, Extension, Multipart,
    },
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

pub fn video_routes(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/video/upload", post(upload_video))
        .route("/videos", get(list_uploaded_videos))
        .route("/channel", get(channel_description))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(axum::middleware::from_fn(credential_middleware))
}

/// Upload a video from the `videoTitle`, `videoDescription` and `videoFile` multipart fields.
/// The file is spooled to a temporary file that is removed when the request ends.
pub async fn upload_video(
    Extension(state): Extension<Arc<AppState>>,
    Extension(signed_in): Extension<SignedIn>,
    mut multipart: Multipart,
) -> Result<String, AppError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut video_file: Option<NamedTempFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "videoTitle" => title = Some(read_text(field).await?),
            "videoDescription" => description = Some(read_text(field).await?),
            "videoFile" => video_file = Some(spool_to_temp_file(&state, field).await?),
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing videoTitle".to_string()))?;
    let description =
        description.ok_or_else(|| AppError::BadRequest("Missing videoDescription".to_string()))?;
    let video_file =
        video_file.ok_or_else(|| AppError::BadRequest("Missing videoFile".to_string()))?;

    if !signed_in.credential.has_scope(UPLOAD_SCOPE) {
        tracing::warn!(
            session_id = %signed_in.session_id,
            "Credential was not granted the upload scope; YouTube will likely reject the upload"
        );
    }

    let result = state
        .youtube
        .upload_video(
            &signed_in.credential.access_token,
            video_file.path(),
            &title,
            &description,
        )
        .await;

    // Dropping the handle deletes the temporary file
    if let Err(e) = video_file.close() {
        tracing::warn!("Failed to remove temporary upload file: {}", e);
    }

    result.map_err(|e| {
        tracing::error!("Video upload failed: {}", e);
        AppError::Upstream(format!("Error occurred during video upload: {}", e))
    })
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| multipart_error("Invalid multipart field", e))
}

// Oversized bodies map to 413
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    let message = format!("{}: {}", context, err.body_text());
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(message),
        status if status.is_server_error() => AppError::Internal(message),
        _ => AppError::BadRequest(message),
    }
}

async fn spool_to_temp_file(state: &AppState, mut field: Field<'_>) -> Result<NamedTempFile, AppError> {
    let temp_file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".tmp")
        .tempfile_in(&state.config.upload_dir)?;

    let mut writer = tokio::fs::File::from_std(temp_file.reopen()?);
    let mut written: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error("Failed to read videoFile", e))?
    {
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;

    tracing::debug!("Spooled {} bytes to {}", written, temp_file.path().display());
    Ok(temp_file)
}

/// HTML list of every video in the caller's uploads playlist.
pub async fn list_uploaded_videos(
    Extension(state): Extension<Arc<AppState>>,
    Extension(signed_in): Extension<SignedIn>,
) -> Result<Html<String>, AppError> {
    let videos = state
        .youtube
        .uploaded_videos(&signed_in.credential.access_token)
        .await?;

    if videos.is_empty() {
        return Ok(Html("<p>No uploaded videos found.</p>".to_string()));
    }

    Ok(Html(format_video_list(&videos)))
}

pub async fn channel_description(
    Extension(state): Extension<Arc<AppState>>,
    Extension(signed_in): Extension<SignedIn>,
) -> Result<String, AppError> {
    Ok(state
        .youtube
        .channel_description(&signed_in.credential.access_token)
        .await?)
}
