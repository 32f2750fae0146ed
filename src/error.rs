use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::google_oauth::OAuthError;
use crate::youtube_client::YouTubeError;

/// Handler error. Every variant renders as a plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated() -> Self {
        AppError::Unauthorized("User not authenticated".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = %status.as_u16(), error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

impl From<OAuthError> for AppError {
    fn from(err: OAuthError) -> Self {
        AppError::Upstream(format!("Failed to exchange authorization code: {}", err))
    }
}

impl From<YouTubeError> for AppError {
    fn from(err: YouTubeError) -> Self {
        match err {
            YouTubeError::NoChannel => AppError::NotFound(YouTubeError::NoChannel.to_string()),
            YouTubeError::Io(e) => AppError::Internal(format!("I/O error: {}", e)),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}
