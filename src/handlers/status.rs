use crate::AppState;
use axum::{extract::Extension, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn status_routes() -> Router {
    Router::new().route("/api/status", get(api_status))
}

// API Status endpoint
pub async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "oauth": {
            "client_id": config.client_secrets.client_id,
            "redirect_uri": config.client_secrets.redirect_uri(),
            "scopes": config.scopes,
        },
        "uploads": {
            "privacy_status": config.privacy_status.as_str(),
            "max_upload_bytes": config.max_upload_bytes,
        },
        "active_sessions": state.sessions.len().await,
        "endpoints": {
            "authorize": "/authorize",
            "callback": "/Callback",
            "upload": "/video/upload",
            "videos": "/videos",
            "channel": "/channel",
            "logout": "/logout"
        }
    }))
}
