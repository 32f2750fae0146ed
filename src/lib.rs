// lib.rs - YouTube OAuth backend: routes, shared state and module exports
pub mod config;
pub mod error;
pub mod google_oauth;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod session;
pub mod utils;
pub mod youtube_client;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{Extension, Router};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::session::SessionStore;
use crate::youtube_client::YouTubeClient;

// AppState holds the loaded configuration, the shared HTTP client, the YouTube client and the session store
pub struct AppState {
    pub config: AppConfig,
    pub http: reqwest::Client,
    pub youtube: YouTubeClient,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let http = reqwest::Client::new();
        let youtube = YouTubeClient::new(http.clone(), &config.api_base, config.privacy_status);
        let sessions = SessionStore::new(config.session_ttl);

        Self {
            config,
            http,
            youtube,
            sessions,
        }
    }
}

/// Build the application router with all routes and the shared state attached.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::oauth::oauth_routes())
        .merge(handlers::video::video_routes(state.config.max_upload_bytes))
        .merge(handlers::status::status_routes())
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(Extension(state))
}
