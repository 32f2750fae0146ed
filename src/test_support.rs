// In-process stand-in for the Google token endpoint and the YouTube Data API,
// plus helpers for driving the router in tests.

use axum::{
    body::Body,
    extract::{Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{AppConfig, ClientSecrets};
use crate::models::credential::Credential;
use crate::session::SESSION_COOKIE;
use crate::youtube_client::PrivacyStatus;
use crate::AppState;

pub const MOCK_CODE: &str = "4/mock-authorization-code";
pub const MOCK_ACCESS_TOKEN: &str = "ya29.mock-access-token";
/// Valid token for an account that has no YouTube channel.
pub const MOCK_CHANNELLESS_TOKEN: &str = "ya29.mock-no-channel";
/// Valid token for an account with more uploads than one `videos.list` call may request.
pub const MOCK_LARGE_LIBRARY_TOKEN: &str = "ya29.mock-large-library";
pub const MOCK_LARGE_LIBRARY_SIZE: usize = 51;
/// Most ids `videos.list` accepts in one call.
const MOCK_MAX_VIDEO_IDS: usize = 50;
pub const MOCK_UPLOADED_ID: &str = "uploaded-video-id";
/// Upload title the mock rejects with 403.
pub const MOCK_REJECTED_TITLE: &str = "rejected by mock";

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub title: String,
    pub description: String,
    pub privacy_status: String,
    pub media_len: usize,
}

#[derive(Clone, Default)]
struct MockState {
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    video_batches: Arc<Mutex<Vec<usize>>>,
}

pub struct MockGoogle {
    pub base_url: String,
    pub uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    /// Number of ids requested by each `videos.list` call.
    pub video_batches: Arc<Mutex<Vec<usize>>>,
}

pub async fn spawn_mock_google() -> MockGoogle {
    let state = MockState::default();
    let uploads = state.uploads.clone();
    let video_batches = state.video_batches.clone();

    let router = Router::new()
        .route("/token", post(mock_token))
        .route("/youtube/v3/channels", get(mock_channels))
        .route("/youtube/v3/playlistItems", get(mock_playlist_items))
        .route("/youtube/v3/videos", get(mock_videos))
        .route("/upload/youtube/v3/videos", post(mock_upload))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockGoogle {
        base_url: format!("http://{}", addr),
        uploads,
        video_batches,
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| {
            [MOCK_ACCESS_TOKEN, MOCK_CHANNELLESS_TOKEN, MOCK_LARGE_LIBRARY_TOKEN].contains(token)
        })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": 401, "message": "Invalid Credentials"}})),
    )
        .into_response()
}

async fn mock_token(Form(params): Form<HashMap<String, String>>) -> Response {
    let valid = params.get("grant_type").map(String::as_str) == Some("authorization_code")
        && params.get("code").map(String::as_str) == Some(MOCK_CODE)
        && params.get("redirect_uri").map(String::as_str) == Some("http://localhost:8080/Callback");

    if !valid {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Bad Request"})),
        )
            .into_response();
    }

    Json(json!({
        "access_token": MOCK_ACCESS_TOKEN,
        "refresh_token": "1//mock-refresh-token",
        "expires_in": 3599,
        "token_type": "Bearer",
        "scope": "https://www.googleapis.com/auth/youtube.readonly https://www.googleapis.com/auth/youtube.upload"
    }))
    .into_response()
}

async fn mock_channels(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    if token == MOCK_CHANNELLESS_TOKEN {
        return Json(json!({"kind": "youtube#channelListResponse", "items": []})).into_response();
    }

    let uploads = if token == MOCK_LARGE_LIBRARY_TOKEN {
        "UU_mock_large"
    } else {
        "UU_mock_uploads"
    };
    let part = params.get("part").cloned().unwrap_or_default();
    let item = if part.contains("contentDetails") {
        json!({"id": "UC_mock", "contentDetails": {"relatedPlaylists": {"likes": "", "uploads": uploads}}})
    } else {
        json!({"id": "UC_mock", "snippet": {"title": "Mock Channel", "description": "Rust & video experiments"}})
    };

    Json(json!({"kind": "youtube#channelListResponse", "items": [item]})).into_response()
}

async fn mock_playlist_items(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let page_token = params.get("pageToken").map(String::as_str);
    match params.get("playlistId").map(String::as_str) {
        Some("UU_mock_uploads") => {}
        Some("UU_mock_large") => return Json(large_library_page(page_token)).into_response(),
        _ => return (StatusCode::NOT_FOUND, Json(json!({"error": {"code": 404}}))).into_response(),
    }

    let page = match page_token {
        None => json!({
            "items": [{"snippet": {"resourceId": {"kind": "youtube#video", "videoId": "vid-1"}}}],
            "nextPageToken": "page-2"
        }),
        Some("page-2") => json!({
            "items": [{"snippet": {"resourceId": {"kind": "youtube#video", "videoId": "vid-2"}}}]
        }),
        Some(_) => json!({"items": []}),
    };

    Json(page).into_response()
}

// Pages deliberately smaller than 50 so playlist paging and id batching don't line up
fn large_library_page(page_token: Option<&str>) -> serde_json::Value {
    let item = |n: usize| json!({"snippet": {"resourceId": {"kind": "youtube#video", "videoId": format!("large-{}", n)}}});
    match page_token {
        None => json!({
            "items": (1..=30).map(item).collect::<Vec<_>>(),
            "nextPageToken": "large-2"
        }),
        Some("large-2") => json!({
            "items": (31..=MOCK_LARGE_LIBRARY_SIZE).map(item).collect::<Vec<_>>()
        }),
        Some(_) => json!({"items": []}),
    }
}

async fn mock_videos(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }

    let ids: Vec<&str> = params
        .get("id")
        .map(String::as_str)
        .unwrap_or_default()
        .split(',')
        .filter(|id| !id.is_empty())
        .collect();
    state.video_batches.lock().await.push(ids.len());
    if ids.len() > MOCK_MAX_VIDEO_IDS {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": 400, "message": "Too many video ids"}})),
        )
            .into_response();
    }

    let items: Vec<_> = ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "id": id,
                "snippet": {"title": format!("Mock video {}", i + 1), "publishedAt": "2024-05-01T12:00:00Z"},
                "statistics": {"viewCount": "100", "likeCount": "7", "commentCount": "3"}
            })
        })
        .collect();

    Json(json!({"items": items})).into_response()
}

async fn mock_upload(
    State(state): State<MockState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }

    let mut metadata = serde_json::Value::Null;
    let mut media_len = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        match name.as_str() {
            "snippet" => metadata = serde_json::from_slice(&bytes).unwrap_or_default(),
            "media" => media_len = bytes.len(),
            _ => {}
        }
    }

    let field = |pointer: &str| {
        metadata
            .pointer(pointer)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let upload = RecordedUpload {
        title: field("/snippet/title"),
        description: field("/snippet/description"),
        privacy_status: field("/status/privacyStatus"),
        media_len,
    };

    if upload.title == MOCK_REJECTED_TITLE {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"code": 403, "message": "The request cannot be completed because you have exceeded your quota."}})),
        )
            .into_response();
    }

    state.uploads.lock().await.push(upload);
    Json(json!({"kind": "youtube#video", "id": MOCK_UPLOADED_ID})).into_response()
}

// ============================================================================
// Router helpers
// ============================================================================

pub fn test_secrets(base_url: &str) -> ClientSecrets {
    ClientSecrets {
        client_id: "test-client.apps.googleusercontent.com".to_string(),
        client_secret: "test-secret".to_string(),
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: format!("{}/token", base_url),
        redirect_uris: vec!["http://localhost:8080/Callback".to_string()],
    }
}

pub fn test_config(base_url: &str, upload_dir: &Path) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        client_secrets: test_secrets(base_url),
        scopes: crate::config::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        api_base: base_url.to_string(),
        privacy_status: PrivacyStatus::Private,
        max_upload_bytes: 16 * 1024 * 1024,
        session_ttl: Duration::from_secs(3600),
        upload_dir: upload_dir.to_path_buf(),
    }
}

pub fn test_state(base_url: &str, upload_dir: &Path) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(base_url, upload_dir)))
}

/// Create a session that already holds a credential for `access_token`.
pub async fn signed_in_session(state: &AppState, access_token: &str) -> Uuid {
    let id = state.sessions.create().await;
    state
        .sessions
        .store_credential(
            id,
            Credential {
                access_token: access_token.to_string(),
                refresh_token: None,
                token_type: "Bearer".to_string(),
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
                scopes: crate::config::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            },
        )
        .await;
    id
}

pub fn cookie_header(id: Uuid) -> String {
    format!("{}={}", SESSION_COOKIE, id)
}

pub enum FormField<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Encode a multipart/form-data body, returning the content type and the bytes.
pub fn multipart_body(fields: &[FormField<'_>]) -> (String, Vec<u8>) {
    let boundary = "----youtube-api-test-boundary";
    let mut body = Vec::new();

    for field in fields {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match field {
            FormField::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormField::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: video/mp4\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
