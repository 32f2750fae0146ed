// OAuth handlers: consent redirect, authorization-code callback and sign-out

use crate::error::AppError;
use crate::google_oauth;
use crate::session::{clear_session_cookie, session_cookie, session_id_from_headers};
use crate::utils::escape_html;
use crate::AppState;
use axum::{
    extract::{Extension, Query},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn oauth_routes() -> Router {
    Router::new()
        .route("/authorize", get(authorize))
        .route("/Callback", get(oauth_callback))
        .route("/logout", get(logout))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Redirect the browser to Google's consent screen.
pub async fn authorize(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let session_id = state.sessions.resolve(session_id_from_headers(&headers)).await;

    let csrf_state = google_oauth::generate_state();
    if !state.sessions.set_pending_state(session_id, csrf_state.clone()).await {
        tracing::warn!(session_id = %session_id, "Session vanished before the OAuth state was stored");
    }

    let auth_url = google_oauth::build_authorization_url(
        &state.config.client_secrets,
        &state.config.scopes,
        &csrf_state,
    );

    tracing::info!(session_id = %session_id, "Redirecting to Google consent screen");

    (
        [(header::SET_COOKIE, session_cookie(session_id, state.sessions.ttl_secs()))],
        Redirect::to(&auth_url),
    )
        .into_response()
}

/// Handle Google's redirect back: exchange the code, keep the credential in the session
/// and answer with the channel description and an upload form.
pub async fn oauth_callback(
    Query(params): Query<CallbackQuery>,
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(error) = params.error {
        tracing::warn!("Google OAuth returned an error: {}", error);
        let page = format!(
            r#"<!DOCTYPE html><html><head><title>Authorization Failed</title></head>
<body><h1>Authorization Failed</h1><p>Error: {}</p>
<a href="/authorize">Try Again</a></body></html>"#,
            escape_html(&error)
        );
        return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let session_id = session_id_from_headers(&headers).ok_or_else(|| {
        AppError::BadRequest("No session found; start the sign-in at /authorize".to_string())
    })?;

    let expected_state = state.sessions.take_pending_state(session_id).await;
    match (expected_state, params.state) {
        (Some(expected), Some(received)) if expected == received => {}
        _ => {
            tracing::warn!(session_id = %session_id, "OAuth state mismatch on callback");
            return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
        }
    }

    let token_response =
        google_oauth::exchange_code(&state.http, &state.config.client_secrets, &code)
            .await
            .map_err(|e| {
                tracing::error!("Failed to exchange authorization code: {}", e);
                AppError::from(e)
            })?;

    let credential = token_response.into_credential(chrono::Utc::now());
    let access_token = credential.access_token.clone();
    // Signed-in sessions never reuse the id handed out before login
    let signed_in_id = state
        .sessions
        .sign_in(session_id, credential)
        .await
        .ok_or_else(|| {
            AppError::BadRequest("Session expired during sign-in; start again at /authorize".to_string())
        })?;
    tracing::info!(session_id = %signed_in_id, "Google credential stored in session");

    let description = match state.youtube.channel_description(&access_token).await {
        Ok(description) => format!(
            "<p>This is my channel description: {}</p>",
            escape_html(&description)
        ),
        Err(e) => {
            tracing::warn!("Could not fetch channel description: {}", e);
            format!(
                "<p>Channel description unavailable: {}</p>",
                escape_html(&e.to_string())
            )
        }
    };

    Ok((
        [(header::SET_COOKIE, session_cookie(signed_in_id, state.sessions.ttl_secs()))],
        Html(callback_page(&description)),
    )
        .into_response())
}

fn callback_page(description_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>YouTube API - Signed In</title>
    <style>body {{ font-family: Arial, sans-serif; max-width: 640px; margin: 50px auto; }}</style>
</head>
<body>
    <h1>Signed in with Google</h1>
    {}
    <h2>Upload a video</h2>
    <form action="/video/upload" method="post" enctype="multipart/form-data">
        <p><label>Title <input type="text" name="videoTitle" required></label></p>
        <p><label>Description <textarea name="videoDescription"></textarea></label></p>
        <p><input type="file" name="videoFile" accept="video/*" required></p>
        <p><button type="submit">Upload</button></p>
    </form>
    <p><a href="/videos">My uploaded videos</a> | <a href="/logout">Sign out</a></p>
</body>
</html>"#,
        description_html
    )
}

pub async fn logout(Extension(state): Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(session_id) = session_id_from_headers(&headers) {
        if state.sessions.remove(session_id).await {
            tracing::info!(session_id = %session_id, "Session signed out");
        }
    }

    (
        [(header::SET_COOKIE, clear_session_cookie())],
        "Signed out",
    )
        .into_response()
}
