use crate::error::AppError;
use crate::models::credential::Credential;
use crate::session::session_id_from_headers;
use crate::AppState;
use axum::{
    extract::{Extension, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// Session and credential of the signed-in caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session_id: Uuid,
    pub credential: Credential,
}

/// Rejects requests whose session holds no live credential with 401.
/// Runs before the handler, so request bodies are never read for anonymous callers.
pub async fn credential_middleware(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(session_id) = session_id_from_headers(&headers) else {
        tracing::debug!("no session cookie on protected route");
        return Err(AppError::unauthenticated());
    };

    let credential = match state.sessions.credential(session_id).await {
        Some(credential) => credential,
        None => {
            tracing::debug!(session_id = %session_id, "session has no live credential");
            return Err(AppError::unauthenticated());
        }
    };

    request.extensions_mut().insert(SignedIn {
        session_id,
        credential,
    });

    Ok(next.run(request).await)
}
