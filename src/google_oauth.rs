// Google OAuth2 authorization-code flow helpers
// Docs: https://developers.google.com/identity/protocols/oauth2/web-server

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use reqwest::Client;
use serde::Deserialize;

use crate::config::ClientSecrets;
use crate::models::credential::Credential;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    pub fn into_credential(self, now: DateTime<Utc>) -> Credential {
        let lifetime = self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at: now + Duration::seconds(lifetime),
            scopes: self.scope.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// Build the Google consent-screen URL for the configured client.
pub fn build_authorization_url(secrets: &ClientSecrets, scopes: &[String], state: &str) -> String {
    let scope_string = scopes.join(" ");

    // access_type=offline plus prompt=consent makes Google hand out a refresh token every time
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
        secrets.auth_uri,
        urlencoding::encode(&secrets.client_id),
        urlencoding::encode(secrets.redirect_uri()),
        urlencoding::encode(&scope_string),
        urlencoding::encode(state)
    )
}

/// Exchange an authorization code for tokens at the client's token endpoint.
pub async fn exchange_code(
    client: &Client,
    secrets: &ClientSecrets,
    code: &str,
) -> Result<TokenResponse, OAuthError> {
    let params = [
        ("code", code),
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("redirect_uri", secrets.redirect_uri()),
        ("grant_type", "authorization_code"),
    ];

    let response = client.post(&secrets.token_uri).form(&params).send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await?;
        return Err(OAuthError::TokenEndpoint { status, body });
    }

    let token_response: TokenResponse = response.json().await?;
    tracing::debug!(scope = %token_response.scope, "authorization code exchanged");

    Ok(token_response)
}

/// Random URL-safe value for the OAuth `state` parameter.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(bytes)
}
