// Runtime configuration: environment variables plus the Google client-secrets file
// Secrets format: https://developers.google.com/api-client-library/dotnet/guide/aaa_client_secrets

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::youtube_client::{PrivacyStatus, DEFAULT_API_BASE};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SECRETS_PATH: &str = "client_secrets.json";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/Callback";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/youtube.readonly",
    "https://www.googleapis.com/auth/youtube.upload",
];

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read client secrets from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid client secrets: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("client secrets contain neither a \"web\" nor an \"installed\" section")]
    MissingSection,
    #[error("client secrets do not list any redirect URI")]
    NoRedirectUri,
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// OAuth client registration as downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    web: Option<ClientSecrets>,
    installed: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ClientSecrets {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: ClientSecretsFile = serde_json::from_str(raw)?;
        let secrets = file
            .web
            .or(file.installed)
            .ok_or(ConfigError::MissingSection)?;

        if secrets.redirect_uris.is_empty() {
            return Err(ConfigError::NoRedirectUri);
        }

        Ok(secrets)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Client registration built from explicit values instead of a secrets file.
    pub fn from_parts(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            redirect_uris: vec![redirect_uri],
        }
    }

    /// The redirect URI used for both the consent URL and the token exchange.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub client_secrets: ClientSecrets,
    pub scopes: Vec<String>,
    pub api_base: String,
    pub privacy_status: PrivacyStatus,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    pub upload_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_secrets = match (
            lookup("GOOGLE_OAUTH_CLIENT_ID"),
            lookup("GOOGLE_OAUTH_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => {
                let redirect_uri = lookup("GOOGLE_OAUTH_REDIRECT_URI")
                    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
                tracing::info!("Using Google OAuth client from environment");
                ClientSecrets::from_parts(client_id, client_secret, redirect_uri)
            }
            _ => {
                let path = lookup("GOOGLE_CLIENT_SECRETS")
                    .unwrap_or_else(|| DEFAULT_SECRETS_PATH.to_string());
                tracing::info!("Loading Google client secrets from {}", path);
                ClientSecrets::load(Path::new(&path))?
            }
        };

        let scopes = match lookup("YOUTUBE_SCOPES") {
            Some(raw) => parse_scopes(&raw),
            None => DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        };
        if scopes.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "YOUTUBE_SCOPES",
                value: String::new(),
            });
        }

        let privacy_status: PrivacyStatus = match lookup("UPLOAD_PRIVACY_STATUS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "UPLOAD_PRIVACY_STATUS",
                value: raw,
            })?,
            None => PrivacyStatus::default(),
        };

        let max_upload_bytes = parse_number(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        if max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_UPLOAD_BYTES",
                value: "0".to_string(),
            });
        }
        // A zero TTL would make every session stale the moment it is created
        let session_ttl_secs = parse_number(&lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SESSION_TTL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            client_secrets,
            scopes,
            api_base: lookup("YOUTUBE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            privacy_status,
            max_upload_bytes,
            session_ttl: Duration::from_secs(session_ttl_secs),
            upload_dir: lookup("UPLOAD_TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
        })
    }
}

/// Scopes may be separated by whitespace or commas. Short names get the Google prefix.
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with("https://") {
                s.to_string()
            } else {
                format!("https://www.googleapis.com/auth/{}", s)
            }
        })
        .collect()
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}
