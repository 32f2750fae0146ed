// Server-side session store. The browser only carries a random session id in a cookie;
// the OAuth state and credential never leave the server.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::credential::Credential;

pub const SESSION_COOKIE: &str = "YTSESSION";

#[derive(Debug, Clone)]
struct Session {
    pending_state: Option<String>,
    credential: Option<Credential>,
    last_seen: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            pending_state: None,
            credential: None,
            last_seen: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1)),
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    fn is_stale(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_seen >= self.ttl
    }

    pub async fn create(&self) -> Uuid {
        self.purge_expired().await;

        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, Session::new(Utc::now()));
        tracing::debug!(session_id = %id, "session created");
        id
    }

    /// Reuse the caller's session if it is still live, otherwise start a new one.
    pub async fn resolve(&self, id: Option<Uuid>) -> Uuid {
        if let Some(id) = id {
            let now = Utc::now();
            let mut sessions = self.sessions.write().await;
            if let Some(session) = sessions.get_mut(&id) {
                if !self.is_stale(session, now) {
                    session.last_seen = now;
                    return id;
                }
                sessions.remove(&id);
            }
        }
        self.create().await
    }

    pub async fn set_pending_state(&self, id: Uuid, state: String) -> bool {
        self.with_live_session(id, |session| session.pending_state = Some(state))
            .await
            .is_some()
    }

    /// Pending state is single-use: reading it clears it.
    pub async fn take_pending_state(&self, id: Uuid) -> Option<String> {
        self.with_live_session(id, |session| session.pending_state.take())
            .await
            .flatten()
    }

    pub async fn store_credential(&self, id: Uuid, credential: Credential) -> bool {
        self.with_live_session(id, |session| session.credential = Some(credential))
            .await
            .is_some()
    }

    /// Replace a live pre-login session with a fresh id holding `credential`.
    /// Returns `None` if `old` is unknown or stale.
    pub async fn sign_in(&self, old: Uuid, credential: Credential) -> Option<Uuid> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let previous = sessions.remove(&old)?;
        if self.is_stale(&previous, now) {
            return None;
        }

        let id = Uuid::new_v4();
        let mut session = Session::new(now);
        session.credential = Some(credential);
        sessions.insert(id, session);
        tracing::debug!(old_session_id = %old, session_id = %id, "session rotated on sign-in");
        Some(id)
    }

    /// The session's credential, if the session is live and the token has not expired.
    pub async fn credential(&self, id: Uuid) -> Option<Credential> {
        let now = Utc::now();
        self.with_live_session(id, |session| session.credential.clone())
            .await
            .flatten()
            .filter(|credential| !credential.is_expired(now))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_stale(session, now));
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "expired sessions removed");
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn with_live_session<T>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let stale = match sessions.get(&id) {
            Some(session) => self.is_stale(session, now),
            None => return None,
        };
        if stale {
            sessions.remove(&id);
            return None;
        }

        let session = sessions.get_mut(&id)?;
        session.last_seen = now;
        Some(f(session))
    }
}

/// Session id from the request's `Cookie` header(s), if present and well-formed.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(id: Uuid, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, id, max_age_secs
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
