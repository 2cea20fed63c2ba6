//! Cookie sessions and one-shot flash messages.

use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::Redirect;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use museum_core::Actor;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "heritage_session";

const TOKEN_BYTES: usize = 32;

/// Sessions unused for this long are forgotten
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        }
    }
}

/// A notice shown once on the next rendered page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Clone, Debug)]
struct SessionData {
    /// None after logout; the session lives on to carry the farewell flash
    actor: Option<Actor>,
    flashes: Vec<Flash>,
    last_seen: Instant,
}

impl SessionData {
    fn is_expired(&self, now: Instant, idle: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > idle
    }
}

/// Server-side session table keyed by random token
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, SessionData>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::default(),
            idle_timeout,
        }
    }

    /// Start a logged-in session and return its token.
    ///
    /// Expired sessions are purged first.
    pub async fn create(&self, actor: Actor) -> String {
        let token = new_token();
        let now = Instant::now();
        let data = SessionData {
            actor: Some(actor),
            flashes: Vec::new(),
            last_seen: now,
        };
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.idle_timeout));
        if sessions.len() < before {
            tracing::debug!("Purged {} idle sessions", before - sessions.len());
        }
        sessions.insert(token.clone(), data);
        token
    }

    /// The logged-in actor, refreshing the idle clock
    pub async fn actor(&self, token: &str) -> Option<Actor> {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(token)?;
        if session.is_expired(now, self.idle_timeout) {
            sessions.remove(token);
            return None;
        }
        session.last_seen = now;
        session.actor.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn flash(&self, token: &str, kind: FlashKind, message: impl Into<String>) {
        if let Some(session) = self.inner.write().await.get_mut(token) {
            session.flashes.push(Flash {
                kind,
                message: message.into(),
            });
        }
    }

    /// Remove and return pending flashes.
    ///
    /// A logged-out session has nothing left to carry and is dropped.
    pub async fn take_flashes(&self, token: &str) -> Vec<Flash> {
        let mut sessions = self.inner.write().await;
        let Some(session) = sessions.get_mut(token) else {
            return Vec::new();
        };
        let flashes = std::mem::take(&mut session.flashes);
        if session.actor.is_none() {
            sessions.remove(token);
        }
        flashes
    }

    /// Forget the actor but keep the session for its flashes
    pub async fn logout(&self, token: &str) {
        if let Some(session) = self.inner.write().await.get_mut(token) {
            session.actor = None;
            session.flashes.clear();
            session.flashes.push(Flash {
                kind: FlashKind::Success,
                message: "Logged out.".into(),
            });
        }
    }

    pub async fn remove(&self, token: &str) {
        self.inner.write().await.remove(token);
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Session token from the request's Cookie header, if any
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value installing a session token
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token
    )
}

/// A request made by a logged-in user.
///
/// Extraction fails with a redirect to the login page, remembering the path.
pub struct CurrentUser {
    pub token: String,
    pub actor: Actor,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = session_token(&parts.headers) {
            if let Some(actor) = state.sessions.actor(&token).await {
                return Ok(CurrentUser { token, actor });
            }
        }
        tracing::debug!("Unauthenticated request for {}", parts.uri.path());
        Err(Redirect::to(&format!("/login?next={}", parts.uri.path())))
    }
}
