//! Per-identity upstream cookie jars.
//!
//! Each logged-in client owns one session: the email it authenticated with
//! and the opaque cookies the upstream site handed back. Sessions live from
//! login to logout; there is no expiry, refresh, or validation of the
//! upstream cookies.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Response,
};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tokio::sync::RwLock;

/// Name of the cookie this proxy sets on its own clients.
pub const SESSION_COOKIE: &str = "session";

/// One client's authenticated state against the upstream site.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    /// Upstream cookies, replayed verbatim on authenticated fetches.
    pub cookies: Vec<(String, String)>,
}

impl Session {
    /// Render the jar as a `Cookie` header value.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// In-memory token-to-session map shared across requests.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session and return the token to hand to the client.
    pub async fn create(&self, email: String, cookies: Vec<(String, String)>) -> String {
        let token = generate_session_token();
        let session = Session { email, cookies };
        self.inner.write().await.insert(token.clone(), session);
        token
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        self.inner.read().await.get(token).cloned()
    }

    pub async fn remove(&self, token: &str) -> Option<Session> {
        self.inner.write().await.remove(token)
    }
}

/// Generate a random session token.
fn generate_session_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Current session (if any), resolved from the request's `session` cookie.
/// Use this extractor when authentication is optional.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<(String, Session)>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = SessionStore::from_ref(state);

        let token = parts
            .headers
            .get("cookie")
            .and_then(|h| h.to_str().ok())
            .and_then(|cookies| {
                cookies.split(';').find_map(|cookie| {
                    cookie
                        .trim()
                        .strip_prefix(SESSION_COOKIE)
                        .and_then(|rest| rest.strip_prefix('='))
                })
            })
            .map(String::from);

        let Some(token) = token else {
            return Ok(MaybeSession(None));
        };

        match store.get(&token).await {
            Some(session) => Ok(MaybeSession(Some((token, session)))),
            None => Ok(MaybeSession(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_token() {
        let token1 = generate_session_token();
        let token2 = generate_session_token();

        assert_eq!(token1.len(), 64);
        assert_ne!(token1, token2);
        assert!(token1.chars().all(|c| c.is_alphanumeric()));
    }

    #[test]
    fn test_cookie_header() {
        let session = Session {
            email: "a@b.example".to_string(),
            cookies: vec![
                ("sid".to_string(), "abc".to_string()),
                ("csrf".to_string(), "xyz".to_string()),
            ],
        };
        assert_eq!(session.cookie_header(), "sid=abc; csrf=xyz");
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let store = SessionStore::new();

        let token = store
            .create("user@example.com".to_string(), vec![("sid".into(), "1".into())])
            .await;

        let session = store.get(&token).await.expect("session should exist");
        assert_eq!(session.email, "user@example.com");

        let removed = store.remove(&token).await;
        assert!(removed.is_some());
        assert!(store.get(&token).await.is_none());
    }
}
