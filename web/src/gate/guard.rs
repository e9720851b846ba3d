//! Session guards invoked for protected routes.

use async_trait::async_trait;
use axum::{
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use tracing::debug;
use url::form_urlencoded;

/// Name of the cookie Clerk stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

/// What a guard answers when a request has no usable session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChallenge {
    /// Send the browser to the sign-in page.
    SignIn { location: String },
    /// Reject an API call outright.
    Unauthorized,
}

#[derive(Serialize)]
struct ChallengeBody {
    error: &'static str,
}

impl IntoResponse for AuthChallenge {
    fn into_response(self) -> Response {
        match self {
            Self::SignIn { location } => Redirect::temporary(&location).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ChallengeBody {
                    error: "unauthenticated",
                }),
            )
                .into_response(),
        }
    }
}

/// Decides whether a request to a protected route may proceed.
#[async_trait]
pub trait SessionGuard: Send + Sync {
    async fn authorize(&self, headers: &HeaderMap, uri: &Uri) -> Result<(), AuthChallenge>;
}

/// Requires a session token to be present, either as the `__session`
/// cookie or as a bearer token. Token verification belongs to the
/// session library behind it.
#[derive(Debug, Clone)]
pub struct SessionPresenceGuard {
    sign_in_url: String,
}

impl SessionPresenceGuard {
    pub fn new(sign_in_url: impl Into<String>) -> Self {
        Self {
            sign_in_url: sign_in_url.into(),
        }
    }

    fn sign_in_location(&self, uri: &Uri) -> String {
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        let sep = if self.sign_in_url.contains('?') { '&' } else { '?' };

        format!("{}{}redirect_url={}", self.sign_in_url, sep, encoded)
    }
}

#[async_trait]
impl SessionGuard for SessionPresenceGuard {
    async fn authorize(&self, headers: &HeaderMap, uri: &Uri) -> Result<(), AuthChallenge> {
        if session_token(headers).is_some() {
            return Ok(());
        }

        debug!(path = %uri.path(), "session_missing");

        let path = uri.path();
        if path.starts_with("/api") || path.starts_with("/trpc") {
            Err(AuthChallenge::Unauthorized)
        } else {
            Err(AuthChallenge::SignIn {
                location: self.sign_in_location(uri),
            })
        }
    }
}

/// Session token from the bearer header or the session cookie.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn guard() -> SessionPresenceGuard {
        SessionPresenceGuard::new("/sign-in")
    }

    #[test]
    fn test_session_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok_1"));
        assert_eq!(session_token(&headers), Some("tok_1"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_session_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; __session=eyJhbGciOi; other=1"),
        );
        assert_eq!(session_token(&headers), Some("eyJhbGciOi"));

        headers.insert(header::COOKIE, HeaderValue::from_static("__session=; __client=x"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_sign_in_location() {
        let uri: Uri = "/dashboard?tab=orders".parse().unwrap();
        assert_eq!(
            guard().sign_in_location(&uri),
            "/sign-in?redirect_url=%2Fdashboard%3Ftab%3Dorders"
        );

        let guard = SessionPresenceGuard::new("https://accounts.example.com/sign-in?x=1");
        let uri: Uri = "/profile".parse().unwrap();
        assert_eq!(
            guard.sign_in_location(&uri),
            "https://accounts.example.com/sign-in?x=1&redirect_url=%2Fprofile"
        );
    }

    #[tokio::test]
    async fn test_authorize() {
        let mut headers = HeaderMap::new();
        let page: Uri = "/dashboard".parse().unwrap();
        let api: Uri = "/api/orders".parse().unwrap();

        assert_eq!(
            guard().authorize(&headers, &page).await,
            Err(AuthChallenge::SignIn {
                location: "/sign-in?redirect_url=%2Fdashboard".to_string()
            })
        );
        assert_eq!(
            guard().authorize(&headers, &api).await,
            Err(AuthChallenge::Unauthorized)
        );

        headers.insert(header::COOKIE, HeaderValue::from_static("__session=abc"));
        assert_eq!(guard().authorize(&headers, &page).await, Ok(()));
        assert_eq!(guard().authorize(&headers, &api).await, Ok(()));
    }

    #[test]
    fn test_challenge_responses() {
        let resp = AuthChallenge::SignIn {
            location: "/sign-in".to_string(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers()[header::LOCATION], "/sign-in");

        let resp = AuthChallenge::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
