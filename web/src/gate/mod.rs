//! Route gate middleware.
//!
//! Every selected request is classified against two immutable pattern
//! lists built at startup:
//! - `public`: pages and endpoints reachable without a session
//! - `ignored`: endpoints the auth layer must never touch (webhooks, uploads)
//!
//! Paths in neither list are protected and go through the [`SessionGuard`].

pub mod filter;
pub mod guard;
pub mod pattern;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

pub use filter::is_selected;
pub use guard::{AuthChallenge, SessionGuard, SessionPresenceGuard};
pub use pattern::{PatternError, RouteMatcher};

/// Routes reachable without a session.
pub const PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/sign-in(.*)",
    "/sign-up(.*)",
    "/events/:id",
    "/api/uploadthing",
    "/api/webhook/clerk",
    "/api/webhook/stripe",
];

/// Routes the auth layer skips entirely.
pub const IGNORED_ROUTES: &[&str] = &[
    "/api/uploadthing",
    "/api/webhook/clerk",
    "/api/webhook/stripe",
];

/// Result of matching a path against both lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteClassification {
    pub public: bool,
    pub ignored: bool,
}

impl RouteClassification {
    pub fn requires_auth(&self) -> bool {
        !self.public && !self.ignored
    }
}

/// The public and ignored route lists.
#[derive(Debug, Clone)]
pub struct RouteGate {
    public: RouteMatcher,
    ignored: RouteMatcher,
}

impl RouteGate {
    pub fn new(public: RouteMatcher, ignored: RouteMatcher) -> Self {
        Self { public, ignored }
    }

    /// The application's route lists.
    pub fn standard() -> Result<Self, PatternError> {
        Ok(Self::new(
            RouteMatcher::new(PUBLIC_ROUTES.iter().copied())?,
            RouteMatcher::new(IGNORED_ROUTES.iter().copied())?,
        ))
    }

    pub fn classify(&self, path: &str) -> RouteClassification {
        RouteClassification {
            public: self.public.matches(path),
            ignored: self.ignored.matches(path),
        }
    }
}

/// Middleware state: the route lists plus the guard for protected paths.
#[derive(Clone)]
pub struct Gatekeeper {
    pub gate: Arc<RouteGate>,
    pub guard: Arc<dyn SessionGuard>,
}

impl Gatekeeper {
    pub fn new(gate: RouteGate, guard: Arc<dyn SessionGuard>) -> Self {
        Self {
            gate: Arc::new(gate),
            guard,
        }
    }
}

/// Axum middleware applying the gate to each request.
///
/// Unselected, public and ignored requests pass through unmodified.
pub async fn route_gate(State(keeper): State<Gatekeeper>, req: Request, next: Next) -> Response {
    if !is_selected(req.uri().path()) {
        return next.run(req).await;
    }

    let class = keeper.gate.classify(req.uri().path());
    if !class.requires_auth() {
        debug!(
            path = %req.uri().path(),
            public = class.public,
            ignored = class.ignored,
            "route_gate_bypass"
        );
        return next.run(req).await;
    }

    // Body is not Sync, so only the parts are borrowed across the guard call
    let (parts, body) = req.into_parts();
    if let Err(challenge) = keeper.guard.authorize(&parts.headers, &parts.uri).await {
        info!(path = %parts.uri.path(), challenge = ?challenge, "route_gate_challenged");
        return challenge.into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{HeaderMap, StatusCode, Uri},
        middleware::from_fn_with_state,
        Router,
    };
    use tower::ServiceExt;

    use super::*;

    /// Counts calls and lets everything through.
    #[derive(Default)]
    struct CountingGuard {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionGuard for CountingGuard {
        async fn authorize(&self, _headers: &HeaderMap, _uri: &Uri) -> Result<(), AuthChallenge> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn app(guard: Arc<dyn SessionGuard>) -> Router {
        let keeper = Gatekeeper::new(RouteGate::standard().unwrap(), guard);
        Router::new()
            .fallback(|| async { "ok" })
            .layer(from_fn_with_state(keeper, route_gate))
    }

    async fn hit(app: Router, path: &str) -> StatusCode {
        let req = axum::http::Request::builder()
            .uri(path)
            .body(Body::empty())
            .unwrap();
        app.oneshot(req).await.unwrap().status()
    }

    #[test]
    fn test_classify() {
        let gate = RouteGate::standard().unwrap();

        let home = gate.classify("/");
        assert!(home.public && !home.ignored);

        let webhook = gate.classify("/api/webhook/clerk");
        assert!(webhook.public && webhook.ignored);
        assert!(!webhook.requires_auth());

        assert!(gate.classify("/sign-up/verify").public);
        assert!(gate.classify("/events/42").public);
        assert!(gate.classify("/events/42/edit").requires_auth());
        assert!(gate.classify("/dashboard").requires_auth());
        assert!(gate.classify("/api/orders").requires_auth());
    }

    #[tokio::test]
    async fn test_guard_invocation_by_path() {
        let cases = [
            ("/sign-in/factor-one", 0),
            ("/dashboard", 1),
            ("/api/webhook/clerk", 0),
            ("/api/uploadthing", 0),
            ("/events/abc123", 0),
            ("/profile", 1),
            ("/_next/static/app.js", 0),
            ("/logo.png", 0),
        ];

        for (path, expected) in cases {
            let guard = Arc::new(CountingGuard::default());
            let status = hit(app(guard.clone()), path).await;

            assert_eq!(status, StatusCode::OK, "path {}", path);
            assert_eq!(guard.calls.load(Ordering::SeqCst), expected, "path {}", path);
        }
    }

    #[tokio::test]
    async fn test_challenge_short_circuits() {
        let guard = Arc::new(SessionPresenceGuard::new("/sign-in"));

        assert_eq!(
            hit(app(guard.clone()), "/dashboard").await,
            StatusCode::TEMPORARY_REDIRECT
        );
        assert_eq!(
            hit(app(guard.clone()), "/api/orders").await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(hit(app(guard), "/").await, StatusCode::OK);
    }
}
