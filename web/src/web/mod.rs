//! Web server module.
//!
//! This module provides the HTTP surface:
//! - Receives Clerk user webhooks and syncs them into the user store
//! - Runs every request through the route gate
//! - Exposes a health check outside the gate

pub mod handlers;
pub mod signature;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::gate::route_gate;

pub use handlers::{
    clerk_webhook, health, AppState, HealthResponse, WebhookError, WebhookResponse,
};
pub use signature::{SvixHeaders, VerifyError, Webhook};

/// Path Clerk delivers user webhooks to.
pub const CLERK_WEBHOOK_PATH: &str = "/api/webhook/clerk";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CLERK_WEBHOOK_PATH, post(clerk_webhook))
        .layer(from_fn_with_state(state.gatekeeper.clone(), route_gate))
        // Added after the gate layer so probes never need a session
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
