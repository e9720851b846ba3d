//! Webhook endpoint handlers.
//!
//! The Clerk handler:
//! 1. Requires the webhook secret to be configured
//! 2. Verifies the Svix signature over the raw body
//! 3. Applies the user lifecycle event to the user store
//!
//! Verification failures are logged with detail but answered generically.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::clerk::{
    ClerkError, DeletedPayload, IdentityProvider, PublicMetadata, UserPayload, WebhookEvent,
};
use crate::gate::Gatekeeper;
use crate::users::{NewUser, StoreError, User, UserStore, UserUpdate};
use crate::web::signature::{SvixHeaders, VerifyError, Webhook};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub gatekeeper: Gatekeeper,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        identity: Arc<dyn IdentityProvider>,
        gatekeeper: Gatekeeper,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users,
            identity,
            gatekeeper,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Clerk Webhook
// =============================================================================

/// Failures of the Clerk webhook endpoint.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook secret is not configured")]
    MissingSecret,
    #[error("webhook secret is malformed")]
    InvalidSecret,
    #[error("svix headers are missing")]
    MissingHeaders,
    #[error("webhook verification failed: {0}")]
    Verification(#[source] VerifyError),
    #[error("event for {clerk_id} has no username")]
    MissingUsername { clerk_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Identity(#[from] ClerkError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingSecret => (StatusCode::BAD_REQUEST, "Missing Clerk webhook secret"),
            Self::InvalidSecret => (StatusCode::BAD_REQUEST, "Invalid Clerk webhook secret"),
            Self::MissingHeaders => (StatusCode::BAD_REQUEST, "Missing Svix headers"),
            Self::Verification(_) => (StatusCode::BAD_REQUEST, "Invalid webhook"),
            Self::MissingUsername { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "Missing username"),
            Self::Store(_) | Self::Identity(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        (status, message).into_response()
    }
}

/// Acknowledgment body for handled user events.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WebhookResponse {
    Created {
        message: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<User>,
    },
    Updated {
        message: &'static str,
        updated: User,
    },
    Deleted {
        message: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        deleted: Option<User>,
    },
}

/// Clerk webhook endpoint (`POST /api/webhook/clerk`).
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, WebhookError> {
    let Some(secret) = state.config.webhook_secret() else {
        error!("clerk_webhook_secret_missing");
        return Err(WebhookError::MissingSecret);
    };

    let Some(svix) = SvixHeaders::from_headers(&headers) else {
        warn!(body_length = body.len(), "clerk_webhook_headers_missing");
        return Err(WebhookError::MissingHeaders);
    };

    let webhook = Webhook::new(&secret)
        .map_err(|e| {
            error!(error = %e, "clerk_webhook_secret_invalid");
            WebhookError::InvalidSecret
        })?
        .with_tolerance(state.config.webhook_tolerance_secs);

    let event: WebhookEvent = webhook.verify(&body, &svix).map_err(|e| {
        error!(
            svix_id = %svix.id,
            svix_timestamp = %svix.timestamp,
            error = %e,
            "clerk_webhook_verification_failed"
        );
        WebhookError::Verification(e)
    })?;

    info!(
        svix_id = %svix.id,
        event_type = %event.event_type(),
        "clerk_webhook_received"
    );

    match event {
        WebhookEvent::UserCreated(data) => user_created(&state, data).await,
        WebhookEvent::UserUpdated(data) => user_updated(&state, data).await,
        WebhookEvent::UserDeleted(data) => user_deleted(&state, data).await,
        WebhookEvent::Other { event_type } => {
            info!(svix_id = %svix.id, event_type = %event_type, "clerk_webhook_ignored");
            Ok(StatusCode::OK.into_response())
        }
    }
}

fn require_username(data: &UserPayload) -> Result<String, WebhookError> {
    data.username
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            warn!(clerk_id = %data.id, "clerk_webhook_username_missing");
            WebhookError::MissingUsername {
                clerk_id: data.id.clone(),
            }
        })
}

async fn user_created(state: &AppState, data: UserPayload) -> Result<Response, WebhookError> {
    let username = require_username(&data)?;
    let email = data.first_email().map(String::from);
    let clerk_id = data.id;

    let user = state
        .users
        .create_user(NewUser {
            clerk_id: clerk_id.clone(),
            email,
            username,
            first_name: data.first_name,
            last_name: data.last_name,
            photo: data.image_url,
        })
        .await
        .inspect_err(|e| error!(clerk_id = %clerk_id, error = %e, "user_create_failed"))?;

    // Link the Clerk record back to ours
    if let Some(user) = &user {
        let metadata = PublicMetadata {
            app_user_id: user.id.clone(),
        };
        state
            .identity
            .update_user_metadata(&clerk_id, &metadata)
            .await
            .inspect_err(|e| error!(clerk_id = %clerk_id, error = %e, "user_link_failed"))?;
    }

    info!(clerk_id = %clerk_id, created = user.is_some(), "clerk_user_created");

    Ok(Json(WebhookResponse::Created {
        message: "User created",
        user,
    })
    .into_response())
}

async fn user_updated(state: &AppState, data: UserPayload) -> Result<Response, WebhookError> {
    let username = require_username(&data)?;
    let clerk_id = data.id;

    let updated = state
        .users
        .update_user(
            &clerk_id,
            UserUpdate {
                username,
                first_name: data.first_name,
                last_name: data.last_name,
                photo: data.image_url,
            },
        )
        .await
        .inspect_err(|e| error!(clerk_id = %clerk_id, error = %e, "user_update_failed"))?;

    info!(clerk_id = %clerk_id, "clerk_user_updated");

    Ok(Json(WebhookResponse::Updated {
        message: "User updated",
        updated,
    })
    .into_response())
}

async fn user_deleted(state: &AppState, data: DeletedPayload) -> Result<Response, WebhookError> {
    let deleted = state
        .users
        .delete_user(&data.id)
        .await
        .inspect_err(|e| error!(clerk_id = %data.id, error = %e, "user_delete_failed"))?;

    info!(clerk_id = %data.id, "clerk_user_deleted");

    Ok(Json(WebhookResponse::Deleted {
        message: "User deleted",
        deleted,
    })
    .into_response())
}
