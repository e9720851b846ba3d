//! Clerk backend API client.
//!
//! Only the metadata endpoint is used: after a user is created locally, the
//! internal id is written back to Clerk so both systems can find each other.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

/// Public metadata stored on the Clerk user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicMetadata {
    #[serde(rename = "appUserId")]
    pub app_user_id: String,
}

#[derive(Serialize)]
struct MetadataUpdate<'a> {
    public_metadata: &'a PublicMetadata,
}

#[derive(Debug, Error)]
pub enum ClerkError {
    #[error("CLERK_SECRET_KEY is not configured")]
    NotConfigured,
    #[error("invalid Clerk API url: {0}")]
    InvalidUrl(String),
    #[error("Clerk request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Clerk API returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Writes per-user metadata on the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn update_user_metadata(
        &self,
        clerk_id: &str,
        metadata: &PublicMetadata,
    ) -> Result<(), ClerkError>;
}

/// reqwest-backed Clerk client.
#[derive(Clone)]
pub struct ClerkClient {
    http: Client,
    api_url: Url,
    secret_key: Option<String>,
}

impl ClerkClient {
    pub fn new(
        api_url: &str,
        secret_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClerkError> {
        let api_url = Url::parse(api_url).map_err(|e| ClerkError::InvalidUrl(e.to_string()))?;
        if api_url.cannot_be_a_base() {
            return Err(ClerkError::InvalidUrl(api_url.to_string()));
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_url,
            secret_key: secret_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn metadata_url(&self, clerk_id: &str) -> Url {
        let mut url = self.api_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["users", clerk_id, "metadata"]);
        }
        url
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn update_user_metadata(
        &self,
        clerk_id: &str,
        metadata: &PublicMetadata,
    ) -> Result<(), ClerkError> {
        let secret_key = self.secret_key.as_deref().ok_or(ClerkError::NotConfigured)?;
        let url = self.metadata_url(clerk_id);

        let resp = self
            .http
            .patch(url)
            .bearer_auth(secret_key)
            .json(&MetadataUpdate {
                public_metadata: metadata,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(
                clerk_id = %clerk_id,
                status_code = status.as_u16(),
                "clerk_metadata_update_failed"
            );
            return Err(ClerkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            clerk_id = %clerk_id,
            app_user_id = %metadata.app_user_id,
            "clerk_metadata_updated"
        );

        Ok(())
    }
}
