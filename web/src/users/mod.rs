//! Application user records and the persistence seam.
//!
//! The webhook handler only talks to [`UserStore`]; the binary wires in
//! [`MemoryUserStore`], and a database-backed store can replace it without
//! touching the handler.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryUserStore;

/// A user as stored by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Internal id, written back to Clerk as `appUserId`
    #[serde(rename = "_id")]
    pub id: String,
    pub clerk_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// Normalized record for `create_user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub clerk_id: String,
    pub email: Option<String>,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo: Option<String>,
}

/// Fields replaced by `update_user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user already exists for clerk id {0}")]
    Conflict(String),
    #[error("no user for clerk id {0}")]
    NotFound(String),
    #[error("user store unavailable: {0}")]
    Backend(String),
}

/// Create, update and delete application users keyed by Clerk id.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns `None` when the backend accepted the write but produced no record.
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, StoreError>;

    async fn update_user(&self, clerk_id: &str, update: UserUpdate) -> Result<User, StoreError>;

    async fn delete_user(&self, clerk_id: &str) -> Result<Option<User>, StoreError>;
}
