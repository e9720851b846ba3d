//! In-process user store.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::RngCore;
use tokio::sync::RwLock;
use tracing::info;

use super::{NewUser, StoreError, User, UserStore, UserUpdate};

/// Users held in memory, keyed by Clerk id.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a user by Clerk id.
    pub async fn get(&self, clerk_id: &str) -> Option<User> {
        self.users.read().await.get(clerk_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

/// 12 random bytes as 24 hex characters, the shape of a document id.
fn generate_id() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.clerk_id) {
            return Err(StoreError::Conflict(user.clerk_id));
        }

        let record = User {
            id: generate_id(),
            clerk_id: user.clerk_id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            photo: user.photo,
        };

        users.insert(record.clerk_id.clone(), record.clone());
        info!(clerk_id = %record.clerk_id, user_id = %record.id, "user_created");

        Ok(Some(record))
    }

    async fn update_user(&self, clerk_id: &str, update: UserUpdate) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        let record = users
            .get_mut(clerk_id)
            .ok_or_else(|| StoreError::NotFound(clerk_id.to_string()))?;

        record.username = update.username;
        record.first_name = update.first_name;
        record.last_name = update.last_name;
        record.photo = update.photo;

        info!(clerk_id = %clerk_id, user_id = %record.id, "user_updated");

        Ok(record.clone())
    }

    async fn delete_user(&self, clerk_id: &str) -> Result<Option<User>, StoreError> {
        let removed = self
            .users
            .write()
            .await
            .remove(clerk_id)
            .ok_or_else(|| StoreError::NotFound(clerk_id.to_string()))?;

        info!(clerk_id = %clerk_id, user_id = %removed.id, "user_deleted");

        Ok(Some(removed))
    }
}
