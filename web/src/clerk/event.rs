//! Clerk webhook event types.
//!
//! Clerk wraps every event in an envelope of the form
//! `{"type": "user.created", "object": "event", "data": {...}}`.
//! Only the user lifecycle events are decoded; any other type is kept as
//! [`WebhookEvent::Other`] so callers can acknowledge it.

use serde::Deserialize;
use serde_json::Value;

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

/// A verified Clerk webhook event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawEvent")]
pub enum WebhookEvent {
    UserCreated(UserPayload),
    UserUpdated(UserPayload),
    UserDeleted(DeletedPayload),
    /// Any event type this service does not handle.
    Other { event_type: String },
}

impl WebhookEvent {
    /// The event type string as sent by Clerk.
    pub fn event_type(&self) -> &str {
        match self {
            Self::UserCreated(_) => USER_CREATED,
            Self::UserUpdated(_) => USER_UPDATED,
            Self::UserDeleted(_) => USER_DELETED,
            Self::Other { event_type } => event_type,
        }
    }
}

/// User attributes carried by `user.created` and `user.updated`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserPayload {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl UserPayload {
    /// First email address on the account, if any.
    pub fn first_email(&self) -> Option<&str> {
        self.email_addresses
            .first()
            .map(|e| e.email_address.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub id: Option<String>,
    pub email_address: String,
}

/// Payload of `user.deleted`: only the id survives deletion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeletedPayload {
    pub id: String,
    #[serde(default)]
    pub deleted: Option<bool>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawEvent> for WebhookEvent {
    type Error = serde_json::Error;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let event = match raw.event_type.as_str() {
            USER_CREATED => Self::UserCreated(serde_json::from_value(raw.data)?),
            USER_UPDATED => Self::UserUpdated(serde_json::from_value(raw.data)?),
            USER_DELETED => Self::UserDeleted(serde_json::from_value(raw.data)?),
            _ => Self::Other {
                event_type: raw.event_type,
            },
        };

        Ok(event)
    }
}
