//! Clerk integration: webhook event types and the backend API client.

pub mod client;
pub mod event;

pub use client::{ClerkClient, ClerkError, IdentityProvider, PublicMetadata};
pub use event::{DeletedPayload, EmailAddress, UserPayload, WebhookEvent};
