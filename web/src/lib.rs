//! Evently web gateway.
//!
//! Two pieces of the request pipeline:
//! - `POST /api/webhook/clerk`: verifies Svix-signed Clerk user events and
//!   mirrors them into the application's user store
//! - the route gate: decides which paths need a session before any handler runs
//!
//! ## Request flow
//!
//! ```text
//! Request → route gate → (public | ignored | guard) → handler
//! Clerk → Svix signature → WebhookEvent → UserStore (+ Clerk metadata on create)
//! ```

pub mod clerk;
pub mod config;
pub mod gate;
pub mod users;
pub mod web;

// Re-export commonly used types
pub use clerk::{ClerkClient, IdentityProvider, WebhookEvent};
pub use config::Config;
pub use gate::{Gatekeeper, RouteGate, SessionGuard, SessionPresenceGuard};
pub use users::{MemoryUserStore, UserStore};
pub use web::{router, AppState};
