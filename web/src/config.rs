//! Configuration module for environment variable parsing.
//!
//! Configuration is read once at startup, except the webhook secret,
//! which is looked up by the webhook handler on every request.

use std::env;
use std::str::FromStr;

use tracing::warn;

/// Environment variable holding the Svix signing secret.
pub const WEBHOOK_SECRET_VAR: &str = "CLERK_WEBHOOK_SECRET";

/// Default base URL of the Clerk backend API.
pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1/";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Where the Svix signing secret for Clerk webhooks (`whsec_...`) comes from
    pub clerk_webhook_secret: SecretSource,

    /// Clerk backend secret key, used to write user metadata
    pub clerk_secret_key: Option<String>,

    /// Base URL of the Clerk backend API
    pub clerk_api_url: String,

    /// Maximum clock skew in seconds accepted on webhook timestamps
    pub webhook_tolerance_secs: u64,

    /// Where unauthenticated page requests are redirected
    pub sign_in_url: String,

    /// HTTP request timeout in milliseconds for outbound calls
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            clerk_webhook_secret: SecretSource::Env(WEBHOOK_SECRET_VAR),

            clerk_secret_key: env::var("CLERK_SECRET_KEY").ok(),

            clerk_api_url: env::var("CLERK_API_URL")
                .unwrap_or_else(|_| DEFAULT_CLERK_API_URL.to_string()),

            webhook_tolerance_secs: parse_or("WEBHOOK_TOLERANCE_SECS", 300),

            sign_in_url: env::var("SIGN_IN_URL").unwrap_or_else(|_| "/sign-in".to_string()),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 8000),
        }
    }

    /// The webhook secret, if one is configured and not blank.
    pub fn webhook_secret(&self) -> Option<String> {
        self.clerk_webhook_secret.resolve()
    }
}

/// Source of a secret that is resolved when it is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Read from the named environment variable on every lookup
    Env(&'static str),
    /// Fixed value
    Static(Option<String>),
}

impl SecretSource {
    /// Current value, with blank values treated as absent.
    pub fn resolve(&self) -> Option<String> {
        let raw = match self {
            Self::Env(name) => env::var(name).ok(),
            Self::Static(value) => value.clone(),
        };

        raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            clerk_webhook_secret: SecretSource::Static(None),
            clerk_secret_key: None,
            clerk_api_url: DEFAULT_CLERK_API_URL.to_string(),
            webhook_tolerance_secs: 300,
            sign_in_url: "/sign-in".to_string(),
            request_timeout_ms: 8000,
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// unset or malformed.
fn parse_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}
