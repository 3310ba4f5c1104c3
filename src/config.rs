//! Receiver configuration
//!
//! Loaded from the environment by the binary. The webhook core itself never
//! reads the environment; it is handed a [`SecretKey`] by whoever builds it.
//!
//! - `PAYSTACK_SECRET_KEY` (required): secret key used to verify signatures
//! - `PAYSTACK_WEBHOOK_BIND` (optional): listen address, default `127.0.0.1:8080`
//! - `PAYSTACK_WEBHOOK_PATH` (optional): webhook route, default `/webhooks/paystack`

use std::env;
use std::net::SocketAddr;

use tracing::warn;

use crate::error::ConfigError;
use crate::webhook::SecretKey;

/// Environment variable holding the Paystack secret key
pub const SECRET_KEY_VAR: &str = "PAYSTACK_SECRET_KEY";
const BIND_VAR: &str = "PAYSTACK_WEBHOOK_BIND";
const PATH_VAR: &str = "PAYSTACK_WEBHOOK_PATH";

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default webhook route
pub const DEFAULT_PATH: &str = "/webhooks/paystack";

/// Configuration for the webhook receiver binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Secret key; redacted in `Debug`
    pub secret_key: SecretKey,
    /// Socket address to listen on
    pub bind_addr: SocketAddr,
    /// Route receiving webhook POSTs
    pub webhook_path: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVar` if `PAYSTACK_SECRET_KEY` is not set,
    /// and `ConfigError::InvalidValue` for a blank key, an unparsable bind
    /// address or a path not starting with `/`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = read_secret_var()?;
        let bind = env::var(BIND_VAR).ok();
        let path = env::var(PATH_VAR).ok();

        Self::from_parts(&secret, bind.as_deref(), path.as_deref())
    }

    /// Build from explicit values, applying defaults for `None`
    pub fn from_parts(
        secret: &str,
        bind: Option<&str>,
        path: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let secret_key = parse_secret(secret)?;

        let bind_addr = bind
            .unwrap_or(DEFAULT_BIND)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                name: BIND_VAR,
                reason: e.to_string(),
            })?;

        let webhook_path = validate_path(path.unwrap_or(DEFAULT_PATH))?;

        let config = Self {
            secret_key,
            bind_addr,
            webhook_path,
        };
        config.warn_if_exposed();
        Ok(config)
    }

    /// Override the bind address
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self.warn_if_exposed();
        self
    }

    /// Override the webhook path, applying the same check as `from_parts`
    pub fn with_webhook_path(mut self, path: impl Into<String>) -> Result<Self, ConfigError> {
        self.webhook_path = validate_path(&path.into())?;
        Ok(self)
    }

    fn warn_if_exposed(&self) {
        if self.bind_addr.ip().is_unspecified() {
            warn!("Webhook receiver will listen on all interfaces ({})", self.bind_addr);
        }
    }
}

/// Read and validate the secret key from `PAYSTACK_SECRET_KEY`
///
/// Used on its own by commands that only need to sign or verify.
pub fn secret_key_from_env() -> Result<SecretKey, ConfigError> {
    parse_secret(&read_secret_var()?)
}

fn read_secret_var() -> Result<String, ConfigError> {
    env::var(SECRET_KEY_VAR).map_err(|_| ConfigError::MissingVar(SECRET_KEY_VAR))
}

fn parse_secret(secret: &str) -> Result<SecretKey, ConfigError> {
    let secret_key = SecretKey::new(secret).map_err(|e| ConfigError::InvalidValue {
        name: SECRET_KEY_VAR,
        reason: e.to_string(),
    })?;

    if !secret.starts_with("sk_") {
        warn!("{} does not look like a Paystack secret key (sk_...)", SECRET_KEY_VAR);
    }
    Ok(secret_key)
}

// axum panics on routes that do not start with '/'
fn validate_path(path: &str) -> Result<String, ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::InvalidValue {
            name: PATH_VAR,
            reason: "path must start with '/'".to_string(),
        });
    }
    Ok(path.to_string())
}
