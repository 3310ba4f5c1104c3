//! Error types for the Paystack webhook receiver
//!
//! The webhook core reports through [`WebhookError`]; this module wraps it
//! together with the failures the host surface (configuration, server
//! start-up, file access) can hit.

use thiserror::Error;

use crate::webhook::WebhookError;

/// The main error type for the crate's host surface
#[derive(Error, Debug)]
pub enum Error {
    /// Webhook authentication, decoding or construction errors
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("{0} environment variable not set")]
    MissingVar(&'static str),

    /// A variable is set but unusable
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type alias for host-surface operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }
}
