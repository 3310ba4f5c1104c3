//! Paystack Webhook - Verified, Typed Webhook Handling
//!
//! This crate authenticates Paystack webhook deliveries, decodes them into
//! typed values and dispatches them to application listeners.
//!
//! # Features
//!
//! - **Signature Verification**: HMAC-SHA512 over the raw body, constant-time compare
//! - **Flexible Decoding**: tolerant booleans and double-encoded metadata
//! - **Lazy Transactions**: only charge events pay for typed decoding
//! - **Fault Isolation**: one failing listener never hides an event from the rest
//! - **HTTP Surface**: an axum router with health and Prometheus metrics
//!
//! # Architecture
//!
//! ```text
//! Paystack ──▶ axum router ──▶ WebhookDispatcher ──▶ WebhookListener(s)
//!                                   │
//!                                   ▼
//!                             WebhookHandler
//!                           ┌───────┴────────┐
//!                           ▼                ▼
//!                  SignatureVerifier    PayloadParser
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paystack_webhook::config::ServerConfig;
//! use paystack_webhook::webhook::{LoggingListener, WebhookDispatcher, WebhookHandler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::from_env()?;
//!     let handler = WebhookHandler::with_key(config.secret_key.clone());
//!     let mut dispatcher = WebhookDispatcher::with_handler(handler);
//!     dispatcher.add_listener(Arc::new(LoggingListener));
//!
//!     paystack_webhook::server::serve(&config, Arc::new(dispatcher)).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod webhook;

// Re-exports for convenience
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use webhook::{
    EventEnvelope, EventKind, SignatureVerifier, TransactionRecord, WebhookDispatcher,
    WebhookError, WebhookHandler, WebhookListener,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
