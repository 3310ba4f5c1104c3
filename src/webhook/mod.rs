// Callback and variant names mirror the vendor's event names
#![allow(missing_docs)]

//! Paystack Webhook Module
//!
//! Authenticates, decodes and dispatches Paystack webhook deliveries:
//!
//! - **Signature Verification**: HMAC-SHA512 of the raw body, compared in
//!   constant time against the `x-paystack-signature` header
//! - **Payload Decoding**: a minimal envelope for every event, typed
//!   transaction records only for charge events
//! - **Flexible Values**: booleans sent as numbers or strings, metadata sent
//!   as double-encoded JSON
//! - **Dispatch**: one routing table from event kind to listener callback,
//!   with each listener's failure isolated from the others
//!
//! # Architecture
//!
//! ```text
//! body + signature -> SignatureVerifier -> PayloadParser -> EventEnvelope
//!                           |                                   |
//!                           v                                   v
//!                    InvalidSignature                  WebhookDispatcher
//!                                                              |
//!                                                              v
//!                                                  WebhookListener callbacks
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use paystack_webhook::webhook::{TransactionRecord, WebhookDispatcher, WebhookListener};
//!
//! struct Fulfilment;
//!
//! impl WebhookListener for Fulfilment {
//!     fn on_charge_success(&self, transaction: &TransactionRecord) -> anyhow::Result<()> {
//!         println!("paid: {:?}", transaction.reference);
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), paystack_webhook::webhook::WebhookError> {
//! let mut dispatcher = WebhookDispatcher::new("sk_test_xxx")?;
//! dispatcher.add_listener(Arc::new(Fulfilment));
//!
//! let body = r#"{"event":"charge.success","data":{"reference":"T-1"}}"#;
//! let signature = dispatcher.handler().verifier().sign(body).unwrap_or_default();
//! assert!(dispatcher.dispatch(body, &signature));
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod flexible;
pub mod handler;
pub mod listener;
pub mod parser;
pub mod signature;
pub mod transaction;

// Re-export commonly used items
pub use dispatcher::{DispatchReport, FailureReporter, TracingReporter, WebhookDispatcher};
pub use error::{CoercionError, ListenerFailure, WebhookError, WebhookResult};
pub use events::{EventEnvelope, EventFamily, EventKind};
pub use flexible::{coerce_bool, coerce_metadata, FlexibleScalar};
pub use handler::WebhookHandler;
pub use listener::{LoggingListener, NoOpListener, Route, WebhookListener};
pub use parser::PayloadParser;
pub use signature::{SecretKey, SignatureVerifier, SIGNATURE_HEADER};
pub use transaction::{
    Authorization, CustomField, Customer, Metadata, TransactionRecord, TransactionStatus,
};
