//! Payload decoding
//!
//! Two explicit passes: the envelope is decoded for every delivery, the
//! transaction record only when a caller asks for it.

use serde::Deserialize;
use serde_json::Value;

use crate::webhook::error::{WebhookError, WebhookResult};
use crate::webhook::events::EventEnvelope;
use crate::webhook::transaction::TransactionRecord;

/// Stateless decoder shared by the handler and dispatcher
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadParser;

impl PayloadParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode a raw body into an [`EventEnvelope`]
    ///
    /// The body must be a JSON object with a string `event`; anything else is
    /// `MalformedPayload`.
    pub fn decode_envelope(&self, raw: impl AsRef<[u8]>) -> WebhookResult<EventEnvelope> {
        let value: Value = serde_json::from_slice(raw.as_ref()).map_err(WebhookError::malformed)?;

        if !value.is_object() {
            return Err(WebhookError::MalformedPayload(
                "top-level payload must be a JSON object".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(WebhookError::malformed)
    }

    /// Decode an envelope's `data` into a [`TransactionRecord`]
    pub fn decode_transaction_record(&self, data: &Value) -> WebhookResult<TransactionRecord> {
        if !data.is_object() {
            return Err(WebhookError::MalformedPayload(
                "transaction data must be a JSON object".to_string(),
            ));
        }

        TransactionRecord::deserialize(data).map_err(WebhookError::malformed)
    }
}
