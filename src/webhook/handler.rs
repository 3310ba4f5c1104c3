//! Verify-then-parse
//!
//! Composes [`SignatureVerifier`] and [`PayloadParser`]. An unverified body
//! is never decoded into a trusted structure, and an authentication failure
//! is always reported as [`WebhookError::InvalidSignature`], never as a
//! malformed payload.

use crate::webhook::error::{WebhookError, WebhookResult};
use crate::webhook::events::EventEnvelope;
use crate::webhook::parser::PayloadParser;
use crate::webhook::signature::{SecretKey, SignatureVerifier};
use crate::webhook::transaction::TransactionRecord;

/// Authenticates and decodes Paystack deliveries
#[derive(Debug, Clone)]
pub struct WebhookHandler {
    verifier: SignatureVerifier,
    parser: PayloadParser,
}

impl WebhookHandler {
    /// Create a handler; fails fast on an empty or blank secret key
    pub fn new(secret_key: impl Into<String>) -> WebhookResult<Self> {
        Ok(Self::with_key(SecretKey::new(secret_key)?))
    }

    pub fn with_key(secret_key: SecretKey) -> Self {
        Self {
            verifier: SignatureVerifier::with_key(secret_key),
            parser: PayloadParser::new(),
        }
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub fn parser(&self) -> &PayloadParser {
        &self.parser
    }

    /// Check that a delivery really comes from Paystack
    pub fn verify_signature(&self, payload: impl AsRef<[u8]>, signature: &str) -> bool {
        self.verifier.verify(payload, signature)
    }

    /// Decode a body without authenticating it
    pub fn parse(&self, payload: impl AsRef<[u8]>) -> WebhookResult<EventEnvelope> {
        self.parser.decode_envelope(payload)
    }

    /// Authenticate, then decode
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` if the signature does not match; the body is not
    ///   decoded at all in that case.
    /// - `MalformedPayload` if an authenticated body is not a valid envelope.
    pub fn verify_and_parse(
        &self,
        payload: impl AsRef<[u8]>,
        signature: &str,
    ) -> WebhookResult<EventEnvelope> {
        let payload = payload.as_ref();
        if !self.verifier.verify(payload, signature) {
            return Err(WebhookError::InvalidSignature);
        }
        self.parser.decode_envelope(payload)
    }

    /// Decode an already parsed envelope's data as a transaction
    pub fn parse_transaction(&self, envelope: &EventEnvelope) -> WebhookResult<TransactionRecord> {
        self.parser.decode_transaction_record(&envelope.data)
    }

    /// Authenticate, decode, and extract the transaction of a charge event
    ///
    /// Returns `Ok(None)` when the signature is invalid or the event is not a
    /// charge event. A malformed authenticated body is still an error.
    pub fn verify_and_extract_transaction(
        &self,
        payload: impl AsRef<[u8]>,
        signature: &str,
    ) -> WebhookResult<Option<TransactionRecord>> {
        let envelope = match self.verify_and_parse(payload, signature) {
            Ok(envelope) => envelope,
            Err(WebhookError::InvalidSignature) => return Ok(None),
            Err(e) => return Err(e),
        };

        if !envelope.kind().is_charge_event() {
            tracing::debug!(event = %envelope.event, "Not a charge event, no transaction to extract");
            return Ok(None);
        }

        self.parse_transaction(&envelope).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "sk_test_handler_key_0123456789";

    fn signed(handler: &WebhookHandler, body: &str) -> String {
        handler.verifier().sign(body).unwrap()
    }

    #[test]
    fn test_blank_key_is_config_error() {
        assert!(matches!(
            WebhookHandler::new(" "),
            Err(WebhookError::Config(_))
        ));
    }

    #[test]
    fn test_verify_and_parse() {
        let handler = WebhookHandler::new(KEY).unwrap();
        let body = r#"{"event":"transfer.success","data":{"amount":100}}"#;

        let envelope = handler.verify_and_parse(body, &signed(&handler, body)).unwrap();
        assert!(envelope.is_transfer_success());
    }

    #[test]
    fn test_invalid_signature_is_not_malformed() {
        let handler = WebhookHandler::new(KEY).unwrap();

        // bad signature on a body that is not even JSON: still an auth failure
        let err = handler.verify_and_parse("garbage", "deadbeef").unwrap_err();
        assert_eq!(err, WebhookError::InvalidSignature);

        // good signature on the same body: malformed
        let err = handler
            .verify_and_parse("garbage", &signed(&handler, "garbage"))
            .unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }

    #[test]
    fn test_extract_transaction_for_charge_events_only() {
        let handler = WebhookHandler::new(KEY).unwrap();

        let charge = r#"{"event":"charge.failed","data":{"id":9,"reference":"ref-9","status":"failed"}}"#;
        let record = handler
            .verify_and_extract_transaction(charge, &signed(&handler, charge))
            .unwrap()
            .unwrap();
        assert_eq!(record.reference.as_deref(), Some("ref-9"));

        let transfer = r#"{"event":"transfer.success","data":{"id":9}}"#;
        assert_eq!(
            handler
                .verify_and_extract_transaction(transfer, &signed(&handler, transfer))
                .unwrap(),
            None
        );

        assert_eq!(
            handler
                .verify_and_extract_transaction(charge, "not-the-signature")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_extract_transaction_reports_malformed_charge_data() {
        let handler = WebhookHandler::new(KEY).unwrap();
        let charge = r#"{"event":"charge.success","data":"ref-9"}"#;
        let err = handler
            .verify_and_extract_transaction(charge, &signed(&handler, charge))
            .unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }
}
