//! Webhook error taxonomy
//!
//! Authentication failures, malformed payloads and configuration problems are
//! kept as distinct variants so a host can map each to its own response.
//! Listener faults are never errors of the dispatch itself; they are
//! described by [`ListenerFailure`] and handed to a reporter.

use thiserror::Error;

/// Errors produced while authenticating or decoding a webhook delivery
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// The signature was missing, mismatched or could not be verified
    #[error("webhook signature is missing or invalid")]
    InvalidSignature,

    /// The body is not a JSON object of the expected shape
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// The component could not be built (e.g. blank secret key)
    #[error("webhook configuration error: {0}")]
    Config(String),
}

impl WebhookError {
    /// Build a `MalformedPayload` from any displayable cause
    pub fn malformed<E: std::fmt::Display>(cause: E) -> Self {
        Self::MalformedPayload(cause.to_string())
    }

    /// Whether this error means the delivery was not authenticated
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::InvalidSignature)
    }
}

/// Result type for webhook operations
pub type WebhookResult<T> = std::result::Result<T, WebhookError>;

/// A flexible scalar arrived in a JSON shape that cannot be coerced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// Arrays and objects are never coerced to scalars
    #[error("expected a boolean, number, string or null but found {0}")]
    UnsupportedShape(&'static str),
}

/// A single listener's failure during a dispatch pass
///
/// Recorded and reported; never propagated to the caller of `dispatch` or
/// to the remaining listeners.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("listener #{index} ({listener}) failed in {callback} for `{event}`: {message}")]
pub struct ListenerFailure {
    /// Position of the listener in registration order
    pub index: usize,
    /// Listener name as reported by `WebhookListener::name`
    pub listener: String,
    /// Callback that was being invoked (e.g. `on_charge_success`)
    pub callback: &'static str,
    /// Vendor event name of the delivery
    pub event: String,
    /// Error or panic message
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            WebhookError::InvalidSignature.to_string(),
            "webhook signature is missing or invalid"
        );
        let err = WebhookError::malformed("expected value at line 1 column 1");
        assert!(err.to_string().starts_with("malformed webhook payload"));
        assert!(!err.is_unauthenticated());
        assert!(WebhookError::InvalidSignature.is_unauthenticated());
    }

    #[test]
    fn test_listener_failure_display() {
        let failure = ListenerFailure {
            index: 1,
            listener: "Ledger".to_string(),
            callback: "on_charge_success",
            event: "charge.success".to_string(),
            message: "database unavailable".to_string(),
        };
        let text = failure.to_string();
        assert!(text.contains("#1"));
        assert!(text.contains("on_charge_success"));
        assert!(text.contains("database unavailable"));
    }
}
