//! Paystack Event Types
//!
//! The envelope every delivery shares (`{"event": ..., "data": ...}`) and the
//! closed classification of vendor event names.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::webhook::error::{WebhookError, WebhookResult};

/// Paystack event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Charge events
    ChargeSuccess,
    ChargeFailed,

    // Transfer events
    TransferSuccess,
    TransferFailed,
    TransferReversed,

    // Subscription events
    SubscriptionCreate,
    SubscriptionDisable,
    SubscriptionNotRenew,

    // Invoice events
    InvoiceCreate,
    InvoiceUpdate,
    InvoicePaymentFailed,

    // Customer identification events
    CustomerIdentificationSuccess,
    CustomerIdentificationFailed,

    // Dispute events
    DisputeCreate,
    DisputeRemind,
    DisputeResolve,

    // Refund events
    RefundFailed,
    RefundPending,
    RefundProcessed,
    RefundProcessing,

    /// Any name not in the table
    Unknown,
}

/// Event name table; classification is an exact, case-insensitive match
const EVENT_NAMES: &[(EventKind, &str)] = &[
    (EventKind::ChargeSuccess, "charge.success"),
    (EventKind::ChargeFailed, "charge.failed"),
    (EventKind::TransferSuccess, "transfer.success"),
    (EventKind::TransferFailed, "transfer.failed"),
    (EventKind::TransferReversed, "transfer.reversed"),
    (EventKind::SubscriptionCreate, "subscription.create"),
    (EventKind::SubscriptionDisable, "subscription.disable"),
    (EventKind::SubscriptionNotRenew, "subscription.not_renew"),
    (EventKind::InvoiceCreate, "invoice.create"),
    (EventKind::InvoiceUpdate, "invoice.update"),
    (EventKind::InvoicePaymentFailed, "invoice.payment_failed"),
    (
        EventKind::CustomerIdentificationSuccess,
        "customeridentification.success",
    ),
    (
        EventKind::CustomerIdentificationFailed,
        "customeridentification.failed",
    ),
    (EventKind::DisputeCreate, "dispute.create"),
    (EventKind::DisputeRemind, "dispute.remind"),
    (EventKind::DisputeResolve, "dispute.resolve"),
    (EventKind::RefundFailed, "refund.failed"),
    (EventKind::RefundPending, "refund.pending"),
    (EventKind::RefundProcessed, "refund.processed"),
    (EventKind::RefundProcessing, "refund.processing"),
];

/// Event families, for convenience predicates only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFamily {
    Charge,
    Transfer,
    Subscription,
    Invoice,
    Identification,
    Dispute,
    Refund,
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::classify(s))
    }
}

impl EventKind {
    /// Classify a vendor event name, degrading to `Unknown`
    pub fn classify(name: &str) -> Self {
        EVENT_NAMES
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map(|(kind, _)| *kind)
            .unwrap_or(Self::Unknown)
    }

    /// Get the vendor event name
    pub fn as_str(&self) -> &'static str {
        EVENT_NAMES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    /// Check if this is a known event type
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Family the kind belongs to, `None` for `Unknown`
    pub fn family(&self) -> Option<EventFamily> {
        use EventKind::*;

        Some(match self {
            ChargeSuccess | ChargeFailed => EventFamily::Charge,
            TransferSuccess | TransferFailed | TransferReversed => EventFamily::Transfer,
            SubscriptionCreate | SubscriptionDisable | SubscriptionNotRenew => {
                EventFamily::Subscription
            }
            InvoiceCreate | InvoiceUpdate | InvoicePaymentFailed => EventFamily::Invoice,
            CustomerIdentificationSuccess | CustomerIdentificationFailed => {
                EventFamily::Identification
            }
            DisputeCreate | DisputeRemind | DisputeResolve => EventFamily::Dispute,
            RefundFailed | RefundPending | RefundProcessed | RefundProcessing => {
                EventFamily::Refund
            }
            Unknown => return None,
        })
    }

    pub fn is_charge_event(&self) -> bool {
        self.family() == Some(EventFamily::Charge)
    }

    pub fn is_transfer_event(&self) -> bool {
        self.family() == Some(EventFamily::Transfer)
    }

    pub fn is_subscription_event(&self) -> bool {
        self.family() == Some(EventFamily::Subscription)
    }

    pub fn is_invoice_event(&self) -> bool {
        self.family() == Some(EventFamily::Invoice)
    }

    pub fn is_identification_event(&self) -> bool {
        self.family() == Some(EventFamily::Identification)
    }

    pub fn is_dispute_event(&self) -> bool {
        self.family() == Some(EventFamily::Dispute)
    }

    pub fn is_refund_event(&self) -> bool {
        self.family() == Some(EventFamily::Refund)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimally typed webhook envelope
///
/// `data` stays opaque until a consumer asks for a typed view of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Vendor event name, e.g. `charge.success`
    pub event: String,

    /// Event payload: object, scalar or absent (`Null`)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl EventEnvelope {
    /// Build an envelope by hand (tests, replays)
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Get the typed event kind
    pub fn kind(&self) -> EventKind {
        EventKind::classify(&self.event)
    }

    pub fn is_charge_success(&self) -> bool {
        self.kind() == EventKind::ChargeSuccess
    }

    pub fn is_charge_failed(&self) -> bool {
        self.kind() == EventKind::ChargeFailed
    }

    pub fn is_transfer_success(&self) -> bool {
        self.kind() == EventKind::TransferSuccess
    }

    pub fn is_subscription_event(&self) -> bool {
        self.kind().is_subscription_event()
    }

    /// Raw JSON text of `data`, `None` when absent
    pub fn data_as_string(&self) -> Option<String> {
        if self.data.is_null() {
            None
        } else {
            Some(self.data.to_string())
        }
    }

    /// Decode `data` into a caller-chosen type
    ///
    /// Listeners receiving raw envelopes (transfers, disputes, ...) use this
    /// to type the payload themselves.
    pub fn decode_data<T: DeserializeOwned>(&self) -> WebhookResult<T> {
        T::deserialize(&self.data).map_err(|e| {
            WebhookError::MalformedPayload(format!("`{}` data: {}", self.event, e))
        })
    }
}
