//! Listener capability set and routing table
//!
//! A listener implements only the callbacks it cares about; every method has
//! a no-op default. Which callback an event reaches is decided by one table,
//! [`ROUTES`]: routing a new vendor event means adding an entry there.

use crate::webhook::events::{EventEnvelope, EventKind};
use crate::webhook::transaction::TransactionRecord;

/// Consumer of dispatched webhook events
///
/// Callbacks run synchronously on the dispatching thread. An `Err` (or a
/// panic) is reported by the dispatcher and does not stop other listeners.
pub trait WebhookListener: Send + Sync {
    /// Name used when reporting failures
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// A charge succeeded (payment completed)
    ///
    /// Only called with a decoded transaction. A `charge.success` whose `data`
    /// is absent, `null` or not a transaction object is rejected as malformed
    /// before any listener runs (HTTP 400).
    fn on_charge_success(&self, _transaction: &TransactionRecord) -> anyhow::Result<()> {
        Ok(())
    }

    /// A charge failed
    ///
    /// Same contract as [`on_charge_success`](Self::on_charge_success): a
    /// delivery without decodable transaction data never reaches listeners.
    fn on_charge_failed(&self, _transaction: &TransactionRecord) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_transfer_success(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_transfer_failed(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_subscription_create(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_subscription_disable(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_dispute_create(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_dispute_resolve(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
        Ok(())
    }

    /// Any event without a dedicated callback, including unknown kinds
    fn on_other_event(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Callbacks that receive a decoded transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCallback {
    ChargeSuccess,
    ChargeFailed,
}

impl TransactionCallback {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChargeSuccess => "on_charge_success",
            Self::ChargeFailed => "on_charge_failed",
        }
    }

    pub fn invoke(
        &self,
        listener: &dyn WebhookListener,
        transaction: &TransactionRecord,
    ) -> anyhow::Result<()> {
        match self {
            Self::ChargeSuccess => listener.on_charge_success(transaction),
            Self::ChargeFailed => listener.on_charge_failed(transaction),
        }
    }
}

/// Callbacks that receive the raw envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeCallback {
    TransferSuccess,
    TransferFailed,
    SubscriptionCreate,
    SubscriptionDisable,
    DisputeCreate,
    DisputeResolve,
    OtherEvent,
}

impl EnvelopeCallback {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TransferSuccess => "on_transfer_success",
            Self::TransferFailed => "on_transfer_failed",
            Self::SubscriptionCreate => "on_subscription_create",
            Self::SubscriptionDisable => "on_subscription_disable",
            Self::DisputeCreate => "on_dispute_create",
            Self::DisputeResolve => "on_dispute_resolve",
            Self::OtherEvent => "on_other_event",
        }
    }

    pub fn invoke(
        &self,
        listener: &dyn WebhookListener,
        envelope: &EventEnvelope,
    ) -> anyhow::Result<()> {
        match self {
            Self::TransferSuccess => listener.on_transfer_success(envelope),
            Self::TransferFailed => listener.on_transfer_failed(envelope),
            Self::SubscriptionCreate => listener.on_subscription_create(envelope),
            Self::SubscriptionDisable => listener.on_subscription_disable(envelope),
            Self::DisputeCreate => listener.on_dispute_create(envelope),
            Self::DisputeResolve => listener.on_dispute_resolve(envelope),
            Self::OtherEvent => listener.on_other_event(envelope),
        }
    }
}

/// Where an event kind is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Decode a [`TransactionRecord`] first, then call back with it
    Transaction(TransactionCallback),
    /// Call back with the envelope as received
    Envelope(EnvelopeCallback),
}

/// Kind to callback table; kinds not listed go to `on_other_event`
pub const ROUTES: &[(EventKind, Route)] = &[
    (
        EventKind::ChargeSuccess,
        Route::Transaction(TransactionCallback::ChargeSuccess),
    ),
    (
        EventKind::ChargeFailed,
        Route::Transaction(TransactionCallback::ChargeFailed),
    ),
    (
        EventKind::TransferSuccess,
        Route::Envelope(EnvelopeCallback::TransferSuccess),
    ),
    (
        EventKind::TransferFailed,
        Route::Envelope(EnvelopeCallback::TransferFailed),
    ),
    (
        EventKind::SubscriptionCreate,
        Route::Envelope(EnvelopeCallback::SubscriptionCreate),
    ),
    (
        EventKind::SubscriptionDisable,
        Route::Envelope(EnvelopeCallback::SubscriptionDisable),
    ),
    (
        EventKind::DisputeCreate,
        Route::Envelope(EnvelopeCallback::DisputeCreate),
    ),
    (
        EventKind::DisputeResolve,
        Route::Envelope(EnvelopeCallback::DisputeResolve),
    ),
];

impl Route {
    /// Look up the route for a kind
    pub fn for_kind(kind: EventKind) -> Self {
        ROUTES
            .iter()
            .find(|(routed, _)| *routed == kind)
            .map(|(_, route)| *route)
            .unwrap_or(Route::Envelope(EnvelopeCallback::OtherEvent))
    }

    /// Name of the listener method this route calls
    pub fn callback_name(&self) -> &'static str {
        match self {
            Self::Transaction(callback) => callback.name(),
            Self::Envelope(callback) => callback.name(),
        }
    }
}

/// Listener that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpListener;

impl WebhookListener for NoOpListener {}

/// Listener that logs every event it receives
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl LoggingListener {
    fn log_envelope(&self, callback: &str, envelope: &EventEnvelope) {
        tracing::info!(event = %envelope.event, callback, "Webhook event received");
    }
}

impl WebhookListener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_charge_success(&self, transaction: &TransactionRecord) -> anyhow::Result<()> {
        tracing::info!(
            reference = ?transaction.reference,
            amount = transaction.amount,
            currency = ?transaction.currency,
            "Charge succeeded"
        );
        Ok(())
    }

    fn on_charge_failed(&self, transaction: &TransactionRecord) -> anyhow::Result<()> {
        tracing::warn!(
            reference = ?transaction.reference,
            amount = transaction.amount,
            gateway_response = ?transaction.gateway_response,
            "Charge failed"
        );
        Ok(())
    }

    fn on_transfer_success(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        self.log_envelope("on_transfer_success", envelope);
        Ok(())
    }

    fn on_transfer_failed(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        tracing::warn!(event = %envelope.event, "Transfer failed");
        Ok(())
    }

    fn on_subscription_create(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        self.log_envelope("on_subscription_create", envelope);
        Ok(())
    }

    fn on_subscription_disable(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        self.log_envelope("on_subscription_disable", envelope);
        Ok(())
    }

    fn on_dispute_create(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        tracing::warn!(event = %envelope.event, "Dispute opened");
        Ok(())
    }

    fn on_dispute_resolve(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        self.log_envelope("on_dispute_resolve", envelope);
        Ok(())
    }

    fn on_other_event(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        tracing::debug!(event = %envelope.event, kind = %envelope.kind(), "Unrouted webhook event");
        Ok(())
    }
}
