//! Event Dispatch
//!
//! Routes an authenticated delivery to every registered listener.
//!
//! # Flow
//!
//! ```text
//! body + signature
//!       |
//!       v
//! [verify_and_parse] --> invalid signature --> false, no listener called
//!       |
//!       v
//! [EventKind] --> ROUTES --> charge? decode TransactionRecord
//!       |
//!       v
//! for each listener: invoke callback --> Err/panic --> FailureReporter
//!       |
//!       v
//!     true
//! ```
//!
//! # Concurrency
//!
//! `dispatch` takes `&self` and only reads the listener set, so one
//! dispatcher can serve concurrent deliveries behind an `Arc`. Registration
//! takes `&mut self` and is meant to happen at initialization, before the
//! dispatcher is shared.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::metrics::{global_metrics, WebhookMetrics};
use crate::webhook::error::{ListenerFailure, WebhookError, WebhookResult};
use crate::webhook::events::{EventEnvelope, EventKind};
use crate::webhook::handler::WebhookHandler;
use crate::webhook::listener::{Route, WebhookListener};

/// Receives listener failures caught during dispatch
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: &ListenerFailure);
}

impl<F> FailureReporter for F
where
    F: Fn(&ListenerFailure) + Send + Sync,
{
    fn report(&self, failure: &ListenerFailure) {
        self(failure)
    }
}

/// Default reporter: logs each failure at `error`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, failure: &ListenerFailure) {
        tracing::error!(
            listener = %failure.listener,
            index = failure.index,
            callback = failure.callback,
            event = %failure.event,
            error = %failure.message,
            "Webhook listener failed"
        );
    }
}

/// Outcome of one dispatch pass
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Correlation id for this delivery's log lines
    pub delivery_id: Uuid,
    /// Vendor event name
    pub event: String,
    /// Classified kind
    pub kind: EventKind,
    /// Listener method that was invoked
    pub callback: &'static str,
    /// Listeners the callback was attempted on
    pub listeners_notified: usize,
    /// Listeners whose callback failed
    pub failures: Vec<ListenerFailure>,
}

impl DispatchReport {
    /// Whether every listener handled the event
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Routes verified deliveries to registered listeners
pub struct WebhookDispatcher {
    handler: WebhookHandler,
    listeners: Vec<Arc<dyn WebhookListener>>,
    reporter: Arc<dyn FailureReporter>,
    metrics: Option<Arc<WebhookMetrics>>,
}

impl WebhookDispatcher {
    /// Create a dispatcher; fails fast on an empty or blank secret key
    pub fn new(secret_key: impl Into<String>) -> WebhookResult<Self> {
        Ok(Self::with_handler(WebhookHandler::new(secret_key)?))
    }

    pub fn with_handler(handler: WebhookHandler) -> Self {
        Self {
            handler,
            listeners: Vec::new(),
            reporter: Arc::new(TracingReporter),
            metrics: None,
        }
    }

    /// Replace the failure reporter
    pub fn with_reporter(mut self, reporter: impl FailureReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Record into `metrics` instead of the process-wide instance
    pub fn with_metrics(mut self, metrics: Arc<WebhookMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn handler(&self) -> &WebhookHandler {
        &self.handler
    }

    pub fn metrics(&self) -> &WebhookMetrics {
        match &self.metrics {
            Some(metrics) => metrics,
            None => global_metrics(),
        }
    }

    /// Register a listener; listeners are notified in registration order
    pub fn add_listener<L: WebhookListener + 'static>(&mut self, listener: Arc<L>) {
        self.listeners.push(listener);
    }

    /// Unregister a listener by identity; returns whether it was registered
    pub fn remove_listener<L: WebhookListener + ?Sized>(&mut self, listener: &Arc<L>) -> bool {
        let target = Arc::as_ptr(listener) as *const u8;
        let before = self.listeners.len();
        self.listeners
            .retain(|registered| Arc::as_ptr(registered) as *const u8 != target);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Verify, parse and route a delivery
    ///
    /// Returns `true` iff the delivery was authenticated and routed to every
    /// listener, whatever the individual listener outcomes.
    ///
    /// `charge.success` and `charge.failed` carry a transaction. When their
    /// `data` is absent, `null` or not a transaction object the delivery is
    /// rejected as malformed: this returns `false`, no listener runs and the
    /// HTTP surface answers 400.
    pub fn dispatch(&self, payload: impl AsRef<[u8]>, signature: &str) -> bool {
        self.try_dispatch(payload, signature).is_ok()
    }

    /// Like [`dispatch`](Self::dispatch), keeping the reason for a rejection
    ///
    /// # Errors
    ///
    /// - `InvalidSignature`: no listener was invoked.
    /// - `MalformedPayload`: authenticated, but the envelope could not be
    ///   decoded, or a charge event's `data` was absent, `null` or not a
    ///   transaction object. No listener was invoked.
    pub fn try_dispatch(
        &self,
        payload: impl AsRef<[u8]>,
        signature: &str,
    ) -> WebhookResult<DispatchReport> {
        let delivery_id = Uuid::new_v4();
        let span = tracing::info_span!("webhook_dispatch", %delivery_id);
        let _guard = span.enter();

        let started = Instant::now();
        let metrics = self.metrics();
        metrics.record_delivery();

        let envelope = match self.handler.verify_and_parse(payload, signature) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.record_rejection(&e);
                return Err(e);
            }
        };

        let kind = envelope.kind();
        let route = Route::for_kind(kind);
        tracing::debug!(
            event = %envelope.event,
            %kind,
            callback = route.callback_name(),
            listeners = self.listeners.len(),
            "Dispatching webhook event"
        );

        let failures = match route {
            Route::Transaction(callback) => {
                let transaction = match self.handler.parse_transaction(&envelope) {
                    Ok(transaction) => transaction,
                    Err(e) => {
                        self.record_rejection(&e);
                        return Err(e);
                    }
                };
                self.notify(callback.name(), &envelope, |listener| {
                    callback.invoke(listener, &transaction)
                })
            }
            Route::Envelope(callback) => self.notify(callback.name(), &envelope, |listener| {
                callback.invoke(listener, &envelope)
            }),
        };

        metrics.record_dispatched(kind, failures.len(), started.elapsed());
        if !failures.is_empty() {
            tracing::warn!(
                event = %envelope.event,
                failed = failures.len(),
                listeners = self.listeners.len(),
                "Webhook dispatched with listener failures"
            );
        }

        Ok(DispatchReport {
            delivery_id,
            event: envelope.event.clone(),
            kind,
            callback: route.callback_name(),
            listeners_notified: self.listeners.len(),
            failures,
        })
    }

    fn record_rejection(&self, error: &WebhookError) {
        match error {
            WebhookError::InvalidSignature => {
                self.metrics().record_rejected();
                tracing::warn!("Rejected webhook with invalid signature");
            }
            other => {
                self.metrics().record_malformed();
                tracing::warn!(error = %other, "Rejected authenticated webhook");
            }
        }
    }

    /// Invoke `call` on every listener, isolating each one's failure
    fn notify<F>(&self, callback: &'static str, envelope: &EventEnvelope, call: F) -> Vec<ListenerFailure>
    where
        F: Fn(&dyn WebhookListener) -> anyhow::Result<()>,
    {
        let mut failures = Vec::new();

        for (index, listener) in self.listeners.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(listener.as_ref())));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };

            let failure = ListenerFailure {
                index,
                listener: listener.name().to_string(),
                callback,
                event: envelope.event.clone(),
                message,
            };
            self.reporter.report(&failure);
            failures.push(failure);
        }

        failures
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("handler", &self.handler)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::transaction::TransactionRecord;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    const KEY: &str = "sk_test_dispatcher_key";

    /// Test listener that records which callbacks ran
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
        charges: Mutex<Vec<TransactionRecord>>,
    }

    impl WebhookListener for Recorder {
        fn on_charge_success(&self, transaction: &TransactionRecord) -> anyhow::Result<()> {
            self.calls.lock().push("on_charge_success");
            self.charges.lock().push(transaction.clone());
            Ok(())
        }

        fn on_transfer_failed(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
            self.calls.lock().push("on_transfer_failed");
            Ok(())
        }

        fn on_other_event(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
            self.calls.lock().push("on_other_event");
            Ok(())
        }
    }

    struct Panicker;

    impl WebhookListener for Panicker {
        fn on_other_event(&self, _envelope: &EventEnvelope) -> anyhow::Result<()> {
            panic!("listener bug");
        }
    }

    fn dispatcher() -> WebhookDispatcher {
        WebhookDispatcher::new(KEY)
            .unwrap()
            .with_metrics(Arc::new(WebhookMetrics::new()))
    }

    fn sign(dispatcher: &WebhookDispatcher, body: &str) -> String {
        dispatcher.handler().verifier().sign(body).unwrap()
    }

    #[test]
    fn test_invalid_signature_invokes_nobody() {
        let mut dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_listener(recorder.clone());

        let body = r#"{"event":"foo.bar"}"#;
        assert!(!dispatcher.dispatch(body, "0123"));
        assert_eq!(
            dispatcher.try_dispatch(body, "").unwrap_err(),
            WebhookError::InvalidSignature
        );
        assert!(recorder.calls.lock().is_empty());
        assert_eq!(dispatcher.metrics().rejected_total.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_unknown_event_routes_to_other() {
        let mut dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_listener(recorder.clone());

        let body = r#"{"event":"foo.bar","data":{}}"#;
        let report = dispatcher.try_dispatch(body, &sign(&dispatcher, body)).unwrap();

        assert_eq!(report.kind, EventKind::Unknown);
        assert_eq!(report.callback, "on_other_event");
        assert_eq!(*recorder.calls.lock(), vec!["on_other_event"]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let mut dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_listener(Arc::new(Panicker));
        dispatcher.add_listener(recorder.clone());

        let body = r#"{"event":"invoice.create","data":{}}"#;
        let report = dispatcher.try_dispatch(body, &sign(&dispatcher, body)).unwrap();

        assert_eq!(report.listeners_notified, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert!(report.failures[0].message.contains("listener bug"));
        assert_eq!(*recorder.calls.lock(), vec!["on_other_event"]);
    }

    #[test]
    fn test_custom_reporter_receives_failures() {
        let reported = Arc::new(AtomicU32::new(0));
        let counter = reported.clone();
        let mut dispatcher = dispatcher().with_reporter(move |_: &ListenerFailure| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.add_listener(Arc::new(Panicker));

        let body = r#"{"event":"refund.processed"}"#;
        assert!(dispatcher.dispatch(body, &sign(&dispatcher, body)));
        assert_eq!(reported.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_charge_data_invokes_nobody() {
        let mut dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_listener(recorder.clone());

        let body = r#"{"event":"charge.success","data":[1,2]}"#;
        let err = dispatcher
            .try_dispatch(body, &sign(&dispatcher, body))
            .unwrap_err();

        assert!(matches!(err, WebhookError::MalformedPayload(_)));
        assert!(recorder.calls.lock().is_empty());
        assert_eq!(dispatcher.metrics().malformed_total.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_remove_listener() {
        let mut dispatcher = dispatcher();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        dispatcher.add_listener(first.clone());
        dispatcher.add_listener(second.clone());

        assert!(dispatcher.remove_listener(&first));
        assert!(!dispatcher.remove_listener(&first));
        assert_eq!(dispatcher.listener_count(), 1);

        let body = r#"{"event":"transfer.failed"}"#;
        assert!(dispatcher.dispatch(body, &sign(&dispatcher, body)));
        assert!(first.calls.lock().is_empty());
        assert_eq!(*second.calls.lock(), vec!["on_transfer_failed"]);
    }

    #[test]
    fn test_dispatch_without_listeners() {
        let dispatcher = dispatcher();
        let body = r#"{"event":"charge.success","data":{"id":1}}"#;
        let report = dispatcher.try_dispatch(body, &sign(&dispatcher, body)).unwrap();
        assert_eq!(report.listeners_notified, 0);
        assert!(report.all_succeeded());
        assert_eq!(dispatcher.metrics().events_for(EventKind::ChargeSuccess), 1);
    }

    #[test]
    fn test_charge_without_transaction_data_invokes_nobody() {
        let mut dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_listener(recorder.clone());

        for body in [
            r#"{"event":"charge.success"}"#,
            r#"{"event":"charge.success","data":null}"#,
            r#"{"event":"charge.failed","data":"ref-1"}"#,
        ] {
            assert!(!dispatcher.dispatch(body, &sign(&dispatcher, body)), "{body}");
        }

        assert!(recorder.calls.lock().is_empty());
        assert_eq!(dispatcher.metrics().malformed_total.load(Ordering::Relaxed), 3);
        assert_eq!(dispatcher.metrics().events_for(EventKind::ChargeSuccess), 0);
    }

    #[test]
    fn test_unknown_event_names_share_one_series() {
        let dispatcher = dispatcher();
        for i in 0..2 {
            let body = format!(r#"{{"event":"vendor.new{i}","data":{{}}}}"#);
            assert!(dispatcher.dispatch(&body, &sign(&dispatcher, &body)));
        }

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.events_for(EventKind::Unknown), 2);

        let output = metrics.to_prometheus_format();
        let series: Vec<&str> = output
            .lines()
            .filter(|line| line.starts_with("paystack_webhook_events_total{"))
            .collect();
        assert_eq!(series, vec![r#"paystack_webhook_events_total{event="unknown"} 2"#]);
        assert!(!output.contains("vendor.new"));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }
}
