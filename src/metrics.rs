//! Metrics Collection for Webhook Dispatch
//!
//! This module provides lightweight delivery metrics with:
//! - Atomic counters for received, rejected, malformed and dispatched deliveries
//! - Per-event-kind breakdown (one series per [`EventKind`], unknown names share one)
//! - A bounded ring buffer of dispatch durations for percentiles
//! - Prometheus-compatible text format export
//!
//! # Example
//!
//! ```rust
//! use paystack_webhook::metrics::global_metrics;
//! use paystack_webhook::webhook::EventKind;
//! use std::time::Duration;
//!
//! global_metrics().record_dispatched(EventKind::ChargeSuccess, 0, Duration::from_micros(150));
//! let output = global_metrics().to_prometheus_format();
//! assert!(output.contains("paystack_webhook_dispatched_total"));
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::RwLock;

use crate::webhook::events::EventKind;

/// Maximum number of duration samples to keep in the histogram
const MAX_HISTOGRAM_SAMPLES: usize = 1000;

/// Delivery metrics
///
/// Thread-safe; shared between the dispatcher and the HTTP surface.
#[derive(Debug)]
pub struct WebhookMetrics {
    /// Deliveries received (authenticated or not)
    pub deliveries_total: AtomicU64,
    /// Deliveries rejected for a missing or invalid signature
    pub rejected_total: AtomicU64,
    /// Authenticated deliveries whose payload could not be decoded
    pub malformed_total: AtomicU64,
    /// Deliveries routed to listeners
    pub dispatched_total: AtomicU64,
    /// Listener callbacks that returned an error or panicked
    pub listener_failures_total: AtomicU64,

    /// Dispatched deliveries by kind; bounded by the closed set of kinds
    events_by_kind: RwLock<BTreeMap<&'static str, u64>>,
    /// Dispatch durations for percentile calculation
    dispatch_durations: RwLock<RingBuffer<Duration>>,
}

/// Memory-efficient ring buffer for histogram samples
#[derive(Debug)]
struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    /// Position of next write (wraps around)
    write_pos: usize,
}

impl<T: Clone + Ord> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            write_pos: 0,
        }
    }

    fn push(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
        } else {
            self.data[self.write_pos] = value;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    /// Calculate percentile (0.0 to 1.0)
    fn percentile(&self, p: f64) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let mut sorted = self.data.clone();
        sorted.sort();
        let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
        sorted.get(idx).cloned()
    }
}

impl WebhookMetrics {
    pub fn new() -> Self {
        Self {
            deliveries_total: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            malformed_total: AtomicU64::new(0),
            dispatched_total: AtomicU64::new(0),
            listener_failures_total: AtomicU64::new(0),
            events_by_kind: RwLock::new(BTreeMap::new()),
            dispatch_durations: RwLock::new(RingBuffer::new(MAX_HISTOGRAM_SAMPLES)),
        }
    }

    /// Record an inbound delivery, before authentication
    pub fn record_delivery(&self) {
        self.deliveries_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivery rejected for its signature
    pub fn record_rejected(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an authenticated but undecodable delivery
    pub fn record_malformed(&self) {
        self.malformed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed dispatch pass
    pub fn record_dispatched(&self, kind: EventKind, listener_failures: usize, duration: Duration) {
        self.dispatched_total.fetch_add(1, Ordering::Relaxed);
        self.listener_failures_total
            .fetch_add(listener_failures as u64, Ordering::Relaxed);

        *self
            .events_by_kind
            .write()
            .entry(kind.as_str())
            .or_insert(0) += 1;
        self.dispatch_durations.write().push(duration);
    }

    /// Dispatched count for one event kind
    pub fn events_for(&self, kind: EventKind) -> u64 {
        self.events_by_kind
            .read()
            .get(kind.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// Convert metrics to Prometheus text format
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        for (name, counter) in [
            ("deliveries_total", &self.deliveries_total),
            ("rejected_total", &self.rejected_total),
            ("malformed_total", &self.malformed_total),
            ("dispatched_total", &self.dispatched_total),
            ("listener_failures_total", &self.listener_failures_total),
        ] {
            output.push_str(&format!(
                "paystack_webhook_{} {}\n",
                name,
                counter.load(Ordering::Relaxed)
            ));
        }

        for (event, count) in self.events_by_kind.read().iter() {
            output.push_str(&format!(
                "paystack_webhook_events_total{{event=\"{}\"}} {}\n",
                event, count
            ));
        }

        let durations = self.dispatch_durations.read();
        for (label, p) in [("p50", 0.5), ("p95", 0.95), ("p99", 0.99)] {
            if let Some(value) = durations.percentile(p) {
                output.push_str(&format!(
                    "paystack_webhook_dispatch_duration_{}_us {}\n",
                    label,
                    value.as_micros()
                ));
            }
        }

        output
    }
}

impl Default for WebhookMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<WebhookMetrics> = OnceLock::new();

/// Get or initialize the process-wide metrics instance
pub fn global_metrics() -> &'static WebhookMetrics {
    METRICS.get_or_init(WebhookMetrics::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = WebhookMetrics::new();

        metrics.record_delivery();
        metrics.record_delivery();
        metrics.record_rejected();
        metrics.record_dispatched(EventKind::ChargeSuccess, 2, Duration::from_micros(120));

        assert_eq!(metrics.deliveries_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.rejected_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.dispatched_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.listener_failures_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.events_for(EventKind::ChargeSuccess), 1);
        assert_eq!(metrics.events_for(EventKind::ChargeFailed), 0);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = WebhookMetrics::new();
        metrics.record_dispatched(EventKind::TransferSuccess, 0, Duration::from_micros(80));
        metrics.record_dispatched(EventKind::Unknown, 0, Duration::from_micros(40));

        let output = metrics.to_prometheus_format();
        assert!(output.contains("paystack_webhook_dispatched_total 2\n"));
        assert!(output.contains("paystack_webhook_events_total{event=\"transfer.success\"} 1\n"));
        assert!(output.contains("paystack_webhook_events_total{event=\"unknown\"} 1\n"));
        assert!(output.contains("paystack_webhook_dispatch_duration_p50_us"));
    }

    #[test]
    fn test_ring_buffer_wraps() {
        let mut buffer = RingBuffer::new(3);
        for value in [5, 1, 9, 7] {
            buffer.push(value);
        }
        assert_eq!(buffer.data.len(), 3);
        assert_eq!(buffer.percentile(0.0), Some(1));
        assert_eq!(buffer.percentile(1.0), Some(9));
    }
}
