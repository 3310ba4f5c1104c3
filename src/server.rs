//! HTTP surface for webhook deliveries
//!
//! Mounts a [`WebhookDispatcher`] on an axum router:
//! - `POST <path>` - Paystack delivery endpoint
//! - `GET /health` - Liveness probe
//! - `GET /metrics` - Prometheus text format
//!
//! # Status Codes
//!
//! ```text
//! POST body ──> try_dispatch ──> Ok              ──> 200 + DeliveryResponse
//!                    │
//!                    ├──────────> InvalidSignature ──> 401
//!                    └──────────> MalformedPayload ──> 400
//! ```
//!
//! Listener failures never change the status: the delivery was accepted and
//! every listener was attempted, so Paystack should not retry it.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{header, HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::webhook::{WebhookDispatcher, WebhookError, SIGNATURE_HEADER};

// ============================================================================
// Response Types
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" if responding)
    pub status: String,
    /// Crate version
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

/// Body returned for an accepted delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResponse {
    /// Correlation id, also present on the dispatch log span
    pub delivery_id: String,
    /// Vendor event name
    pub event: String,
    /// Listener method invoked
    pub callback: String,
    /// Listeners attempted
    pub listeners_notified: usize,
    /// Listeners that failed
    pub listener_failures: usize,
}

/// Body returned for a rejected delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// Webhook delivery handler
///
/// A missing signature header is treated as an empty signature, which never
/// verifies. Dispatch runs listener callbacks synchronously, so it is moved
/// off the async workers.
#[instrument(skip_all, fields(bytes = body.len()))]
pub async fn webhook_handler(
    State(dispatcher): State<Arc<WebhookDispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let outcome =
        tokio::task::spawn_blocking(move || dispatcher.try_dispatch(&body, &signature)).await;

    match outcome {
        Ok(Ok(report)) => {
            debug!(delivery_id = %report.delivery_id, event = %report.event, "Delivery accepted");
            let response = DeliveryResponse {
                delivery_id: report.delivery_id.to_string(),
                event: report.event,
                callback: report.callback.to_string(),
                listeners_notified: report.listeners_notified,
                listener_failures: report.failures.len(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(Err(e)) => rejection(&e),
        Err(e) => {
            error!(error = %e, "Dispatch task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "dispatch failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn rejection(e: &WebhookError) -> Response {
    let status = match e {
        WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
        WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        WebhookError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// `GET /health`
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// `GET /metrics`
#[instrument(skip_all)]
pub async fn metrics_handler(State(dispatcher): State<Arc<WebhookDispatcher>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        dispatcher.metrics().to_prometheus_format(),
    )
}

// ============================================================================
// Router Setup
// ============================================================================

/// Build the router; `path` receives webhook POSTs
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use paystack_webhook::server::webhook_router;
/// use paystack_webhook::webhook::{LoggingListener, WebhookDispatcher};
///
/// # fn main() -> Result<(), paystack_webhook::webhook::WebhookError> {
/// let mut dispatcher = WebhookDispatcher::new("sk_test_xxx")?;
/// dispatcher.add_listener(Arc::new(LoggingListener));
/// let app = webhook_router(Arc::new(dispatcher), "/webhooks/paystack");
/// # let _ = app;
/// # Ok(())
/// # }
/// ```
pub fn webhook_router(dispatcher: Arc<WebhookDispatcher>, path: &str) -> Router {
    Router::new()
        .route(path, post(webhook_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(dispatcher)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &ServerConfig, dispatcher: Arc<WebhookDispatcher>) -> Result<()> {
    let app = webhook_router(dispatcher, &config.webhook_path);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    info!(
        "Paystack webhook receiver listening on {} (POST {})",
        listener.local_addr()?,
        config.webhook_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Webhook receiver stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
