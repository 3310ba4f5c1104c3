//! HTTP surface tests
//!
//! Drives the axum router with `tower::ServiceExt::oneshot`, the way Paystack
//! would deliver: raw JSON body plus the `x-paystack-signature` header.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use parking_lot::Mutex;
use paystack_webhook::metrics::WebhookMetrics;
use paystack_webhook::server::webhook_router;
use paystack_webhook::webhook::{
    EventEnvelope, TransactionRecord, WebhookDispatcher, WebhookListener, SIGNATURE_HEADER,
};
use tower::ServiceExt;

const SECRET: &str = "sk_test_http_surface";
const PATH: &str = "/hooks/paystack";

#[derive(Default)]
struct Seen {
    references: Mutex<Vec<String>>,
    others: Mutex<Vec<String>>,
}

impl WebhookListener for Seen {
    fn on_charge_success(&self, transaction: &TransactionRecord) -> anyhow::Result<()> {
        self.references
            .lock()
            .push(transaction.reference.clone().unwrap_or_default());
        Ok(())
    }

    fn on_other_event(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        self.others.lock().push(envelope.event.clone());
        Ok(())
    }
}

struct Broken;

impl WebhookListener for Broken {
    fn on_charge_success(&self, _transaction: &TransactionRecord) -> anyhow::Result<()> {
        anyhow::bail!("inventory service unavailable")
    }
}

fn setup() -> (Router, Arc<Seen>, Arc<WebhookDispatcher>) {
    let seen = Arc::new(Seen::default());
    let mut dispatcher = WebhookDispatcher::new(SECRET)
        .unwrap()
        .with_metrics(Arc::new(WebhookMetrics::new()));
    dispatcher.add_listener(Arc::new(Broken));
    dispatcher.add_listener(seen.clone());

    let dispatcher = Arc::new(dispatcher);
    (webhook_router(dispatcher.clone(), PATH), seen, dispatcher)
}

fn post(body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(PATH)
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_signed_charge_reaches_listener_despite_failure() {
    let (app, seen, dispatcher) = setup();
    let body = r#"{"event":"charge.success","data":{"id":7,"reference":"ref-7","amount":2500}}"#;
    let signature = dispatcher.handler().verifier().sign(body).unwrap();

    let response = app.oneshot(post(body, &signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*seen.references.lock(), vec!["ref-7".to_string()]);
}

#[tokio::test]
async fn test_wrong_signature_is_unauthorized_and_not_dispatched() {
    let (app, seen, dispatcher) = setup();
    let body = r#"{"event":"charge.success","data":{"reference":"ref-8"}}"#;

    let response = app.oneshot(post(body, "not-a-signature")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(seen.references.lock().is_empty());
    assert_eq!(
        dispatcher
            .metrics()
            .rejected_total
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
}

#[tokio::test]
async fn test_non_object_body_is_bad_request() {
    let (app, seen, dispatcher) = setup();
    let body = "[1,2,3]";
    let signature = dispatcher.handler().verifier().sign(body).unwrap();

    let response = app.oneshot(post(body, &signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(seen.others.lock().is_empty());
}

#[tokio::test]
async fn test_charge_without_data_is_bad_request() {
    let (app, seen, dispatcher) = setup();
    let body = r#"{"event":"charge.success"}"#;
    let signature = dispatcher.handler().verifier().sign(body).unwrap();

    let response = app.oneshot(post(body, &signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(seen.references.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_event_is_accepted() {
    let (app, seen, dispatcher) = setup();
    let body = r#"{"event":"paymentrequest.pending","data":{}}"#;
    let signature = dispatcher.handler().verifier().sign(body).unwrap();

    let response = app.oneshot(post(body, &signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*seen.others.lock(), vec!["paymentrequest.pending".to_string()]);
}

#[tokio::test]
async fn test_health_route() {
    let (app, _, _) = setup();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_on_webhook_path_is_not_allowed() {
    let (app, _, _) = setup();
    let response = app
        .oneshot(Request::builder().uri(PATH).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
