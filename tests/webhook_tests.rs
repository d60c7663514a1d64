use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use geeklogg::config::Config;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use sha2::Sha256;
use tower::ServiceExt;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_API_KEY: &str = "geeklogg_default_api_key_please_regenerate";
const STRIPE_WEBHOOK_SECRET: &str = "whsec_integration_test";
const MP_WEBHOOK_SECRET: &str = "mp_integration_test";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // Keep outbound failures fast; webhook tests never need real APIs.
    config.igdb.request_timeout_seconds = 2;

    config.stripe.enabled = true;
    config.stripe.secret_key = "sk_test_dummy".to_string();
    config.stripe.webhook_secret = STRIPE_WEBHOOK_SECRET.to_string();
    config.stripe.premium_price_id = "price_test".to_string();

    config.mercadopago.enabled = true;
    config.mercadopago.access_token = "TEST-dummy".to_string();
    config.mercadopago.webhook_secret = MP_WEBHOOK_SECRET.to_string();

    let state = geeklogg::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    geeklogg::api::router(state).await
}

fn stripe_signature(payload: &[u8]) -> String {
    let ts = chrono::Utc::now().timestamp();
    let mut mac = HmacSha256::new_from_slice(STRIPE_WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{ts}.").as_bytes());
    mac.update(payload);
    format!("t={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}

fn stripe_request(payload: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/stripe")
        .header("Stripe-Signature", signature)
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn current_subscription(app: &Router) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/billing/subscription")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn checkout_completed_payload(event_id: &str) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "id": "cs_test_1",
                "mode": "subscription",
                "customer": "cus_test_1",
                "subscription": null,
                "metadata": { "user_id": "1" }
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_stripe_webhook_rejects_bad_signature() {
    let app = spawn_app().await;
    let payload = checkout_completed_payload("evt_bad_sig");

    // Missing header
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/stripe")
                .header("Content-Type", "application/json")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Wrong signature
    let response = app
        .clone()
        .oneshot(stripe_request(&payload, "t=1700000000,v1=deadbeef"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was written: the subscription is still free.
    let sub = current_subscription(&app).await;
    assert_eq!(sub["data"]["tier"], "free");
}

#[tokio::test]
async fn test_stripe_checkout_completed_upgrades_subscription() {
    let app = spawn_app().await;
    let payload = checkout_completed_payload("evt_checkout_1");
    let signature = stripe_signature(payload.as_bytes());

    let response = app
        .clone()
        .oneshot(stripe_request(&payload, &signature))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let receipt = body_json(response).await;
    assert_eq!(receipt["data"]["duplicate"], false);
    assert_eq!(receipt["data"]["event_type"], "checkout.session.completed");

    let sub = current_subscription(&app).await;
    assert_eq!(sub["data"]["tier"], "premium");
    assert_eq!(sub["data"]["status"], "active");
    assert_eq!(sub["data"]["provider"], "stripe");
    assert_eq!(sub["data"]["premium"], true);
}

#[tokio::test]
async fn test_stripe_redelivery_is_idempotent() {
    let app = spawn_app().await;
    let payload = checkout_completed_payload("evt_redelivered");
    let signature = stripe_signature(payload.as_bytes());

    let response = app
        .clone()
        .oneshot(stripe_request(&payload, &signature))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["data"]["duplicate"], false);

    // The provider redelivers: still 200, but nothing new is stored.
    let response = app
        .clone()
        .oneshot(stripe_request(&payload, &signature))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await;
    assert_eq!(second["data"]["duplicate"], true);
}

#[tokio::test]
async fn test_stripe_invoice_failure_marks_past_due() {
    let app = spawn_app().await;

    // Establish the premium subscription (links customer cus_test_1).
    let payload = checkout_completed_payload("evt_checkout_2");
    let signature = stripe_signature(payload.as_bytes());
    let response = app
        .clone()
        .oneshot(stripe_request(&payload, &signature))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = serde_json::json!({
        "id": "evt_invoice_failed_1",
        "type": "invoice.payment_failed",
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "customer": "cus_test_1",
                "subscription": null
            }
        }
    })
    .to_string();
    let signature = stripe_signature(payload.as_bytes());

    let response = app
        .clone()
        .oneshot(stripe_request(&payload, &signature))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sub = current_subscription(&app).await;
    assert_eq!(sub["data"]["status"], "past_due");
    // Past due keeps premium access during the grace period.
    assert_eq!(sub["data"]["premium"], true);
}

#[tokio::test]
async fn test_stripe_unknown_event_acknowledged_and_skipped() {
    let app = spawn_app().await;

    let payload = serde_json::json!({
        "id": "evt_unknown_1",
        "type": "customer.created",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": {} }
    })
    .to_string();
    let signature = stripe_signature(payload.as_bytes());

    let response = app
        .clone()
        .oneshot(stripe_request(&payload, &signature))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Skipped events do not linger in the pending backlog.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["data"]["webhook_backlog"]["pending"], 0);
}

#[tokio::test]
async fn test_stripe_out_of_order_event_stays_pending() {
    let app = spawn_app().await;

    // An invoice for a customer the service has never seen: stored and
    // acknowledged, but processing cannot resolve a user yet.
    let payload = serde_json::json!({
        "id": "evt_orphan_invoice",
        "type": "invoice.payment_succeeded",
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "customer": "cus_unseen",
                "subscription": null
            }
        }
    })
    .to_string();
    let signature = stripe_signature(payload.as_bytes());

    let response = app
        .clone()
        .oneshot(stripe_request(&payload, &signature))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["data"]["webhook_backlog"]["pending"], 1);
}

fn mp_signature(data_id: &str, request_id: &str) -> String {
    let ts = chrono::Utc::now().timestamp().to_string();
    let manifest = format!("id:{data_id};request-id:{request_id};ts:{ts};");
    let mut mac = HmacSha256::new_from_slice(MP_WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(manifest.as_bytes());
    format!("ts={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[tokio::test]
async fn test_mercadopago_webhook_rejects_bad_signature() {
    let app = spawn_app().await;

    let payload = serde_json::json!({
        "id": 1001,
        "type": "payment",
        "action": "payment.updated",
        "data": { "id": "555" }
    })
    .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/mercadopago")
                .header("x-signature", "ts=1,v1=deadbeef")
                .header("x-request-id", "req-1")
                .header("Content-Type", "application/json")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Secret configured but header missing entirely.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/mercadopago")
                .header("Content-Type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mercadopago_webhook_stores_event_before_ack() {
    let app = spawn_app().await;

    let payload = serde_json::json!({
        "id": 2002,
        "type": "payment",
        "action": "payment.created",
        "data": { "id": "777" }
    })
    .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/mercadopago")
                .header("x-signature", mp_signature("777", "req-2"))
                .header("x-request-id", "req-2")
                .header("Content-Type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    // Acknowledged even though the payment lookup cannot succeed here;
    // the event sits in the durable backlog for the retry sweep.
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["data"]["webhook_backlog"]["pending"], 1);
}
