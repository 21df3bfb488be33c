//! Integration tests for payment verification against a fake gateway.

mod common;

use axum::http::{Method, StatusCode};
use common::{checkout_payload, response_json, TestApp, MERCHANT_INBOX};
use serde_json::{json, Value};
use storefront_api::entities::OrderStatus;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_ID: &str = "cs_test_abcdef12";

async fn mount_session_create(gateway: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": SESSION_ID,
            "url": format!("https://checkout.stripe.test/pay/{}", SESSION_ID),
            "payment_status": "unpaid"
        })))
        .mount(gateway)
        .await;
}

async fn mount_session_retrieve(gateway: &MockServer, payment_status: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/checkout/sessions/{}", SESSION_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": SESSION_ID,
            "payment_status": payment_status,
            "amount_total": 2500,
            "customer_email": "ada@example.com",
            "customer_details": { "email": "ada@example.com", "name": "Ada L." },
            "metadata": {
                "customer_name": "Ada Lovelace",
                "address": "12 Analytical Way",
                "city": "London",
                "zip": "N1 9GU"
            }
        })))
        .mount(gateway)
        .await;
}

async fn mount_line_items(gateway: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/checkout/sessions/{}/line_items", SESSION_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {
                    "description": "Ethiopian Yirgacheffe",
                    "quantity": 2,
                    "amount_total": 2500
                }
            ]
        })))
        .mount(gateway)
        .await;
}

async fn verify(app: &TestApp, session_id: Value) -> axum::response::Response {
    app.request(
        Method::POST,
        "/api/verify-stripe",
        Some(json!({ "sessionId": session_id })),
    )
    .await
}

#[tokio::test]
async fn test_paid_session_finalizes_pending_order() {
    let gateway = MockServer::start().await;
    mount_session_create(&gateway).await;
    mount_session_retrieve(&gateway, "paid").await;
    mount_line_items(&gateway).await;

    let app = TestApp::live(&gateway.uri()).await;
    let checkout = app
        .request(Method::POST, "/api/checkout", Some(checkout_payload()))
        .await;
    assert_eq!(checkout.status(), StatusCode::OK);

    let response = verify(&app, json!(SESSION_ID)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["orderId"], "ORD-ABCDEF12");

    let order = app
        .store
        .find_by_session_id(SESSION_ID)
        .await
        .unwrap()
        .expect("order kept");
    assert_eq!(order.order_id, "ORD-ABCDEF12");
    assert_eq!(order.status, OrderStatus::Paid);

    let sent = app.outbox.messages();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "ada@example.com");
    assert_eq!(sent[0].subject, "Order Confirmation #ORD-ABCDEF12");
    assert!(sent[0].html.contains("Ada Lovelace"));
    assert!(sent[0].html.contains("12 Analytical Way, London N1 9GU"));
    assert_eq!(sent[1].to, MERCHANT_INBOX);
    assert_eq!(sent[1].subject, "New Order [Merchant]: #ORD-ABCDEF12");
}

#[tokio::test]
async fn test_repeat_verification_does_not_resend_mail() {
    let gateway = MockServer::start().await;
    mount_session_create(&gateway).await;
    mount_session_retrieve(&gateway, "paid").await;
    mount_line_items(&gateway).await;

    let app = TestApp::live(&gateway.uri()).await;
    app.request(Method::POST, "/api/checkout", Some(checkout_payload()))
        .await;

    let first = response_json(verify(&app, json!(SESSION_ID)).await).await;
    let second = verify(&app, json!(SESSION_ID)).await;
    assert_eq!(second.status(), StatusCode::OK);
    let second = response_json(second).await;

    assert_eq!(first["orderId"], second["orderId"]);
    assert_eq!(app.outbox.messages().len(), 2);
}

#[tokio::test]
async fn test_unpaid_session_is_rejected_and_order_stays_pending() {
    let gateway = MockServer::start().await;
    mount_session_create(&gateway).await;
    mount_session_retrieve(&gateway, "unpaid").await;

    let app = TestApp::live(&gateway.uri()).await;
    app.request(Method::POST, "/api/checkout", Some(checkout_payload()))
        .await;

    let response = verify(&app, json!(SESSION_ID)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Payment not paid");

    let order = app
        .store
        .find_by_session_id(SESSION_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.order_id, "PENDING-ABCDEF12");
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(app.outbox.messages().is_empty());
}

#[tokio::test]
async fn test_paid_session_without_local_order_still_confirms() {
    let gateway = MockServer::start().await;
    mount_session_retrieve(&gateway, "paid").await;
    mount_line_items(&gateway).await;

    let app = TestApp::live(&gateway.uri()).await;

    let response = verify(&app, json!(SESSION_ID)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["orderId"], "ORD-ABCDEF12");
    assert_eq!(app.outbox.messages().len(), 2);
}

#[tokio::test]
async fn test_missing_session_id_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/verify-stripe", Some(json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Missing session ID");
}

#[tokio::test]
async fn test_malformed_session_reference_is_rejected() {
    let app = TestApp::new().await;

    for bad in ["mock_ORD-SIM-ABC_123", "mock_ORD-SIM-ABC123_now", "cs_test/../x"] {
        let response = verify(&app, json!(bad)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", bad);
    }
}

#[tokio::test]
async fn test_live_reference_in_simulation_mode_is_rejected() {
    let app = TestApp::new().await;

    let response = verify(&app, json!(SESSION_ID)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gateway_outage_is_opaque() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/checkout/sessions/{}", SESSION_ID)))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream sk_live_secret down"))
        .mount(&gateway)
        .await;

    let app = TestApp::live(&gateway.uri()).await;

    let response = verify(&app, json!(SESSION_ID)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Internal Server Error");
    assert!(!body.to_string().contains("sk_live_secret"));
}
