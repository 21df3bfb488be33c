use crate::handlers::common::{json_body, success_response};
use crate::{
    errors::ServiceError,
    models::{CartLine, Customer},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Creates the router for checkout and payment verification
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/verify-stripe", post(verify_payment))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub customer: Customer,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub order_id: String,
}

/// Start a checkout for the submitted cart
async fn create_checkout(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_body(payload)?;
    let outcome = state
        .services
        .checkout
        .checkout(&request.items, request.customer)
        .await?;

    Ok(success_response(CheckoutResponse { url: outcome.url }))
}

/// Confirm payment for the session reference returned by checkout
async fn verify_payment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_body(payload)?;
    let session_ref = request.session_id.unwrap_or_default();
    let order_id = state.services.verification.verify(&session_ref).await?;

    Ok(success_response(VerifyResponse {
        success: true,
        order_id,
    }))
}
