use crate::handlers::common::{json_body, success_response};
use crate::{
    entities::OrderStatus,
    errors::ServiceError,
    models::{OrderItem, OrderRecord},
    services::manual_orders::{ManualOrderConfirmation, ManualOrderRequest},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_manual_order))
        .route("/orders/:order_id", get(get_order))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManualOrderResponse {
    pub success: bool,
    pub order: ManualOrderView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManualOrderView {
    pub id: String,
    pub status: String,
    pub total: serde_json::Value,
}

impl From<ManualOrderConfirmation> for ManualOrderView {
    fn from(confirmation: ManualOrderConfirmation) -> Self {
        Self {
            id: confirmation.id,
            status: confirmation.status.to_string(),
            total: confirmation.total,
        }
    }
}

/// Public view of a stored order; contact details stay private.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_id: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderRecord> for OrderView {
    fn from(order: OrderRecord) -> Self {
        Self {
            order_id: order.order_id,
            status: order.status,
            items: order.items,
            total_amount: order.total_amount,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Place an order outside the payment gateway
async fn create_manual_order(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ManualOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_body(payload)?;
    let confirmation = state.services.manual_orders.place(request).await?;

    Ok(success_response(ManualOrderResponse {
        success: true,
        order: confirmation.into(),
    }))
}

/// Look up an order by its public id
async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .find_by_order_id(order_id.trim())
        .await?
        .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

    Ok(success_response(OrderView::from(order)))
}
