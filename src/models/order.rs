use crate::entities::order::{self, OrderStatus};
use crate::errors::ServiceError;
use crate::models::cart::Customer;
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const BASE36_UPPER: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SIMULATED_ID_PREFIX: &str = "ORD-SIM-";
const SIMULATED_ID_LEN: usize = 6;
const MANUAL_ID_LEN: usize = 9;
const SESSION_SUFFIX_LEN: usize = 8;
const SIMULATED_REF_PREFIX: &str = "mock_";

/// Line item snapshot stored with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
}

/// Everything the checkout flow decides about an order before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_id: String,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub gateway_session_id: String,
}

/// A stored order as seen by services and handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(skip)]
    pub id: Uuid,
    pub order_id: String,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub gateway_session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn from_new(order: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order.order_id,
            customer: order.customer,
            items: order.items,
            total_amount: order.total_amount,
            status: order.status,
            gateway_session_id: order.gateway_session_id,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<order::Model> for OrderRecord {
    type Error = ServiceError;

    fn try_from(model: order::Model) -> Result<Self, Self::Error> {
        let customer = serde_json::from_value(model.customer).map_err(|e| {
            ServiceError::InternalError(format!(
                "Corrupt customer snapshot on order {}: {}",
                model.order_id, e
            ))
        })?;
        let items = serde_json::from_value(model.items).map_err(|e| {
            ServiceError::InternalError(format!(
                "Corrupt item snapshot on order {}: {}",
                model.order_id, e
            ))
        })?;

        Ok(Self {
            id: model.id,
            order_id: model.order_id,
            customer,
            items,
            total_amount: model.total_amount,
            status: model.status,
            gateway_session_id: model.gateway_session_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36_UPPER[rng.gen_range(0..BASE36_UPPER.len())] as char)
        .collect()
}

/// `ORD-SIM-XXXXXX`
pub fn simulated_order_id() -> String {
    format!("{}{}", SIMULATED_ID_PREFIX, random_base36(SIMULATED_ID_LEN))
}

/// `ORD-XXXXXXXXX`, used by the manual order path
pub fn manual_order_id() -> String {
    format!("ORD-{}", random_base36(MANUAL_ID_LEN))
}

fn session_suffix(session_id: &str) -> String {
    let chars: Vec<char> = session_id.chars().collect();
    let start = chars.len().saturating_sub(SESSION_SUFFIX_LEN);
    chars[start..].iter().collect::<String>().to_uppercase()
}

/// Order id held while the gateway session is unpaid
pub fn pending_order_id(session_id: &str) -> String {
    format!("PENDING-{}", session_suffix(session_id))
}

/// Order id once the gateway confirms payment. Deterministic per session.
pub fn final_order_id(session_id: &str) -> String {
    format!("ORD-{}", session_suffix(session_id))
}

/// Session reference handed back for a simulated checkout
pub fn simulated_session_ref(order_id: &str, timestamp_millis: i64) -> String {
    format!("{}{}_{}", SIMULATED_REF_PREFIX, order_id, timestamp_millis)
}

pub fn is_simulated_session_ref(reference: &str) -> bool {
    reference.starts_with(SIMULATED_REF_PREFIX)
}

fn is_simulated_order_id(order_id: &str) -> bool {
    order_id
        .strip_prefix(SIMULATED_ID_PREFIX)
        .map(|suffix| {
            suffix.len() == SIMULATED_ID_LEN
                && suffix
                    .bytes()
                    .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        })
        .unwrap_or(false)
}

/// Extracts the order id from `mock_<orderId>_<millis>`.
pub fn parse_simulated_session_ref(reference: &str) -> Result<String, ServiceError> {
    let invalid = || ServiceError::ValidationError("Invalid session reference".to_string());

    let body = reference
        .strip_prefix(SIMULATED_REF_PREFIX)
        .ok_or_else(invalid)?;
    let (order_id, timestamp) = body.rsplit_once('_').ok_or_else(invalid)?;

    if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if !is_simulated_order_id(order_id) {
        return Err(invalid());
    }

    Ok(order_id.to_string())
}

/// Gateway session ids end up in URL paths; only `[A-Za-z0-9_-]` is accepted.
pub fn validate_session_id(session_id: &str) -> Result<(), ServiceError> {
    if session_id.is_empty() {
        return Err(ServiceError::ValidationError(
            "Missing session ID".to_string(),
        ));
    }
    if !session_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(ServiceError::ValidationError(
            "Invalid session reference".to_string(),
        ));
    }
    Ok(())
}
