use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
    Disabled,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub database: ComponentStatus,
    pub payment_mode: String,
    pub response_time_ms: u128,
}

/// Liveness banner
pub async fn root() -> &'static str {
    "storefront-api up"
}

/// Readiness: database ping plus the payment mode in effect
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let start = Instant::now();

    let database = match &state.db {
        Some(db) => match crate::db::check_connection(db).await {
            Ok(()) => ComponentStatus::Up,
            Err(_) => ComponentStatus::Down,
        },
        None => ComponentStatus::Disabled,
    };

    let status = if database == ComponentStatus::Down {
        ComponentStatus::Down
    } else {
        ComponentStatus::Up
    };
    let code = if status == ComponentStatus::Up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            database,
            payment_mode: state.services.payment_mode.label().to_string(),
            response_time_ms: start.elapsed().as_millis(),
        }),
    )
}
