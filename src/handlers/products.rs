use crate::AppState;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

pub fn product_routes() -> Router<Arc<AppState>> {
    Router::new().route("/products", get(list_products))
}

/// List the catalog; never fails, the built-in list is the fallback
async fn list_products(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.services.catalog.list_products().await)
}
