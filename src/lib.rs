//! Storefront API Library
//!
//! Catalog, checkout, payment verification and transactional mail for the
//! Artisan Coffee storefront.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod notifications;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{middleware, routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer};

use handlers::{
    checkout::checkout_routes, contact::contact_routes, orders::order_routes,
    products::product_routes,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    /// Absent when running on the in-memory order store
    pub db: Option<Arc<DatabaseConnection>>,
    pub services: handlers::AppServices,
}

/// Every `/api` route
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(checkout_routes())
        .merge(order_routes())
        .merge(product_routes())
        .merge(contact_routes())
}

/// Full application router with request id, tracing, compression and body
/// limit layers. CORS is added by the binary.
pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body_size = state.config.max_body_size;

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api_routes())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(CompressionLayer::new())
        .layer(crate::tracing::configure_http_tracing())
        .layer(middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
