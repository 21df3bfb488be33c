#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use sea_orm::{DatabaseConnection, DbErr};
use serde_json::Value;
use storefront_api::{
    config::AppConfig,
    db,
    errors::ServiceError,
    handlers::AppServices,
    models::{NewOrder, OrderRecord},
    notifications::{EmailMessage, NotificationError, NotificationSender},
    repositories::{InMemoryOrderStore, OrderStore, PaymentTransition, SeaOrmOrderStore},
    services::{payment_gateway::StripeGateway, PaymentMode},
    AppState,
};
use tower::ServiceExt;

pub const MERCHANT_INBOX: &str = "orders@artisancoffee.test";
pub const PUBLIC_BASE_URL: &str = "http://shop.test";

/// Records every message instead of delivering it.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingSender {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("outbox lock").clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.subject).collect()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        self.sent.lock().expect("outbox lock").push(message);
        Ok(())
    }
}

/// Store whose every call fails like a lost database.
pub struct BrokenStore;

fn broken() -> ServiceError {
    ServiceError::DatabaseError(DbErr::Custom(
        "connection refused: secret-host:5432".to_string(),
    ))
}

#[async_trait]
impl OrderStore for BrokenStore {
    async fn create(&self, _order: NewOrder) -> Result<OrderRecord, ServiceError> {
        Err(broken())
    }

    async fn find_by_order_id(&self, _order_id: &str) -> Result<Option<OrderRecord>, ServiceError> {
        Err(broken())
    }

    async fn find_by_session_id(
        &self,
        _session_id: &str,
    ) -> Result<Option<OrderRecord>, ServiceError> {
        Err(broken())
    }

    async fn mark_paid(
        &self,
        _session_id: &str,
        _final_order_id: &str,
    ) -> Result<PaymentTransition, ServiceError> {
        Err(broken())
    }
}

/// Storefront router wired against test collaborators.
pub struct TestApp {
    router: Router,
    pub store: Arc<dyn OrderStore>,
    pub outbox: Arc<RecordingSender>,
    pub db: Option<Arc<DatabaseConnection>>,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    cfg.merchant_email = Some(MERCHANT_INBOX.to_string());
    cfg.public_base_url = PUBLIC_BASE_URL.to_string();
    cfg
}

impl TestApp {
    /// Simulation mode over the in-memory store
    pub async fn new() -> Self {
        Self::build(PaymentMode::Simulation, Arc::new(InMemoryOrderStore::new()), None)
    }

    /// Live mode against a fake gateway at `gateway_uri`
    pub async fn live(gateway_uri: &str) -> Self {
        let gateway = StripeGateway::new("sk_test_51Hstorefront", gateway_uri, Duration::from_secs(5))
            .expect("gateway client");
        Self::build(
            PaymentMode::Live(Arc::new(gateway)),
            Arc::new(InMemoryOrderStore::new()),
            None,
        )
    }

    /// Simulation mode over a migrated in-memory SQLite database
    pub async fn with_database() -> Self {
        let mut cfg = test_config();
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let pool = Arc::new(pool);
        Self::build(
            PaymentMode::Simulation,
            Arc::new(SeaOrmOrderStore::new(pool.clone())),
            Some(pool),
        )
    }

    /// Simulation mode over a store that always fails
    pub async fn broken() -> Self {
        Self::build(PaymentMode::Simulation, Arc::new(BrokenStore), None)
    }

    fn build(
        payment_mode: PaymentMode,
        store: Arc<dyn OrderStore>,
        db: Option<Arc<DatabaseConnection>>,
    ) -> Self {
        let cfg = test_config();
        let outbox = Arc::new(RecordingSender::default());

        let services = AppServices::new(
            &cfg,
            store.clone(),
            payment_mode,
            outbox.clone(),
            db.clone(),
        );
        let state = Arc::new(AppState {
            config: cfg,
            db: db.clone(),
            services,
        });

        Self {
            router: storefront_api::build_router(state),
            store,
            outbox,
            db,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Sends a raw body as JSON without serializing it first
    pub async fn post_raw(&self, uri: &str, raw: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(raw.to_string()))
            .expect("request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

/// A cart of two 12.50 coffees with a complete customer
pub fn checkout_payload() -> Value {
    serde_json::json!({
        "items": [
            {
                "product": {
                    "id": "ethiopian-yirgacheffe",
                    "name": "Ethiopian Yirgacheffe",
                    "price": "$12.50",
                    "image": "/images/ethiopian-yirgacheffe.jpg"
                },
                "quantity": 2
            }
        ],
        "customer": {
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "address": "12 Analytical Way",
            "city": "London",
            "zip": "N1 9GU"
        }
    })
}
