pub mod checkout;
pub mod common;
pub mod contact;
pub mod health;
pub mod orders;
pub mod products;

use crate::config::AppConfig;
use crate::notifications::{NotificationSender, OrderMailer};
use crate::repositories::OrderStore;
use crate::services::{
    catalog::CatalogService, checkout::CheckoutService, contact::ContactService,
    manual_orders::ManualOrderService, verification::VerificationService, PaymentMode,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
    pub verification: Arc<VerificationService>,
    pub manual_orders: Arc<ManualOrderService>,
    pub catalog: Arc<CatalogService>,
    pub contact: Arc<ContactService>,
    pub orders: Arc<dyn OrderStore>,
    pub payment_mode: PaymentMode,
}

impl AppServices {
    /// Wires every service from one store, one payment mode and one sender.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn OrderStore>,
        payment_mode: PaymentMode,
        sender: Arc<dyn NotificationSender>,
        db: Option<Arc<DatabaseConnection>>,
    ) -> Self {
        let mailer = OrderMailer::from_config(config, sender);

        Self {
            checkout: Arc::new(CheckoutService::new(
                store.clone(),
                payment_mode.clone(),
                mailer.clone(),
                config.public_base_url(),
                config.currency.clone(),
            )),
            verification: Arc::new(VerificationService::new(
                store.clone(),
                payment_mode.clone(),
                mailer.clone(),
            )),
            manual_orders: Arc::new(ManualOrderService::new(mailer.clone())),
            catalog: Arc::new(CatalogService::new(db)),
            contact: Arc::new(ContactService::new(mailer)),
            orders: store,
            payment_mode,
        }
    }
}
