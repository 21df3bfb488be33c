use crate::entities::OrderStatus;
use crate::errors::ServiceError;
use crate::models::cart::{format_money, PricedCart};
use crate::models::order::{
    pending_order_id, simulated_order_id, simulated_session_ref, validate_session_id,
};
use crate::models::{CartLine, Customer, NewOrder, OrderRecord};
use crate::notifications::templates::{self, Receipt, ReceiptLine};
use crate::notifications::OrderMailer;
use crate::repositories::OrderStore;
use crate::services::payment_gateway::{
    CreateSessionRequest, PaymentGateway, PaymentMode, SessionLineItem,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Attempts at drawing a simulated order id not already in the store
const SIMULATED_ID_ATTEMPTS: usize = 5;

/// Result of a checkout: where to send the shopper, and the stored order.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub url: String,
    pub order: OrderRecord,
}

/// Turns a cart into a persisted order and a redirect target.
pub struct CheckoutService {
    store: Arc<dyn OrderStore>,
    mode: PaymentMode,
    mailer: OrderMailer,
    public_base_url: String,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        mode: PaymentMode,
        mailer: OrderMailer,
        public_base_url: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mode,
            mailer,
            public_base_url: public_base_url.into(),
            currency: currency.into().to_ascii_lowercase(),
        }
    }

    #[instrument(skip(self, items, customer), fields(mode = self.mode.label(), lines = items.len()))]
    pub async fn checkout(
        &self,
        items: &[CartLine],
        customer: Customer,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let cart = PricedCart::from_lines(items)?;
        let customer = customer.checked()?;

        match &self.mode {
            PaymentMode::Simulation => self.simulated_checkout(cart, customer).await,
            PaymentMode::Live(gateway) => self.live_checkout(gateway.as_ref(), cart, customer).await,
        }
    }

    async fn simulated_checkout(
        &self,
        cart: PricedCart,
        customer: Customer,
    ) -> Result<CheckoutOutcome, ServiceError> {
        warn!("Payment gateway not configured; completing checkout in SIMULATION MODE");

        let order_id = self.unique_simulated_order_id().await?;
        let session_ref = simulated_session_ref(&order_id, Utc::now().timestamp_millis());

        let order = self
            .store
            .create(NewOrder {
                order_id,
                customer,
                items: cart.order_items(),
                total_amount: cart.total_amount(),
                status: OrderStatus::Paid,
                gateway_session_id: session_ref.clone(),
            })
            .await?;

        info!(order_id = %order.order_id, total = %order.total_amount, "simulated order paid");

        // The order is already paid; mail is best-effort from here on.
        let receipt = receipt_for(&order, &cart, true);
        self.mailer
            .order_confirmed(&order.customer.email, &receipt, true)
            .await;

        Ok(CheckoutOutcome {
            url: format!(
                "{}/success?session_id={}",
                self.public_base_url, session_ref
            ),
            order,
        })
    }

    async fn live_checkout(
        &self,
        gateway: &dyn PaymentGateway,
        cart: PricedCart,
        customer: Customer,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let request = self.session_request(&cart, &customer);
        let session = gateway.create_session(request).await?;

        validate_session_id(&session.id).map_err(|_| {
            ServiceError::ExternalServiceError(format!(
                "Gateway returned an unusable session id '{}'",
                session.id
            ))
        })?;
        let url = session.url.clone().ok_or_else(|| {
            ServiceError::ExternalServiceError(format!(
                "Gateway session {} has no redirect URL",
                session.id
            ))
        })?;

        let order = self
            .store
            .create(NewOrder {
                order_id: pending_order_id(&session.id),
                customer,
                items: cart.order_items(),
                total_amount: cart.total_amount(),
                status: OrderStatus::Pending,
                gateway_session_id: session.id.clone(),
            })
            .await?;

        info!(
            order_id = %order.order_id,
            session_id = %session.id,
            total = %order.total_amount,
            "pending order created for gateway session"
        );

        Ok(CheckoutOutcome { url, order })
    }

    fn session_request(&self, cart: &PricedCart, customer: &Customer) -> CreateSessionRequest {
        let line_items = cart
            .lines()
            .iter()
            .map(|line| SessionLineItem {
                name: line.name.clone(),
                image: line
                    .image
                    .as_deref()
                    .map(|image| absolute_url(&self.public_base_url, image)),
                unit_amount: line.unit_amount,
                quantity: line.quantity,
            })
            .collect();

        // Delivery details only reach verification through session metadata.
        let metadata = BTreeMap::from([
            ("customer_name".to_string(), customer.name.clone()),
            ("address".to_string(), customer.address.clone()),
            ("city".to_string(), customer.city.clone()),
            ("zip".to_string(), customer.zip.clone()),
        ]);

        CreateSessionRequest {
            line_items,
            currency: self.currency.clone(),
            success_url: format!(
                "{}/success?session_id={{CHECKOUT_SESSION_ID}}",
                self.public_base_url
            ),
            cancel_url: format!("{}/checkout", self.public_base_url),
            customer_email: customer.email.clone(),
            metadata,
        }
    }

    async fn unique_simulated_order_id(&self) -> Result<String, ServiceError> {
        for attempt in 1..=SIMULATED_ID_ATTEMPTS {
            let candidate = simulated_order_id();
            if self.store.find_by_order_id(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            debug!(attempt, candidate = %candidate, "simulated order id already taken");
        }

        Err(ServiceError::InternalError(format!(
            "No free simulated order id after {} attempts",
            SIMULATED_ID_ATTEMPTS
        )))
    }
}

fn receipt_for(order: &OrderRecord, cart: &PricedCart, simulated: bool) -> Receipt {
    Receipt {
        order_id: order.order_id.clone(),
        customer_name: order.customer.name.clone(),
        items: cart
            .lines()
            .iter()
            .map(|line| ReceiptLine {
                name: line.name.clone(),
                quantity: line.quantity,
                price: format_money(line.unit_price() * Decimal::from(line.quantity)),
            })
            .collect(),
        total: order.total_amount,
        delivery_address: templates::delivery_address(
            &order.customer.address,
            &order.customer.city,
            &order.customer.zip,
        ),
        estimated_delivery: templates::estimated_delivery(simulated),
    }
}

/// Gateways need publicly resolvable image URLs.
pub fn absolute_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
