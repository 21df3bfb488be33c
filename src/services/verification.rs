use crate::entities::OrderStatus;
use crate::errors::ServiceError;
use crate::models::cart::{format_money, FALLBACK_ITEM_NAME};
use crate::models::order::{
    final_order_id, is_simulated_session_ref, parse_simulated_session_ref, validate_session_id,
};
use crate::notifications::templates::{self, Receipt, ReceiptLine};
use crate::notifications::OrderMailer;
use crate::repositories::{OrderStore, PaymentTransition};
use crate::services::payment_gateway::{
    GatewayLineItem, GatewaySession, PaymentGateway, PaymentMode,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const GUEST_NAME: &str = "Guest";

/// Reconciles a returned session reference with the gateway and the store.
pub struct VerificationService {
    store: Arc<dyn OrderStore>,
    mode: PaymentMode,
    mailer: OrderMailer,
}

impl VerificationService {
    pub fn new(store: Arc<dyn OrderStore>, mode: PaymentMode, mailer: OrderMailer) -> Self {
        Self {
            store,
            mode,
            mailer,
        }
    }

    /// Returns the final order id for a paid session.
    #[instrument(skip(self), fields(mode = self.mode.label()))]
    pub async fn verify(&self, session_ref: &str) -> Result<String, ServiceError> {
        let session_ref = session_ref.trim();
        validate_session_id(session_ref)?;

        // Simulated orders were finalized at checkout; nothing to reconcile.
        if is_simulated_session_ref(session_ref) {
            let order_id = parse_simulated_session_ref(session_ref)?;
            info!(order_id = %order_id, "simulated session verified");
            return Ok(order_id);
        }

        match &self.mode {
            PaymentMode::Live(gateway) => self.reconcile(gateway.as_ref(), session_ref).await,
            PaymentMode::Simulation => Err(ServiceError::ValidationError(
                "Invalid session reference".to_string(),
            )),
        }
    }

    async fn reconcile(
        &self,
        gateway: &dyn PaymentGateway,
        session_id: &str,
    ) -> Result<String, ServiceError> {
        let session = gateway.retrieve_session(session_id).await?;
        if !session.is_paid() {
            warn!(
                session_id,
                payment_status = %session.payment_status,
                "verification attempted on unpaid session"
            );
            return Err(ServiceError::PaymentNotCompleted(
                "Payment not paid".to_string(),
            ));
        }

        let line_items = gateway.list_line_items(session_id).await?;
        let order_id = final_order_id(session_id);

        match self.store.mark_paid(session_id, &order_id).await? {
            PaymentTransition::Transitioned(order) => {
                info!(order_id = %order.order_id, "order marked paid");
            }
            PaymentTransition::Unchanged(order) => {
                if order.status == OrderStatus::Paid {
                    info!(order_id = %order.order_id, "session already verified; not resending mail");
                } else {
                    warn!(
                        order_id = %order.order_id,
                        status = %order.status,
                        "gateway reports paid but order is not pending; leaving it untouched"
                    );
                }
                return Ok(order.order_id);
            }
            PaymentTransition::Missing => {
                warn!(
                    session_id,
                    order_id = %order_id,
                    "no stored order for paid session; sending confirmation anyway"
                );
            }
        }

        self.notify(&session, &line_items, &order_id).await;
        Ok(order_id)
    }

    async fn notify(&self, session: &GatewaySession, line_items: &[GatewayLineItem], order_id: &str) {
        // Only the gateway-confirmed address is trusted here.
        let Some(email) = session.confirmed_email() else {
            warn!(order_id, "paid session has no customer email; skipping notifications");
            return;
        };

        let receipt = receipt_from_session(session, line_items, order_id);
        self.mailer.order_confirmed(email, &receipt, false).await;
    }
}

fn minor_to_decimal(amount: Option<i64>) -> Decimal {
    Decimal::new(amount.unwrap_or(0), 2)
}

fn receipt_from_session(
    session: &GatewaySession,
    line_items: &[GatewayLineItem],
    order_id: &str,
) -> Receipt {
    let customer_name = session
        .metadata_value("customer_name")
        .or_else(|| {
            session
                .customer_details
                .as_ref()
                .and_then(|details| details.name.as_deref())
                .map(str::trim)
                .filter(|name| !name.is_empty())
        })
        .unwrap_or(GUEST_NAME);

    Receipt {
        order_id: order_id.to_string(),
        customer_name: customer_name.to_string(),
        items: line_items
            .iter()
            .map(|item| ReceiptLine {
                name: item
                    .description
                    .clone()
                    .unwrap_or_else(|| FALLBACK_ITEM_NAME.to_string()),
                quantity: item.quantity.unwrap_or(1),
                price: format_money(minor_to_decimal(item.amount_total)),
            })
            .collect(),
        total: minor_to_decimal(session.amount_total),
        delivery_address: templates::delivery_address(
            session.metadata_value("address").unwrap_or(""),
            session.metadata_value("city").unwrap_or(""),
            session.metadata_value("zip").unwrap_or(""),
        ),
        estimated_delivery: templates::estimated_delivery(false),
    }
}
