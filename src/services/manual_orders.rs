use crate::errors::ServiceError;
use crate::models::cart::{parse_price, FALLBACK_ITEM_NAME};
use crate::models::order::manual_order_id;
use crate::notifications::templates::{self, Receipt, ReceiptLine};
use crate::notifications::OrderMailer;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};
use validator::Validate;

const MISSING_FIELDS: &str = "Missing required fields";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOrderItem {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub price: Value,
}

fn one() -> u32 {
    1
}

impl ManualOrderItem {
    fn display_name(&self) -> String {
        [&self.product_name, &self.name]
            .into_iter()
            .flatten()
            .map(|name| name.trim())
            .find(|name| !name.is_empty())
            .unwrap_or(FALLBACK_ITEM_NAME)
            .to_string()
    }

    /// Strings are shown as sent; numbers get a dollar sign.
    fn display_price(&self) -> String {
        match &self.price {
            Value::String(text) => text.clone(),
            Value::Number(number) => format!("${}", number),
            _ => String::new(),
        }
    }
}

/// Order placed outside the payment gateway. Nothing is persisted.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub items: Vec<ManualOrderItem>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub customer_name: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub delivery_address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub total_price: Value,
}

impl ManualOrderRequest {
    fn normalized(mut self) -> Self {
        self.customer_name = self.customer_name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.delivery_address = self.delivery_address.trim().to_string();
        self.city = self.city.trim().to_string();
        self.postal_code = self.postal_code.trim().to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualOrderConfirmation {
    pub id: String,
    pub status: &'static str,
    /// Echoes the submitted total
    pub total: Value,
}

fn total_of(value: &Value) -> Result<Decimal, ServiceError> {
    match value {
        Value::Null => Ok(Decimal::ZERO),
        Value::Number(number) => parse_price(&number.to_string()),
        Value::String(text) => parse_price(text),
        _ => Err(ServiceError::ValidationError("Invalid total price".into())),
    }
}

pub struct ManualOrderService {
    mailer: OrderMailer,
}

impl ManualOrderService {
    pub fn new(mailer: OrderMailer) -> Self {
        Self { mailer }
    }

    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn place(
        &self,
        request: ManualOrderRequest,
    ) -> Result<ManualOrderConfirmation, ServiceError> {
        let request = request.normalized();
        request
            .validate()
            .map_err(|_| ServiceError::ValidationError(MISSING_FIELDS.to_string()))?;
        let total = total_of(&request.total_price)?;

        let id = manual_order_id();
        let receipt = Receipt {
            order_id: id.clone(),
            customer_name: request.customer_name.clone(),
            items: request
                .items
                .iter()
                .map(|item| ReceiptLine {
                    name: item.display_name(),
                    quantity: item.quantity,
                    price: item.display_price(),
                })
                .collect(),
            total,
            delivery_address: templates::delivery_address(
                &request.delivery_address,
                &request.city,
                &request.postal_code,
            ),
            estimated_delivery: templates::estimated_delivery(false),
        };

        info!(order_id = %id, "manual order confirmed");
        self.mailer
            .manual_order_confirmed(&request.email, &receipt)
            .await;

        Ok(ManualOrderConfirmation {
            id,
            status: "confirmed",
            total: request.total_price,
        })
    }
}
