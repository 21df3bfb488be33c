use crate::config::AppConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// One priced line sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    /// Absolute image URL
    pub image: Option<String>,
    /// Unit price in minor units
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Request for a hosted payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionRequest {
    pub line_items: Vec<SessionLineItem>,
    pub currency: String,
    /// Must contain `{CHECKOUT_SESSION_ID}`, substituted by the gateway on redirect
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Hosted payment session as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewaySession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl GatewaySession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Email confirmed by the gateway, preferring what the payer entered.
    pub fn confirmed_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|details| details.email.as_deref())
            .or(self.customer_email.as_deref())
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Line item actually charged on a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayLineItem {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub amount_total: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// Hosted payment session provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<GatewaySession, ServiceError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, ServiceError>;

    async fn list_line_items(&self, session_id: &str)
        -> Result<Vec<GatewayLineItem>, ServiceError>;
}

/// Resolved once at startup and injected into the orchestrators.
#[derive(Clone)]
pub enum PaymentMode {
    Simulation,
    Live(Arc<dyn PaymentGateway>),
}

impl PaymentMode {
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        match config.stripe_credential() {
            Some(secret) => {
                let gateway = StripeGateway::new(
                    secret,
                    &config.stripe_api_base,
                    config.gateway_timeout(),
                )?;
                info!("Payment gateway configured; checkout runs in live mode");
                Ok(PaymentMode::Live(Arc::new(gateway)))
            }
            None => {
                warn!("Payment gateway credential missing or placeholder; using SIMULATION MODE");
                Ok(PaymentMode::Simulation)
            }
        }
    }

    pub fn is_simulation(&self) -> bool {
        matches!(self, PaymentMode::Simulation)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMode::Simulation => "simulation",
            PaymentMode::Live(_) => "live",
        }
    }
}

impl std::fmt::Debug for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Stripe Checkout over its REST API.
#[derive(Clone)]
pub struct StripeGateway {
    secret_key: String,
    api_base: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(secret_key: &str, api_base: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "Stripe {} failed: {}", operation, error_text);
            return Err(ServiceError::ExternalServiceError(format!(
                "Stripe {} returned {}",
                operation, status
            )));
        }

        response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!(
                "Failed to parse Stripe {} response: {}",
                operation, e
            ))
        })
    }
}

/// Flattens a session request into Stripe's bracketed form encoding.
fn session_form(request: &CreateSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("customer_email".to_string(), request.customer_email.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        params.push((
            format!("{}[price_data][currency]", prefix),
            request.currency.clone(),
        ));
        params.push((
            format!("{}[price_data][product_data][name]", prefix),
            item.name.clone(),
        ));
        if let Some(image) = &item.image {
            params.push((
                format!("{}[price_data][product_data][images][0]", prefix),
                image.clone(),
            ));
        }
        params.push((
            format!("{}[price_data][unit_amount]", prefix),
            item.unit_amount.to_string(),
        ));
        params.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
    }

    for (key, value) in &request.metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
    }

    params
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<GatewaySession, ServiceError> {
        let response = self
            .client
            .post(self.url("/v1/checkout/sessions"))
            .basic_auth(&self.secret_key, Some(""))
            .form(&session_form(&request))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Stripe API error: {}", e)))?;

        let session: GatewaySession = Self::read_json(response, "session create").await?;
        info!(session_id = %session.id, "Stripe checkout session created");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, ServiceError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/checkout/sessions/{}", session_id)))
            .basic_auth(&self.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Stripe API error: {}", e)))?;

        Self::read_json(response, "session retrieve").await
    }

    #[instrument(skip(self))]
    async fn list_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<GatewayLineItem>, ServiceError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/checkout/sessions/{}/line_items", session_id)))
            .basic_auth(&self.secret_key, Some(""))
            .query(&[("limit", "100")])
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Stripe API error: {}", e)))?;

        let list: ListResponse<GatewayLineItem> =
            Self::read_json(response, "line item listing").await?;
        Ok(list.data)
    }
}
