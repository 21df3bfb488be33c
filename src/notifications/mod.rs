pub mod templates;

use crate::config::AppConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use templates::Receipt;

/// An outgoing HTML email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mail delivery errors. Never surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Mail transport error: {0}")]
    Transport(String),
    #[error("Mail API rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Mail configuration error: {0}")]
    Config(String),
}

/// Delivers a formatted message to one address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

/// Logs recipient and subject instead of delivering.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        info!(to = %message.to, subject = %message.subject, "email logged (not delivered)");
        Ok(())
    }
}

#[derive(Serialize)]
struct MailApiPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Posts `{from, to, subject, html}` to a transactional mail API.
#[derive(Clone)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        from: &str,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSender for HttpEmailSender {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&MailApiPayload {
                from: &self.from,
                to: &message.to,
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(subject = %message.subject, "email delivered");
        Ok(())
    }
}

/// Builds the configured sender
pub fn sender_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn NotificationSender>, NotificationError> {
    if config.email_provider.eq_ignore_ascii_case("http") {
        let endpoint = config
            .email_api_url
            .as_deref()
            .ok_or_else(|| NotificationError::Config("email_api_url is not set".into()))?;
        let api_key = config
            .email_api_key
            .as_deref()
            .ok_or_else(|| NotificationError::Config("email_api_key is not set".into()))?;
        let sender = HttpEmailSender::new(
            endpoint,
            api_key,
            &config.email_from,
            config.gateway_timeout(),
        )?;
        Ok(Arc::new(sender))
    } else {
        Ok(Arc::new(LogNotificationSender))
    }
}

/// Composes storefront mail and sends it best-effort: failures are logged
/// and never returned.
#[derive(Clone)]
pub struct OrderMailer {
    sender: Arc<dyn NotificationSender>,
    merchant_inbox: Option<String>,
    public_base_url: String,
}

impl OrderMailer {
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        merchant_inbox: Option<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            merchant_inbox,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn from_config(config: &AppConfig, sender: Arc<dyn NotificationSender>) -> Self {
        Self::new(
            sender,
            config.merchant_inbox().map(str::to_string),
            config.public_base_url(),
        )
    }

    async fn deliver(&self, kind: &str, message: EmailMessage) -> bool {
        let to = message.to.clone();
        match self.sender.send(message).await {
            Ok(()) => true,
            Err(e) => {
                error!(kind, to = %to, error = %e, "failed to send notification");
                false
            }
        }
    }

    async fn alert_merchant(&self, subject: String, html: String) -> bool {
        match &self.merchant_inbox {
            Some(inbox) => {
                self.deliver(
                    "merchant_alert",
                    EmailMessage {
                        to: inbox.clone(),
                        subject,
                        html,
                    },
                )
                .await
            }
            None => {
                warn!("No merchant inbox configured; skipping merchant notification");
                false
            }
        }
    }

    /// Customer confirmation followed by the merchant new-order alert.
    pub async fn order_confirmed(
        &self,
        customer_email: &str,
        receipt: &Receipt,
        simulated: bool,
    ) {
        let html = templates::order_confirmation_html(receipt, &self.public_base_url);
        let subject = if simulated {
            format!(
                "Order Confirmation #{}{}",
                receipt.order_id,
                templates::SIMULATION_SUFFIX
            )
        } else {
            format!("Order Confirmation #{}", receipt.order_id)
        };

        self.deliver(
            "order_confirmation",
            EmailMessage {
                to: customer_email.to_string(),
                subject,
                html: html.clone(),
            },
        )
        .await;

        self.alert_merchant(
            format!("New Order [Merchant]: #{}", receipt.order_id),
            templates::merchant_alert_html(&receipt.customer_name, customer_email, &html),
        )
        .await;
    }

    /// Customer confirmation only; the manual path has no merchant alert.
    pub async fn manual_order_confirmed(&self, customer_email: &str, receipt: &Receipt) {
        self.deliver(
            "order_confirmation",
            EmailMessage {
                to: customer_email.to_string(),
                subject: format!("Order Confirmation #{}", receipt.order_id),
                html: templates::order_confirmation_html(receipt, &self.public_base_url),
            },
        )
        .await;
    }

    pub async fn contact_received(&self, name: &str, email: &str, message: &str) {
        self.alert_merchant(
            format!("New Contact Form Submission from {}", name),
            templates::contact_admin_html(name, email, message),
        )
        .await;

        self.deliver(
            "contact_acknowledgement",
            EmailMessage {
                to: email.to_string(),
                subject: "We received your message!".to_string(),
                html: templates::contact_ack_html(name),
            },
        )
        .await;
    }
}
