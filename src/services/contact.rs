use crate::errors::ServiceError;
use crate::notifications::OrderMailer;
use serde::Deserialize;
use tracing::{info, instrument};
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ContactRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub message: String,
}

/// Relays contact form messages to the merchant and acknowledges the sender.
pub struct ContactService {
    mailer: OrderMailer,
}

impl ContactService {
    pub fn new(mailer: OrderMailer) -> Self {
        Self { mailer }
    }

    #[instrument(skip_all)]
    pub async fn submit(&self, request: ContactRequest) -> Result<(), ServiceError> {
        let request = ContactRequest {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            message: request.message.trim().to_string(),
        };
        request
            .validate()
            .map_err(|_| ServiceError::ValidationError("Missing required fields".into()))?;

        info!("contact form submitted");
        self.mailer
            .contact_received(&request.name, &request.email, &request.message)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{EmailMessage, MockNotificationSender};
    use assert_matches::assert_matches;
    use mockall::predicate::function;
    use std::sync::Arc;

    #[tokio::test]
    async fn relays_to_merchant_and_acknowledges_sender() {
        let mut sender = MockNotificationSender::new();
        sender
            .expect_send()
            .with(function(|m: &EmailMessage| {
                m.to == "hello@artisancoffee.com"
                    && m.subject == "New Contact Form Submission from Bo"
            }))
            .times(1)
            .returning(|_| Ok(()));
        sender
            .expect_send()
            .with(function(|m: &EmailMessage| {
                m.to == "bo@example.com" && m.subject == "We received your message!"
            }))
            .times(1)
            .returning(|_| Ok(()));

        let svc = ContactService::new(OrderMailer::new(
            Arc::new(sender),
            Some("hello@artisancoffee.com".into()),
            "http://localhost:3000",
        ));

        svc.submit(ContactRequest {
            name: "Bo".into(),
            email: " bo@example.com ".into(),
            message: "Do you ship to Canada?".into(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let svc = ContactService::new(OrderMailer::new(
            Arc::new(MockNotificationSender::new()),
            None,
            "http://localhost:3000",
        ));

        assert_matches!(
            svc.submit(ContactRequest {
                name: "Bo".into(),
                email: "bo@example.com".into(),
                message: "  ".into(),
            })
            .await,
            Err(ServiceError::ValidationError(_))
        );
    }
}
