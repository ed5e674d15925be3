use std::sync::Arc;

use thiserror::Error;

use crate::phone::{normalize, PhoneError};
use crate::templates::MessageTemplates;
use crate::transport::{MessageId, MessageTransport, TransportError};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Phone(#[from] PhoneError),
    #[error("template rendering failed: {0}")]
    Template(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Renders a message body and delivers it to a normalized phone number.
/// Invalid numbers fail before any send is attempted.
pub struct Notifier {
    transport: Arc<dyn MessageTransport>,
    templates: MessageTemplates,
    default_country_code: String,
}

impl Notifier {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        templates: MessageTemplates,
        default_country_code: impl Into<String>,
    ) -> Self {
        Self { transport, templates, default_country_code: default_country_code.into() }
    }

    pub async fn send_payment_link(
        &self,
        phone: &str,
        customer_name: &str,
        quote_reference: &str,
        plan_name: &str,
        url: &str,
    ) -> Result<MessageId, NotifyError> {
        let to = normalize(phone, &self.default_country_code)?;
        let body = self
            .templates
            .payment_link(customer_name, quote_reference, plan_name, url)
            .map_err(|error| NotifyError::Template(error.to_string()))?;
        Ok(self.transport.send(&to, &body).await?)
    }

    pub async fn send_approval_decision(
        &self,
        phone: &str,
        agent_name: &str,
        quote_reference: &str,
        granted: bool,
    ) -> Result<MessageId, NotifyError> {
        let to = normalize(phone, &self.default_country_code)?;
        let body = self
            .templates
            .approval_decision(agent_name, quote_reference, granted)
            .map_err(|error| NotifyError::Template(error.to_string()))?;
        Ok(self.transport.send(&to, &body).await?)
    }

    pub async fn send_renewal_reminder(
        &self,
        phone: &str,
        customer_name: &str,
        policy_number: &str,
        days_left: i64,
    ) -> Result<MessageId, NotifyError> {
        let to = normalize(phone, &self.default_country_code)?;
        let body = self
            .templates
            .renewal_reminder(customer_name, policy_number, days_left)
            .map_err(|error| NotifyError::Template(error.to_string()))?;
        Ok(self.transport.send(&to, &body).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Notifier, NotifyError};
    use crate::templates::MessageTemplates;
    use crate::transport::MockTransport;

    fn notifier() -> Notifier {
        Notifier::new(
            Arc::new(MockTransport::instant()),
            MessageTemplates::new().expect("templates compile"),
            "973",
        )
    }

    #[tokio::test]
    async fn payment_link_notification_delivers_to_normalized_number() {
        let receipt = notifier()
            .send_payment_link(
                "36001234",
                "Ali Hasan",
                "MTR-0001",
                "Comprehensive Plus",
                "https://pay.example/t1",
            )
            .await
            .expect("delivery");
        assert_eq!(receipt.0, "mock-1");
    }

    #[tokio::test]
    async fn invalid_numbers_fail_before_any_send() {
        let error = notifier()
            .send_renewal_reminder("12-34", "Maryam Isa", "POL-7001", 15)
            .await
            .expect_err("bad number");
        assert!(matches!(error, NotifyError::Phone(_)));
    }
}
