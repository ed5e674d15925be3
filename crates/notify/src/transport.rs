use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::phone::E164;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageId(pub String);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("messaging API request failed: {0}")]
    Http(String),
    #[error("messaging API rejected the message ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("simulated delivery failure for {to}")]
    SimulatedFailure { to: String },
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, to: &E164, body: &str) -> Result<MessageId, TransportError>;
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    to: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct OutboundReceipt {
    message_id: String,
}

/// Client for a template-messaging HTTP API: `POST {base}/messages` with a
/// bearer token, JSON `{to, body}` in, JSON `{message_id}` out.
pub struct HttpMessageTransport {
    client: reqwest::Client,
    base_url: String,
    api_token: SecretString,
}

impl HttpMessageTransport {
    pub fn new(base_url: impl Into<String>, api_token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_token,
        }
    }
}

#[async_trait]
impl MessageTransport for HttpMessageTransport {
    async fn send(&self, to: &E164, body: &str) -> Result<MessageId, TransportError> {
        let url = format!("{}/messages", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_token.expose_secret())
            .json(&OutboundMessage { to: to.as_str(), body })
            .send()
            .await
            .map_err(|error| TransportError::Http(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected { status: status.as_u16(), detail });
        }

        let receipt: OutboundReceipt =
            response.json().await.map_err(|error| TransportError::Http(error.to_string()))?;
        Ok(MessageId(receipt.message_id))
    }
}

/// Stand-in for the vendor gateway in development and tests: ~500 ms of
/// simulated latency, and every 20th send fails so the ~95% delivery rate of
/// the real channel is reproduced deterministically.
pub struct MockTransport {
    latency: Duration,
    sends: AtomicU64,
}

impl MockTransport {
    pub fn new(latency: Duration) -> Self {
        Self { latency, sends: AtomicU64::new(0) }
    }

    /// Zero-latency variant for tests.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn send(&self, to: &E164, body: &str) -> Result<MessageId, TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let sequence = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
        if sequence % 20 == 0 {
            return Err(TransportError::SimulatedFailure { to: to.to_string() });
        }

        info!(
            event_name = "notify.mock.delivered",
            to = %to,
            body_chars = body.chars().count(),
            "mock message delivered"
        );
        Ok(MessageId(format!("mock-{sequence}")))
    }
}
