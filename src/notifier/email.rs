// notifier/email.rs

use crate::config::AlertConfig;
use crate::model::{CanonicalProduct, NotifyError};
use crate::notifier::{low_stock_message, Notifier};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Serialize)]
struct RelayAttachment<'a> {
    filename: &'a str,
    content: String,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<RelayAttachment<'a>>,
}

/// Sends mail through an HTTP relay that accepts one JSON message per POST.
pub struct EmailRelay {
    endpoint: String,
    api_key: String,
    sender: String,
    recipients: Vec<String>,
    alert_subject: String,
    client: Client,
}

impl EmailRelay {
    pub fn new(cfg: &AlertConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::ApiError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            sender: cfg.sender.clone(),
            recipients: cfg.recipients.clone(),
            alert_subject: cfg.subject.clone(),
            client,
        })
    }

    /// Sends one mail to a single address.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<&Attachment>,
    ) -> Result<(), NotifyError> {
        self.deliver(&[to.to_string()], subject, body, attachment).await
    }

    /// Mails a purchase order to a factory, with the order sheet attached.
    pub async fn send_purchase_order(
        &self,
        to: &str,
        factory_name: &str,
        body: &str,
        order_sheet: Option<&Attachment>,
    ) -> Result<(), NotifyError> {
        self.send(to, &purchase_order_subject(factory_name), body, order_sheet)
            .await
    }

    async fn deliver(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
        attachment: Option<&Attachment>,
    ) -> Result<(), NotifyError> {
        let message = RelayMessage {
            from: &self.sender,
            to,
            subject,
            text: body,
            attachments: attachment
                .map(|a| RelayAttachment {
                    filename: &a.filename,
                    content: STANDARD.encode(&a.content),
                })
                .into_iter()
                .collect(),
        };
        info!("📤 Sending mail '{}' to {:?}", subject, to);

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send();
        let response = match timeout(Duration::from_secs(10), request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                warn!("❌ Mail relay send() failed: {:?}", e);
                return Err(NotifyError::ApiError(format!("Send failed: {}", e)));
            }
            Err(_) => {
                warn!("⏳ Mail relay send() timed out");
                return Err(NotifyError::Unreachable);
            }
        };
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "unknown".into());
        if !status.is_success() {
            warn!("❌ Mail relay responded [{}]: {}", status, body);
            return Err(NotifyError::ApiError(format!("relay status {}", status)));
        }
        info!("✅ Mail relay response [{}]", status);
        Ok(())
    }
}

pub fn purchase_order_subject(factory_name: &str) -> String {
    format!("[Purchase order] {} order sheet", factory_name.trim())
}

#[async_trait::async_trait]
impl Notifier for EmailRelay {
    async fn notify_low_stock(&self, items: &[CanonicalProduct]) -> Result<(), NotifyError> {
        if self.recipients.is_empty() {
            return Err(NotifyError::ApiError("no alert recipients configured".into()));
        }
        self.deliver(&self.recipients, &self.alert_subject, &low_stock_message(items), None)
            .await
    }
}
