//! SendGrid v3 transactional email.

use super::{Notifier, NotifyOutcome};
use crate::error::NotificationError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_SUBJECT: &str = "Error — data load";
const DEFAULT_ENDPOINT: &str = "https://api.sendgrid.com";

/// Addresses, credentials and transport settings for failure emails.
#[derive(Clone)]
pub struct EmailSettings {
    pub api_key: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            from: None,
            to: None,
            subject: DEFAULT_SUBJECT.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Emails the operator through the SendGrid mail-send API.
pub struct SendGridNotifier {
    client: Client,
    settings: EmailSettings,
}

impl SendGridNotifier {
    pub fn new(settings: EmailSettings) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| NotificationError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    /// Send one message. The only fallible path; [`Notifier::notify`] wraps it.
    pub async fn send(&self, message: &str) -> Result<u16, NotificationError> {
        let api_key = present(&self.settings.api_key).ok_or(NotificationError::MissingConfig("API key"))?;
        let to = present(&self.settings.to).ok_or(NotificationError::MissingConfig("recipient address"))?;
        let from = present(&self.settings.from).ok_or(NotificationError::MissingConfig("sender address"))?;

        let payload = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": from },
            "subject": self.settings.subject,
            "content": [{
                "type": "text/html",
                "value": format!("<strong>Error:</strong> {}", message),
            }],
        });
        let url = format!("{}/v3/mail/send", self.settings.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
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
        Ok(status.as_u16())
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn notify(&self, message: &str) -> NotifyOutcome {
        match self.send(message).await {
            Ok(status) => {
                tracing::info!(status, "Notification email sent");
                NotifyOutcome::Sent { status }
            }
            Err(e @ NotificationError::MissingConfig(_)) => {
                tracing::error!(error = %e, "Notification email skipped");
                NotifyOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send notification email");
                NotifyOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
