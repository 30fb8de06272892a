//! Operator notification side-channel.
//!
//! Notification is best-effort: [`Notifier::notify`] has no error channel, so a
//! broken mail transport can never mask the failure being reported or abort
//! the caller.

mod sendgrid;

pub use sendgrid::{EmailSettings, SendGridNotifier, DEFAULT_SUBJECT};

use async_trait::async_trait;
use serde::Serialize;

/// What happened to one notification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotifyOutcome {
    /// Accepted by the delivery API.
    Sent { status: u16 },
    /// Not attempted because configuration is incomplete.
    Skipped { reason: String },
    /// Attempted and failed; logged and swallowed.
    Failed { error: String },
}

/// Sends a failure report to the operator. Never fails.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> NotifyOutcome;
}

/// Collects messages in memory instead of sending them.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: tokio::sync::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> NotifyOutcome {
        self.messages.lock().await.push(message.to_string());
        NotifyOutcome::Sent { status: 202 }
    }
}
