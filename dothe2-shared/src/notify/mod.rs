//! Outbound notifications
//!
//! The auth flow hands finished messages to a [`NotificationSender`]. The API
//! crate provides an SMTP implementation; [`LogNotifier`] only writes a log
//! line and is used when no mail server is configured.

pub mod messages;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// A rendered message for one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    /// Plain-text body
    pub text: String,
    /// HTML alternative
    pub html: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Recipient or sender address rejected
    #[error("invalid address: {0}")]
    Address(String),

    /// Transport failed to hand off the message
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers notifications
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sender that records the send in the log and nothing else
///
/// The body is never logged since it carries login secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "Email delivery not configured, notification dropped"
        );
        Ok(())
    }
}
