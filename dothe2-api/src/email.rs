//! Email delivery via SMTP
//!
//! [`SmtpSender`] wraps the `lettre` async SMTP transport and implements the
//! shared [`NotificationSender`]. When `SMTP_HOST` is not set,
//! [`EmailConfig::from_lookup`] returns `None` and the server falls back to
//! the log-only notifier.

use async_trait::async_trait;
use dothe2_shared::notify::{Notification, NotificationSender, NotifyError};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport failure (authentication, connection, etc.)
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// Recipient or sender address could not be parsed
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled
    #[error("Email build error: {0}")]
    Build(String),
}

impl From<EmailError> for NotifyError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::Address(e) => NotifyError::Address(e.to_string()),
            other => NotifyError::Delivery(other.to_string()),
        }
    }
}

/// Default SMTP port (STARTTLS)
const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "Dothe2 <noreply@dothe2.local>";

/// SMTP settings
///
/// | Variable        | Required | Default                          |
/// |-----------------|----------|----------------------------------|
/// | `SMTP_HOST`     | yes      |                                  |
/// | `SMTP_PORT`     | no       | `587`                            |
/// | `SMTP_FROM`     | no       | `Dothe2 <noreply@dothe2.local>`  |
/// | `SMTP_USER`     | no       |                                  |
/// | `SMTP_PASSWORD` | no       |                                  |
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" mailbox
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Reads the SMTP variables, `None` when `SMTP_HOST` is unset
    pub fn from_lookup<F>(lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let smtp_host = lookup("SMTP_HOST").filter(|host| !host.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: lookup("SMTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: lookup("SMTP_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: lookup("SMTP_USER"),
            smtp_password: lookup("SMTP_PASSWORD"),
        })
    }
}

/// Sends notifications as multipart (text + HTML) email
pub struct SmtpSender {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpSender {
    /// Builds the transport; no connection is made until the first send
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let from: Mailbox = config.from_address.parse()?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from,
            mailer: transport_builder.build(),
        })
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), EmailError> {
        let email = build_message(self.from.clone(), notification)?;
        self.mailer.send(email).await?;

        tracing::info!(to = %notification.recipient, subject = %notification.subject, "Email sent");
        Ok(())
    }
}

fn build_message(from: Mailbox, notification: &Notification) -> Result<Message, EmailError> {
    Message::builder()
        .from(from)
        .to(notification.recipient.parse()?)
        .subject(notification.subject.clone())
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(notification.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(notification.html.clone()),
                ),
        )
        .map_err(|e| EmailError::Build(e.to_string()))
}

#[async_trait]
impl NotificationSender for SmtpSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.deliver(notification).await.map_err(NotifyError::from)
    }
}
