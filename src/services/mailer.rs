use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::{MailConfig, MailProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
    /// Plain link included for senders that cannot render HTML.
    pub action_url: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail sending is disabled")]
    Disabled,
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[axum::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Writes every message to the log. Default sender for local runs.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from_name: String,
}

impl LogMailer {
    pub fn new(from_name: &str) -> Self {
        Self {
            from_name: from_name.to_string(),
        }
    }
}

#[axum::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from_name,
            to = %message.to,
            subject = %message.subject,
            link = %message.action_url,
            "Outgoing email"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DisabledMailer;

#[axum::async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, _message: EmailMessage) -> Result<(), MailError> {
        Err(MailError::Disabled)
    }
}

/// Keeps sent messages in memory for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().await.clone()
    }
}

#[axum::async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.outbox.lock().await.push(message);
        Ok(())
    }
}

pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match config.provider {
        MailProvider::Log => Arc::new(LogMailer::new(&config.from_name)),
        MailProvider::None => Arc::new(DisabledMailer),
    }
}

pub fn verification_email(to: &str, to_name: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        to_name: to_name.to_string(),
        subject: "Confirm your email address".to_string(),
        html: format!(
            "<p>Hello {to_name},</p>\
             <p>Confirm your email address to start studying:</p>\
             <p><a href=\"{link}\">{link}</a></p>\
             <p>The link expires in 24 hours.</p>"
        ),
        action_url: link.to_string(),
    }
}
