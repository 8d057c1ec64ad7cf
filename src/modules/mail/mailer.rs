use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail configuration: {0}")]
    Config(String),

    #[error("invalid address '{0}'")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let server = config
            .server
            .as_deref()
            .ok_or_else(|| MailError::Config("MAIL_SERVER is not set".to_string()))?;

        let sender = config
            .sender()
            .ok_or_else(|| {
                MailError::Config("MAIL_DEFAULT_SENDER or MAIL_USERNAME is required".to_string())
            })?
            .parse::<Mailbox>()
            .map_err(|_| MailError::Address(config.sender().unwrap_or_default().to_string()))?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
        };
        let mut builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|_| MailError::Address(email.to.clone()))?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))?;

        self.transport.send(message).await?;
        info!("Email sent to {}", email.to);
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        info!(
            "Mail delivery not configured; email to {} ({}):\n{}",
            email.to, email.subject, email.text_body
        );
        Ok(())
    }
}

/// SMTP when a server is configured, otherwise the logging mailer
pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    if config.server.is_none() {
        info!("MAIL_SERVER not set, confirmation emails will be logged");
        return Arc::new(LogMailer);
    }

    match SmtpMailer::new(config) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            warn!("SMTP mailer unavailable ({}), falling back to logging", e);
            Arc::new(LogMailer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config(server: Option<&str>, sender: Option<&str>) -> MailConfig {
        MailConfig {
            server: server.map(str::to_string),
            port: 587,
            use_tls: true,
            username: None,
            password: None,
            default_sender: sender.map(str::to_string),
        }
    }

    #[test]
    fn test_smtp_mailer_requires_sender() {
        let result = SmtpMailer::new(&mail_config(Some("smtp.gmail.com"), None));
        assert!(matches!(result, Err(MailError::Config(_))));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let mailer = mailer_from_config(&mail_config(None, None));
        let result = mailer
            .send(OutgoingEmail {
                to: "a@gmail.com".to_string(),
                subject: "Confirm".to_string(),
                text_body: "link".to_string(),
                html_body: "<a>link</a>".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }
}
