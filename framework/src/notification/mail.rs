//! Outgoing mail
//!
//! `MAIL_DRIVER=smtp` sends through lettre; anything else logs the message.
//! Bind a different `Mailer` in the container to replace either.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use crate::config::{env, env_optional, Config};
use crate::container::App;
use crate::error::FrameworkError;

/// Mail configuration
///
/// # Environment Variables
///
/// - `MAIL_DRIVER` - `smtp` or `log` (default: log)
/// - `MAIL_HOST` / `MAIL_PORT` - SMTP server (default: localhost:587)
/// - `MAIL_USERNAME` / `MAIL_PASSWORD` - optional credentials
/// - `MAIL_ENCRYPTION` - `starttls`, `tls` or `none` (default: starttls)
/// - `MAIL_FROM_ADDRESS` / `MAIL_FROM_NAME` - sender
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub encryption: String,
    pub from_address: String,
    pub from_name: String,
}

impl MailConfig {
    pub fn from_env() -> Self {
        Self {
            driver: env("MAIL_DRIVER", "log".to_string()),
            host: env("MAIL_HOST", "localhost".to_string()),
            port: env("MAIL_PORT", 587u16),
            username: env_optional("MAIL_USERNAME"),
            password: env_optional("MAIL_PASSWORD"),
            encryption: env("MAIL_ENCRYPTION", "starttls".to_string()),
            from_address: env("MAIL_FROM_ADDRESS", "no-reply@campus.test".to_string()),
            from_name: env("MAIL_FROM_NAME", "Campus".to_string()),
        }
    }

    pub fn uses_smtp(&self) -> bool {
        self.driver.eq_ignore_ascii_case("smtp")
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// A plain-text message to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            to_name: None,
            subject: subject.into(),
            body: String::new(),
        }
    }

    pub fn to_name(mut self, name: impl Into<String>) -> Self {
        self.to_name = Some(name.into());
        self
    }

    /// Append a paragraph to the body
    pub fn line(mut self, text: impl AsRef<str>) -> Self {
        if !self.body.is_empty() {
            self.body.push_str("\n\n");
        }
        self.body.push_str(text.as_ref());
        self
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), FrameworkError>;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, FrameworkError> {
        let mut builder = match config.encryption.as_str() {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| FrameworkError::internal(format!("SMTP relay: {}", e)))?,
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| FrameworkError::internal(format!("SMTP STARTTLS: {}", e)))?,
        }
        .port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = format!("{} <{}>", config.from_name, config.from_address)
            .parse::<Mailbox>()
            .map_err(|e| FrameworkError::internal(format!("invalid MAIL_FROM_ADDRESS: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), FrameworkError> {
        let to = match &message.to_name {
            Some(name) => format!("{} <{}>", name, message.to),
            None => message.to.clone(),
        };
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| FrameworkError::internal(format!("invalid recipient: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| FrameworkError::internal(format!("failed to build email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| FrameworkError::internal(format!("failed to send email: {}", e)))?;
        Ok(())
    }
}

/// Writes messages to the log instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), FrameworkError> {
        tracing::info!(to = %message.to, subject = %message.subject, "mail (log driver)");
        tracing::debug!(body = %message.body);
        Ok(())
    }
}

/// The bound mailer, or one built from `MailConfig`
pub fn mailer() -> Result<Arc<dyn Mailer>, FrameworkError> {
    if let Some(bound) = App::make::<dyn Mailer>() {
        return Ok(bound);
    }
    let config = Config::get::<MailConfig>().unwrap_or_else(MailConfig::from_env);
    if config.uses_smtp() {
        Ok(Arc::new(SmtpMailer::from_config(&config)?))
    } else {
        Ok(Arc::new(LogMailer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp(encryption: &str) -> MailConfig {
        MailConfig {
            driver: "smtp".to_string(),
            host: "mail.invalid".to_string(),
            port: 2525,
            username: Some("campus".to_string()),
            password: Some("secret".to_string()),
            encryption: encryption.to_string(),
            from_address: "office@hillside.test".to_string(),
            from_name: "Hillside Office".to_string(),
        }
    }

    #[test]
    fn builds_transport_lazily_for_each_encryption() {
        for mode in ["starttls", "tls", "none"] {
            assert!(SmtpMailer::from_config(&smtp(mode)).is_ok(), "{}", mode);
        }
    }

    #[test]
    fn rejects_bad_sender() {
        let mut config = smtp("none");
        config.from_address = "not an address".to_string();
        assert!(SmtpMailer::from_config(&config).is_err());
    }

    #[test]
    fn message_lines_become_paragraphs() {
        let message = MailMessage::new("amy@hillside.test", "Payslip")
            .line("Your salary was paid.")
            .line("Reference: TX-1");
        assert_eq!(message.body, "Your salary was paid.\n\nReference: TX-1");
    }
}
