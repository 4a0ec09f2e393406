use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::info;

use crate::config::{MailBackend, MailConfig};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Missing SMTP setting: {0}")]
    MissingSetting(&'static str),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub fn verification_email(app_name: &str, to: &str, otp: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Verify Your Email - {app_name}"),
        text: format!(
            "Welcome to {app_name}!\n\nYour verification code is: {otp}\n\n\
             This code will expire in 10 minutes.\n\n\
             If you didn't create an account, please ignore this email.\n"
        ),
        html: format!(
            "<h1>Verify Your Email</h1>\
             <p>Welcome to {app_name}! Use the code below to complete your registration.</p>\
             <p style=\"font-size:32px;font-weight:800;letter-spacing:8px\">{otp}</p>\
             <p>This code will expire in 10 minutes. Never share it with anyone.</p>"
        ),
    }
}

pub fn welcome_email(app_name: &str, to: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Welcome to {app_name}!"),
        text: format!(
            "Your email has been verified. You're all set to start preparing with {app_name}.\n"
        ),
        html: format!(
            "<h1>Welcome!</h1><p>Your email has been verified. \
             You're all set to start preparing with {app_name}.</p>"
        ),
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let user = config
            .smtp_user
            .clone()
            .ok_or(MailError::MissingSetting("SMTP_USER"))?;
        let password = config
            .smtp_password
            .clone()
            .ok_or(MailError::MissingSetting("SMTP_PASSWORD"))?;

        let from = format!("{} <{}>", config.app_name, user)
            .parse::<Mailbox>()
            .map_err(|e| MailError::InvalidAddress(e.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(user, password))
            .build();

        Ok(SmtpMailer { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| MailError::InvalidAddress(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        info!(to = %email.to, "email sent");
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them. Used in development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, body = %email.text, "email not delivered (log backend)");
        Ok(())
    }
}

pub fn mailer_from_config(config: &MailConfig) -> Result<Box<dyn Mailer>, MailError> {
    match config.backend {
        MailBackend::Log => Ok(Box::new(LogMailer)),
        MailBackend::Smtp => Ok(Box::new(SmtpMailer::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_contains_code() {
        let email = verification_email("InterviewPrep Live", "kim@example.com", "654321");
        assert_eq!(email.to, "kim@example.com");
        assert!(email.subject.contains("Verify"));
        assert!(email.text.contains("654321"));
        assert!(email.html.contains("654321"));
    }

    #[tokio::test]
    async fn smtp_backend_requires_credentials() {
        let config = MailConfig {
            backend: MailBackend::Smtp,
            app_name: "InterviewPrep Live".to_string(),
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
        };
        assert!(matches!(
            mailer_from_config(&config),
            Err(MailError::MissingSetting("SMTP_USER"))
        ));
    }
}
