/// Email service for password reset mail
use crate::config::EmailSettings;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to configure SMTP transport: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("failed to build email message: {0}")]
    Build(#[from] lettre::error::Error),
}

/// Async email transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl EmailService {
    /// Build the mailer from configuration
    ///
    /// An empty SMTP host selects no-op mode: mail is logged, not sent.
    pub fn new(config: &EmailSettings) -> Result<Self, MailError> {
        let from = config.smtp_from.parse::<Mailbox>()?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            }
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send the password reset link
    pub async fn send_password_reset_email(
        &self,
        recipient: &str,
        reset_url: &str,
    ) -> Result<(), MailError> {
        let subject = "Password reset token";
        let body = format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password.\n\n\
            Please open the following link to choose a new password:\n{}\n\n\
            The link expires in 10 minutes. If you did not request this, please ignore this email.",
            reset_url
        );
        self.send_mail(recipient, subject, &body).await
    }

    async fn send_mail(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let Some(transport) = &self.transport else {
            info!(
                subject,
                recipient, "Email service running in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient.parse::<Mailbox>()?)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        transport.send(email).await?;
        info!(subject, "email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_mode_when_host_empty() {
        let settings = EmailSettings::default();
        let service = EmailService::new(&settings).unwrap();
        assert!(!service.is_enabled());
        service
            .send_password_reset_email("someone@example.com", "http://localhost/reset-password/abc")
            .await
            .unwrap();
    }

    #[test]
    fn test_invalid_from_address_rejected() {
        let settings = EmailSettings {
            smtp_from: "not an address".to_string(),
            ..EmailSettings::default()
        };
        assert!(matches!(
            EmailService::new(&settings),
            Err(MailError::Address(_))
        ));
    }
}
