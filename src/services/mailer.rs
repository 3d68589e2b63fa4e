// src/services/mailer.rs

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
#[error("failed to deliver mail to {to}: {reason}")]
pub struct MailError {
    pub to: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum MailerSetupError {
    #[error("invalid sender address: {0}")]
    Sender(#[from] lettre::address::AddressError),
    #[error("invalid SMTP relay: {0}")]
    Relay(#[from] lettre::transport::smtp::Error),
}

/// Delivers sign-up OTPs.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to: &str, otp: &str) -> Result<(), MailError>;
}

fn otp_body(otp: &str, ttl_minutes: u64) -> String {
    format!("Your OTP is: {}. It expires in {} minutes.", otp, ttl_minutes)
}

/// Sends OTPs through an authenticated SMTP relay (STARTTLS).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    ttl_minutes: u64,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, ttl_minutes: u64) -> Result<Self, MailerSetupError> {
        let from: Mailbox = config.from.parse()?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .credentials(Credentials::new(config.username.clone(), config.password.clone()));
        if let Some(port) = config.port {
            builder = builder.port(port);
        }

        Ok(Self {
            transport: builder.build(),
            from,
            ttl_minutes,
        })
    }

    fn message(&self, to: &str, otp: &str) -> Result<Message, MailError> {
        let fail = |reason: String| MailError { to: to.to_string(), reason };

        let recipient: Mailbox = to.parse().map_err(|e| fail(format!("invalid address: {}", e)))?;
        Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject("QMaster Signup OTP")
            .header(ContentType::TEXT_PLAIN)
            .body(otp_body(otp, self.ttl_minutes))
            .map_err(|e| fail(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, to: &str, otp: &str) -> Result<(), MailError> {
        let message = self.message(to, otp)?;
        self.transport.send(message).await.map_err(|e| MailError {
            to: to.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(recipient = %to, "Registration OTP mailed");
        Ok(())
    }
}

/// Fallback when no SMTP relay is configured: records that an OTP was issued.
/// The code itself only reaches the log when `reveal` is set (development).
pub struct LogMailer {
    reveal: bool,
}

impl LogMailer {
    pub fn new(reveal: bool) -> Self {
        Self { reveal }
    }

    fn shown<'a>(&self, otp: &'a str) -> &'a str {
        if self.reveal { otp } else { "******" }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, to: &str, otp: &str) -> Result<(), MailError> {
        tracing::info!(recipient = %to, "QMaster registration OTP: {}", self.shown(otp));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: Some(587),
            username: "qmaster@example.com".to_string(),
            password: "secret".to_string(),
            from: "QMaster <qmaster@example.com>".to_string(),
        }
    }

    #[test]
    fn log_mailer_redacts_codes_by_default() {
        assert_eq!(LogMailer::new(false).shown("123456"), "******");
        assert_eq!(LogMailer::new(true).shown("123456"), "123456");
    }

    #[test]
    fn smtp_mailer_rejects_bad_sender() {
        let config = SmtpConfig { from: "not an address".to_string(), ..smtp_config() };
        assert!(matches!(SmtpMailer::new(&config, 10), Err(MailerSetupError::Sender(_))));
    }

    #[tokio::test]
    async fn smtp_mailer_builds_the_otp_message() {
        let mailer = SmtpMailer::new(&smtp_config(), 10).unwrap();

        let message = mailer.message("student@example.com", "654321").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: QMaster Signup OTP"));
        assert!(raw.contains("Your OTP is: 654321. It expires in 10 minutes."));

        let err = mailer.send_otp("not-an-email", "654321").await.unwrap_err();
        assert_eq!(err.to, "not-an-email");
    }
}
