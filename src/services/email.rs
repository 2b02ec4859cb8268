//! Outgoing email
//!
//! Sends through SMTP when a host is configured; otherwise the message is
//! written to the log so local setups work without a mail server.

use crate::config::SmtpConfig;
use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Email service for account mails
pub struct EmailService {
    smtp: SmtpConfig,
    frontend_url: String,
}

impl EmailService {
    pub fn new(smtp: SmtpConfig, frontend_url: impl Into<String>) -> Self {
        Self {
            smtp,
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn is_smtp_configured(&self) -> bool {
        !self.smtp.host.is_empty()
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if !self.is_smtp_configured() {
            tracing::info!(to, subject, "SMTP not configured, email not sent:\n{}", body);
            return Ok(());
        }

        let email = Message::builder()
            .from(
                self.smtp
                    .from
                    .parse()
                    .map_err(|e| anyhow!("Invalid from address: {}", e))?,
            )
            .to(to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp.host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.smtp.port);
        if !self.smtp.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.smtp.username.clone(),
                self.smtp.password.clone(),
            ));
        }
        let mailer = builder.build();

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        tracing::debug!(to, subject, "Email sent");
        Ok(())
    }

    pub async fn send_verification(&self, to: &str, username: &str, token: &str) -> Result<()> {
        let (subject, body) = self.verification_message(username, token);
        self.send(to, &subject, &body).await
    }

    pub async fn send_password_reset(&self, to: &str, username: &str, token: &str) -> Result<()> {
        let (subject, body) = self.password_reset_message(username, token);
        self.send(to, &subject, &body).await
    }

    fn verification_message(&self, username: &str, token: &str) -> (String, String) {
        let link = format!(
            "{}/verify-email?token={}",
            self.frontend_url,
            urlencoding::encode(token)
        );
        let body = format!(
            "Hi {},\n\nConfirm your email address by opening the link below:\n\n{}\n\n\
             The link is valid for 24 hours. If you did not create an account, ignore this email.\n",
            username, link
        );
        ("Verify your DevNest email".to_string(), body)
    }

    fn password_reset_message(&self, username: &str, token: &str) -> (String, String) {
        let link = format!(
            "{}/reset-password?token={}",
            self.frontend_url,
            urlencoding::encode(token)
        );
        let body = format!(
            "Hi {},\n\nSomeone asked to reset your DevNest password. Open the link below to choose a new one:\n\n{}\n\n\
             The link is valid for 1 hour and can be used once. If this wasn't you, ignore this email.\n",
            username, link
        );
        ("Reset your DevNest password".to_string(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> EmailService {
        EmailService::new(SmtpConfig::default(), "http://localhost:3000/")
    }

    #[test]
    fn test_messages_link_to_frontend() {
        let service = service();

        let (subject, body) = service.verification_message("alice", "abc123");
        assert!(subject.contains("Verify"));
        assert!(body.contains("http://localhost:3000/verify-email?token=abc123"));
        assert!(body.contains("alice"));

        let (_, body) = service.password_reset_message("alice", "xyz");
        assert!(body.contains("http://localhost:3000/reset-password?token=xyz"));
    }

    #[tokio::test]
    async fn test_send_without_smtp_is_logged() {
        let service = service();
        assert!(!service.is_smtp_configured());
        service
            .send("alice@example.com", "Hello", "Body")
            .await
            .unwrap();
    }
}
