//! Owner notifications
//!
//! When an admin deletes a movie its owner gets a plain-text email naming
//! the movie and the admin. Sending goes through the [`Notifier`] trait so
//! the write pipeline does not depend on SMTP directly.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::SmtpConfig;

/// Subject line of the deletion notice
pub const DELETION_SUBJECT: &str = "Your movie has been deleted";

/// Email service errors
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP transport error: {0}")]
    SmtpError(String),

    #[error("Failed to build email: {0}")]
    BuildError(String),

    #[error("Email service not configured")]
    NotConfigured,
}

/// Everything needed to tell an owner their movie was removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionNotice {
    /// Owner's email address
    pub to: String,
    pub movie_title: String,
    pub admin_name: String,
    pub admin_email: String,
}

impl DeletionNotice {
    /// Plain-text body of the notice
    pub fn body(&self, signature: &str) -> String {
        format!(
            "Hello,\n\nYour movie \"{}\" has been deleted by Admin {} ({}).\n\nRegards,\n{}",
            self.movie_title, self.admin_name, self.admin_email, signature
        )
    }
}

/// Delivers owner notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn movie_deleted(&self, notice: &DeletionNotice) -> Result<(), EmailError>;
}

/// SMTP backed [`Notifier`]
#[derive(Clone)]
pub struct EmailService {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailService {
    /// Create a new email service
    ///
    /// The transport connects lazily, so this only fails on a malformed host.
    pub fn new(config: SmtpConfig) -> Result<Self, EmailError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| EmailError::SmtpError(e.to_string()))?
            .credentials(creds)
            .port(config.port)
            .build();

        Ok(Self { config, transport })
    }

    /// Create the service when SMTP settings are present
    pub fn from_config(config: Option<SmtpConfig>) -> Result<Self, EmailError> {
        config.ok_or(EmailError::NotConfigured).and_then(Self::new)
    }

    fn build_message(&self, to: &str, subject: &str, body: String) -> Result<Message, EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        Message::builder()
            .from(from.parse().map_err(|e| EmailError::BuildError(format!("{}", e)))?)
            .to(to.parse().map_err(|e| EmailError::BuildError(format!("{}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::BuildError(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn movie_deleted(&self, notice: &DeletionNotice) -> Result<(), EmailError> {
        let body = notice.body(&self.config.from_name);
        let email = self.build_message(&notice.to, DELETION_SUBJECT, body)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| EmailError::SmtpError(e.to_string()))?;

        tracing::info!("Deletion notice sent to {}", notice.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from_email: "noreply@example.com".to_string(),
            from_name: "MovieStream Team".to_string(),
        }
    }

    fn notice() -> DeletionNotice {
        DeletionNotice {
            to: "owner@example.com".to_string(),
            movie_title: "Heat".to_string(),
            admin_name: "root".to_string(),
            admin_email: "root@example.com".to_string(),
        }
    }

    #[test]
    fn test_email_error_display() {
        let err = EmailError::NotConfigured;
        assert_eq!(err.to_string(), "Email service not configured");

        let err = EmailError::SmtpError("connection failed".to_string());
        assert_eq!(err.to_string(), "SMTP transport error: connection failed");
    }

    #[test]
    fn test_deletion_body_names_movie_and_admin() {
        assert_eq!(
            notice().body("MovieStream Team"),
            "Hello,\n\nYour movie \"Heat\" has been deleted by Admin root (root@example.com).\n\nRegards,\nMovieStream Team"
        );
    }

    #[test]
    fn test_from_config_without_smtp_is_not_configured() {
        assert!(matches!(
            EmailService::from_config(None),
            Err(EmailError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_from_config_with_smtp_builds_service() {
        assert!(EmailService::from_config(Some(smtp_config())).is_ok());
    }

    #[tokio::test]
    async fn test_build_message_rejects_bad_recipient() {
        let service = EmailService::new(smtp_config()).unwrap();
        let result = service.build_message("not an address", DELETION_SUBJECT, String::new());
        assert!(matches!(result, Err(EmailError::BuildError(_))));
    }

    #[tokio::test]
    async fn test_build_message_accepts_notice() {
        let service = EmailService::new(smtp_config()).unwrap();
        let notice = notice();
        let message = service
            .build_message(&notice.to, DELETION_SUBJECT, notice.body("MovieStream Team"))
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Your movie has been deleted"));
    }
}
