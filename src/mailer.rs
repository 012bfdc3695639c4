use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ApiError;

/// A plain-text message handed to the delivery backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer
///
/// Delivery backend for transactional mail. Sending is fire-and-report: callers decide
/// whether a failure matters to the request.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), ApiError>;
}

pub type MailerState = Arc<dyn Mailer>;

/// Records every message through `tracing` instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), ApiError> {
        tracing::info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "outgoing mail handed off"
        );
        tracing::debug!(body = %mail.body, "outgoing mail body");
        Ok(())
    }
}

/// Keeps sent messages in memory. Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), ApiError> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mail);
        Ok(())
    }
}

/// Body of the password-reset message.
pub fn password_reset_mail(from: &str, to: &str, frontend_url: &str, token: &str) -> OutgoingMail {
    let link = format!(
        "{}/reset-password?token={}",
        frontend_url.trim_end_matches('/'),
        token
    );
    OutgoingMail {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Password Reset Request".to_string(),
        body: format!(
            "You requested a password reset.\n\n\
             Open the link below to choose a new password. It expires in one hour.\n\n\
             {link}\n\n\
             If you did not request this, you can ignore this email."
        ),
    }
}

/// Greeting sent to a newly created account.
pub fn welcome_mail(from: &str, to: &str, full_name: &str) -> OutgoingMail {
    OutgoingMail {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Welcome to Morphe Labs CMS".to_string(),
        body: format!(
            "Hello {full_name},\n\n\
             Your account has been created successfully. \
             You can now log in to the admin panel with this email address."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_mail_carries_link() {
        let mail = password_reset_mail(
            "noreply@morphelabs.com",
            "a@b.c",
            "http://localhost:3000/",
            "abc123",
        );
        assert_eq!(mail.to, "a@b.c");
        assert!(
            mail.body
                .contains("http://localhost:3000/reset-password?token=abc123")
        );
    }

    #[test]
    fn welcome_mail_greets_by_name() {
        let mail = welcome_mail("noreply@morphelabs.com", "jane@morphelabs.com", "Jane Doe");
        assert_eq!(mail.subject, "Welcome to Morphe Labs CMS");
        assert!(mail.body.starts_with("Hello Jane Doe,"));
    }

    #[tokio::test]
    async fn memory_mailer_shares_outbox_between_clones() {
        let mailer = MemoryMailer::new();
        let handle = mailer.clone();
        mailer
            .send(password_reset_mail("f", "t", "http://x", "tok"))
            .await
            .unwrap();
        assert_eq!(handle.sent().len(), 1);
    }
}
