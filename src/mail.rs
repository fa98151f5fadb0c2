//! Outbound email.
//!
//! All mail is best-effort and non-blocking: sends are spawned off the
//! request task, failures are logged and never retried, and a failed send
//! never fails the HTTP response that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Seam for outbound delivery, so flows can be tested against a capturing
/// mock instead of a live relay.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.relay)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from: config.from.parse()?,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Captures sent mail for assertions. Exported (not test-gated) so
/// integration tests can wire it into a real router.
#[derive(Debug, Clone, Default)]
pub struct MockEmailSender {
    pub sent: Arc<std::sync::Mutex<Vec<SentEmail>>>,
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
impl EmailSender for MockEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Domain-level mail dispatch. Every method returns immediately; the actual
/// send happens on a spawned task.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
    contact_inbox: String,
}

impl Notifier {
    pub fn new(sender: Arc<dyn EmailSender>, contact_inbox: impl Into<String>) -> Self {
        Self {
            sender,
            contact_inbox: contact_inbox.into(),
        }
    }

    pub fn send_otp(&self, to: &str, otp: i32) {
        self.dispatch(
            to.to_string(),
            "Your OTP Code".to_string(),
            format!("Your OTP code is {}. It is valid for 5 minutes.", otp),
        );
    }

    pub fn send_approval(&self, to: &str) {
        self.dispatch(
            to.to_string(),
            "Registration Approved".to_string(),
            "Your registration has been approved. Welcome aboard!".to_string(),
        );
    }

    pub fn send_notification(&self, to: &str, title: &str, desc: &str) {
        self.dispatch(to.to_string(), title.to_string(), desc.to_string());
    }

    pub fn send_contact(&self, name: &str, email: &str, number: &str, message: &str) {
        self.dispatch(
            self.contact_inbox.clone(),
            format!("Contact Us Form Submission from {}", name),
            format!(
                "Name: {}\nEmail: {}\nPhone Number: {}\n\nMessage:\n{}",
                name, email, number, message
            ),
        );
    }

    fn dispatch(&self, to: String, subject: String, body: String) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if let Err(e) = sender.send(&to, &subject, &body).await {
                error!("failed to send email '{}' to {}: {}", subject, to, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Sends are spawned; poll until the mock has captured `count` of them.
    async fn wait_for_sent(mock: &MockEmailSender, count: usize) {
        for _ in 0..100 {
            if mock.sent.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} sent emails, got {}", count, mock.sent.lock().unwrap().len());
    }

    #[tokio::test]
    async fn notifier_formats_otp_mail() {
        let mock = MockEmailSender::default();
        let notifier = Notifier::new(Arc::new(mock.clone()), "inbox@volunflow.com");

        notifier.send_otp("a@b.com", 4821);
        wait_for_sent(&mock, 1).await;

        let sent = mock.sent.lock().unwrap();
        assert_eq!(sent[0].to, "a@b.com");
        assert_eq!(sent[0].subject, "Your OTP Code");
        assert!(sent[0].body.contains("4821"));
    }

    #[tokio::test]
    async fn contact_mail_goes_to_the_configured_inbox() {
        let mock = MockEmailSender::default();
        let notifier = Notifier::new(Arc::new(mock.clone()), "inbox@volunflow.com");

        notifier.send_contact("Pat", "pat@example.com", "555-0100", "Hello there");
        wait_for_sent(&mock, 1).await;

        let sent = mock.sent.lock().unwrap();
        assert_eq!(sent[0].to, "inbox@volunflow.com");
        assert!(sent[0].subject.contains("Pat"));
        assert!(sent[0].body.contains("555-0100"));
    }

    #[tokio::test]
    async fn notification_mail_uses_title_as_subject() {
        let mock = MockEmailSender::default();
        let notifier = Notifier::new(Arc::new(mock.clone()), "inbox@volunflow.com");

        notifier.send_notification("vol@example.com", "Shift moved", "Now starts at 9am");
        wait_for_sent(&mock, 1).await;

        let sent = mock.sent.lock().unwrap();
        assert_eq!(sent[0].subject, "Shift moved");
        assert_eq!(sent[0].body, "Now starts at 9am");
    }
}
