//! Outbound email contract
//!
//! Delivery is an external collaborator. The contract is deliberately
//! forgiving: [`Mailer::send`] reports success as a boolean and never fails
//! the calling operation. A login code is considered "requested" even when
//! the email bounces; the caller logs and moves on.

use async_trait::async_trait;
use parking_lot::Mutex;

/// Outbound email dispatcher
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a message; returns whether it was handed off for delivery
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: Option<&str>,
        text_body: Option<&str>,
    ) -> bool;
}

/// Mailer that drops everything; for installs without outbound email
#[derive(Debug, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, _to: &str, _subject: &str, _html: Option<&str>, _text: Option<&str>) -> bool {
        false
    }
}

/// A message captured by [`RecordingMailer`]
#[derive(Debug, Clone)]
pub struct SentEmail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body, if any
    pub html_body: Option<String>,
    /// Plain-text body, if any
    pub text_body: Option<String>,
}

/// Mailer that records messages instead of sending them; used by tests to
/// read back generated one-time codes and reset tokens
#[derive(Debug, Default)]
pub struct RecordingMailer {
    pub(crate) sent: Mutex<Vec<SentEmail>>,
    /// When set, `send` reports delivery failure (while still recording)
    pub fail_delivery: bool,
}

impl RecordingMailer {
    /// Create a recording mailer that reports successful delivery
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().clone()
    }

    /// The most recent message, if any
    pub fn last(&self) -> Option<SentEmail> {
        self.sent.lock().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: Option<&str>,
        text_body: Option<&str>,
    ) -> bool {
        self.sent.lock().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.map(str::to_string),
            text_body: text_body.map(str::to_string),
        });
        !self.fail_delivery
    }
}
