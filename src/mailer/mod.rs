//! Outbound email front.
//!
//! Message composition (templating) happens elsewhere; this module stamps the
//! sender and pushes the envelope through a [`RetryingSender`]. The shipped
//! transport is [`SmtpTransport`].

pub mod smtp;

pub use smtp::{SmtpError, SmtpTransport};

use serde::{Deserialize, Serialize};

use crate::config::MailerConfig;
use crate::resilience::{RetryPolicy, RetryingSender, Transport};

/// A fully composed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub plain_body: String,
    pub html_body: Option<String>,
}

impl Envelope {
    /// Start an envelope with an empty sender; [`Mailer`] fills it in.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, plain_body: impl Into<String>) -> Self {
        Self {
            from: String::new(),
            to: to.into(),
            subject: subject.into(),
            plain_body: plain_body.into(),
            html_body: None,
        }
    }

    pub fn with_html(mut self, html_body: impl Into<String>) -> Self {
        self.html_body = Some(html_body.into());
        self
    }
}

/// Mailer wired to the configured SMTP relay.
pub type SmtpMailer = Mailer<SmtpTransport>;

pub struct Mailer<T> {
    sender: String,
    delivery: RetryingSender<T>,
}

impl<T> Mailer<T>
where
    T: Transport<Payload = Envelope>,
{
    pub fn new(config: &MailerConfig, transport: T) -> Self {
        Self {
            sender: config.sender.clone(),
            delivery: RetryingSender::new(transport, RetryPolicy::from_config(config)),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Send `envelope` to its recipient.
    ///
    /// Errors are the transport's own, from the final attempt.
    pub async fn send(&self, mut envelope: Envelope) -> Result<(), T::Error> {
        envelope.from = self.sender.clone();
        let recipient = envelope.to.clone();
        self.delivery.send(&recipient, &envelope).await
    }
}

impl SmtpMailer {
    /// Build a mailer that delivers through the relay in `config`.
    pub fn from_config(config: &MailerConfig) -> Result<Self, SmtpError> {
        Ok(Self::new(config, SmtpTransport::from_config(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        delivered: Mutex<Vec<(String, Envelope)>>,
    }

    impl Transport for RecordingTransport {
        type Payload = Envelope;
        type Error = String;

        async fn deliver(&self, target: &str, payload: &Envelope) -> Result<(), String> {
            self.delivered
                .lock()
                .unwrap()
                .push((target.to_string(), payload.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn stamps_sender_and_targets_recipient() {
        let config = MailerConfig::default();
        let mailer = Mailer::new(&config, RecordingTransport::default());

        let envelope = Envelope::new("user@example.com", "Welcome", "Hi there")
            .with_html("<p>Hi there</p>");
        mailer.send(envelope).await.unwrap();

        let delivered = mailer.delivery.transport().delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        let (target, sent) = &delivered[0];
        assert_eq!(target, "user@example.com");
        assert_eq!(sent.from, config.sender);
        assert_eq!(sent.html_body.as_deref(), Some("<p>Hi there</p>"));
    }

    #[test]
    fn smtp_mailer_builds_from_default_config() {
        let mailer = SmtpMailer::from_config(&MailerConfig::default()).unwrap();
        assert_eq!(mailer.sender(), MailerConfig::default().sender);
        assert_eq!(mailer.delivery.policy().max_attempts, 3);
    }

    #[test]
    fn envelope_serializes_to_json() {
        let envelope = Envelope::new("a@example.com", "s", "b");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["to"], "a@example.com");
        assert!(json["html_body"].is_null());
    }
}
