//! SMTP delivery through lettre's async relay transport.
//!
//! Every delivery opens a connection, authenticates with LOGIN when
//! credentials are configured, upgrades with STARTTLS, sends one message and
//! closes. Retries belong to [`RetryingSender`](crate::resilience::RetryingSender).

use lettre::address::AddressError;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailerConfig;
use crate::mailer::Envelope;
use crate::resilience::Transport;

#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
    #[error("invalid mailbox: {0}")]
    Address(#[from] AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A relay connection template built from [`MailerConfig`].
pub struct SmtpTransport {
    relay: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Configure the relay. Nothing is dialed until the first delivery.
    pub fn from_config(config: &MailerConfig) -> Result<Self, SmtpError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .timeout(Some(config.timeout()));

        if !config.username.is_empty() {
            builder = builder
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .authentication(vec![Mechanism::Login]);
        }

        tracing::info!(
            host = %config.host,
            port = config.port,
            timeout = ?config.timeout(),
            "SMTP relay configured"
        );

        Ok(Self {
            relay: builder.build(),
        })
    }
}

/// Render `envelope` addressed to `to`.
///
/// A message with an HTML body goes out as `multipart/alternative` with the
/// plain text first.
pub fn build_message(envelope: &Envelope, to: &str) -> Result<Message, SmtpError> {
    let builder = Message::builder()
        .from(envelope.from.parse::<Mailbox>()?)
        .to(to.parse::<Mailbox>()?)
        .subject(envelope.subject.as_str());

    let message = match &envelope.html_body {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            envelope.plain_body.clone(),
            html.clone(),
        ))?,
        None => builder.singlepart(SinglePart::plain(envelope.plain_body.clone()))?,
    };

    Ok(message)
}

impl Transport for SmtpTransport {
    type Payload = Envelope;
    type Error = SmtpError;

    async fn deliver(&self, target: &str, envelope: &Envelope) -> Result<(), SmtpError> {
        let message = build_message(envelope, target)?;
        self.relay.send(message).await?;
        Ok(())
    }
}
