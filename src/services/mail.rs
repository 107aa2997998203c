//! Outbound email behind a `Mailer` trait so workflows can be exercised
//! without an SMTP relay.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::Smtp;

pub type MailResult<T> = std::result::Result<T, MailError>;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("smtp error: {0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),
    #[error("message build error: {0}")]
    MessageError(#[from] lettre::error::Error),
    #[error("invalid address: {0}")]
    AddressError(#[from] lettre::address::AddressError),
    #[error("invalid attachment content type: {0}")]
    ContentTypeError(#[from] lettre::message::header::ContentTypeErr),
}

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment: Option<EmailAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> MailResult<()>;
}

/// Backoff between delivery attempts: 1s, 2s, then capped at 5s.
const RETRY_BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(5),
];

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(smtp: &Smtp) -> MailResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp.relay())?
            .credentials(Credentials::new(
                smtp.username().to_string(),
                smtp.password().to_string(),
            ))
            .build();
        let from: Mailbox = smtp.from().parse()?;
        Ok(Self { transport, from })
    }

    fn build_message(&self, email: &OutgoingEmail) -> MailResult<Message> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(&email.subject);

        let html = SinglePart::html(email.html_body.clone());
        let message = match &email.attachment {
            Some(att) => {
                let content_type = ContentType::parse(&att.content_type)?;
                let part = Attachment::new(att.filename.clone())
                    .body(att.bytes.clone(), content_type);
                builder.multipart(MultiPart::mixed().singlepart(html).singlepart(part))?
            }
            None => builder.singlepart(html)?,
        };
        Ok(message)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    /// Retries transient failures up to three times with backoff;
    /// authentication and other permanent errors fail immediately.
    async fn send(&self, email: OutgoingEmail) -> MailResult<()> {
        let message = self.build_message(&email)?;

        let mut attempt = 0;
        loop {
            match self.transport.send(message.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_permanent() => return Err(e.into()),
                Err(e) => {
                    if attempt >= RETRY_BACKOFF.len() {
                        return Err(e.into());
                    }
                    tracing::warn!(
                        "mail send attempt {} to {} failed: {}, retrying",
                        attempt + 1,
                        email.to,
                        e
                    );
                    tokio::time::sleep(RETRY_BACKOFF[attempt]).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// In-memory mailer used by the integration tests to assert what would have
/// been sent.
#[derive(Default)]
pub struct MemoryMailer {
    sent: std::sync::Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutgoingEmail) -> MailResult<()> {
        self.sent.lock().expect("mailer lock poisoned").push(email);
        Ok(())
    }
}
