//! Delivery of finished decks by email

use crate::types::*;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// MIME type of attached presentations
pub const PRESENTATION_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Sends a message with file attachments
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        attachments: &[PathBuf],
    ) -> Result<()>;
}

/// SMTP relay and message text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub host: String,
    /// Implicit TLS port
    pub port: u16,
    /// Sender address; the SMTP user when unset
    pub from: Option<String>,
    pub subject: String,
    pub body: String,
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            from: None,
            subject: "Your design presentation".to_string(),
            body: "Hello,\n\nPlease find your presentation attached.\n".to_string(),
            timeout_secs: 30,
        }
    }
}

impl MailConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RuntimeError::Config("SMTP host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(RuntimeError::Config("SMTP port must not be 0".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(RuntimeError::Config(
                "SMTP timeout must be at least 1 second".to_string(),
            ));
        }
        if let Some(from) = &self.from {
            parse_mailbox(from)?;
        }
        Ok(())
    }
}

/// [`Mailer`] over an SMTPS relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, username: &str, password: &str) -> Result<Self> {
        let from = parse_mailbox(config.from.as_deref().unwrap_or(username))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| RuntimeError::Mail(format!("invalid relay {}: {e}", config.host)))?
            .port(config.port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        attachments: &[PathBuf],
    ) -> Result<()> {
        let files = read_attachments(attachments).await?;
        let count = files.len();
        let message = build_message(&self.from, recipient, subject, body, files)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| RuntimeError::Mail(format!("sending to {recipient}: {e}")))?;

        log::info!("emailed {recipient} with {count} attachments");
        Ok(())
    }
}

/// Read every attachment; a missing file fails the whole send
pub async fn read_attachments(paths: &[PathBuf]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path).await.map_err(|e| {
            std::io::Error::new(e.kind(), format!("attachment {}: {e}", path.display()))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "presentation.pptx".to_string());
        files.push((name, data));
    }
    Ok(files)
}

/// Plain-text message with every file attached as a presentation
pub fn build_message(
    from: &Mailbox,
    recipient: &str,
    subject: &str,
    body: &str,
    files: Vec<(String, Vec<u8>)>,
) -> Result<Message> {
    let content_type = ContentType::parse(PRESENTATION_MIME)
        .map_err(|e| RuntimeError::Mail(format!("bad content type: {e}")))?;

    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(body.to_string()));
    for (name, data) in files {
        parts = parts.singlepart(Attachment::new(name).body(data, content_type.clone()));
    }

    Message::builder()
        .from(from.clone())
        .to(parse_mailbox(recipient)?)
        .subject(subject)
        .multipart(parts)
        .map_err(|e| RuntimeError::Mail(format!("building message: {e}")))
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| RuntimeError::Mail(format!("invalid address {address:?}: {e}")))
}
