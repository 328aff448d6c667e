//! Email transport: real SMTP delivery or dev-mode logging.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use availability_core::notify::EmailMessage;

use crate::config::SmtpConfig;

pub enum Mailer {
    /// Log rendered messages instead of delivering them.
    Dev,
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
}

impl Mailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        if config.dev_mode {
            tracing::info!("smtp dev mode; all messages will be logged instead of delivered");
            return Ok(Self::Dev);
        }
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port);
        if !config.pass.is_empty() {
            builder = builder.credentials(Credentials::new(config.user.clone(), config.pass.clone()));
        }
        Ok(Self::Smtp(builder.build()))
    }

    pub async fn send(&self, email: &EmailMessage) -> Result<()> {
        match self {
            Self::Dev => {
                tracing::info!(
                    subject = %email.subject,
                    to = ?email.to,
                    cc = ?email.cc,
                    from = %email.from,
                    body = %email.body,
                    "dev mode email"
                );
                Ok(())
            }
            Self::Smtp(transport) => {
                let message = build_message(email)?;
                tracing::info!(subject = %email.subject, to = ?email.to, "sending email");
                transport.send(message).await.context("smtp send failed")?;
                Ok(())
            }
        }
    }
}

fn build_message(email: &EmailMessage) -> Result<Message> {
    let from: Mailbox = email.from.parse().context("invalid from address")?;
    let mut builder = Message::builder()
        .subject(email.subject.clone())
        .from(from);
    for to in &email.to {
        builder = builder.to(to.parse().context("invalid to address")?);
    }
    if let Some(cc) = &email.cc {
        builder = builder.cc(cc.parse().context("invalid cc address")?);
    }
    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(reply_to.parse().context("invalid reply-to address")?);
    }
    builder
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .context("unable to build message")
}
