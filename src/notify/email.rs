use async_trait::async_trait;
use chrono::Local;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::EmailConfig;
use crate::error::Result;
use crate::notify::templates::{error_html, success_html, ERROR_SUBJECT, SUCCESS_SUBJECT};
use crate::notify::Notifier;
use crate::types::{Phase, RunReport};

/// Sends HTML reports through an implicit-TLS SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn new(cfg: &EmailConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(cfg.from.clone(), cfg.password.clone()))
            .build();

        Ok(Self {
            transport,
            from: cfg.from.parse()?,
            to: cfg.to.parse()?,
        })
    }

    async fn send_html(&self, subject: &str, html: String) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)?;

        self.transport.send(message).await?;
        info!(to = %self.to, %subject, "Email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_success(&self, report: &RunReport) -> Result<()> {
        let html = success_html(report, Local::now().naive_local());
        self.send_html(SUCCESS_SUBJECT, html).await
    }

    async fn send_error(&self, phase: Phase, error: &str) -> Result<()> {
        let html = error_html(phase, error, Local::now().naive_local());
        self.send_html(ERROR_SUBJECT, html).await
    }
}
