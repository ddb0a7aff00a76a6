//! SMTP escalation — mails fault reports to the operator address.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use phrasedrop_core::config::ErrorMailConfig;
use phrasedrop_core::error::{PhrasedropError, Result};
use phrasedrop_core::report::FaultReport;
use phrasedrop_core::traits::EscalationChannel;

/// SMTP sender with a fixed subject and recipient.
pub struct Mailer {
    config: ErrorMailConfig,
    subject: String,
}

impl Mailer {
    pub fn new(config: ErrorMailConfig, subject: impl Into<String>) -> Self {
        Self {
            config,
            subject: subject.into(),
        }
    }

    /// Send a plain-text mail with optional text attachments.
    pub async fn send(&self, body: &str, attachments: &[(String, String)]) -> Result<()> {
        let from: Mailbox = self
            .config
            .from_addr
            .parse()
            .map_err(|e| PhrasedropError::Channel(format!("Invalid from address: {e}")))?;
        let to: Mailbox = self
            .config
            .to_addr
            .parse()
            .map_err(|e| PhrasedropError::Channel(format!("Invalid to address: {e}")))?;

        let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(body.to_string()));
        for (filename, content) in attachments {
            multipart = multipart.singlepart(
                Attachment::new(filename.clone()).body(content.clone(), ContentType::TEXT_PLAIN),
            );
        }

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .multipart(multipart)
            .map_err(|e| PhrasedropError::Channel(format!("Build email: {e}")))?;

        let creds = Credentials::new(
            self.config.from_addr.clone(),
            self.config.password.clone(),
        );
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
            .map_err(|e| PhrasedropError::Channel(format!("SMTP relay: {e}")))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| PhrasedropError::Channel(format!("SMTP send: {e}")))?;
        tracing::info!("📤 Fault report mailed to {}", self.config.to_addr);
        Ok(())
    }
}

/// Escalation channel that mails each rendered report, with log excerpts
/// attached.
pub struct MailEscalation {
    mailer: Mailer,
}

impl MailEscalation {
    pub fn new(mailer: Mailer) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl EscalationChannel for MailEscalation {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, report: &FaultReport) -> Result<()> {
        let attachments: Vec<(String, String)> = report
            .logs
            .iter()
            .enumerate()
            .map(|(i, log)| (format!("log{}.txt", i + 1), log.clone()))
            .collect();
        self.mailer.send(&report.render(), &attachments).await
    }
}
