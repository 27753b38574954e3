//! Email notification channel over SMTP.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::error::ChannelError;
use crate::report::AlertReport;
use crate::NotifyChannel;

/// Default SMTP relay host (SendGrid).
const DEFAULT_SMTP_HOST: &str = "smtp.sendgrid.net";

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Fixed SMTP username for API-key authentication.
const SMTP_USERNAME: &str = "apikey";

/// Email channel sending one multipart message per alert report.
pub struct EmailChannel {
    smtp_host: String,
    smtp_port: u16,
    api_key: String,
    sender: String,
    recipients: Vec<String>,
}

impl EmailChannel {
    /// Create a channel against the default SMTP relay.
    #[must_use]
    pub fn new(api_key: impl Into<String>, sender: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            api_key: api_key.into(),
            sender: sender.into(),
            recipients,
        }
    }

    /// Override the SMTP relay host and port.
    #[must_use]
    pub fn with_relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.smtp_host = host.into();
        self.smtp_port = port;
        self
    }

    /// Build the multipart message for one report.
    fn build_message(&self, report: &AlertReport) -> Result<Message, ChannelError> {
        let from: Mailbox = self.sender.parse()?;

        let mut builder = Message::builder().from(from).subject(report.subject());
        for recipient in &self.recipients {
            let to: Mailbox = recipient.parse()?;
            builder = builder.to(to);
        }

        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(report.text_body()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(report.html_body()),
                ),
        )?;

        Ok(message)
    }
}

#[async_trait]
impl NotifyChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn enabled(&self) -> bool {
        !self.api_key.is_empty() && !self.sender.is_empty() && !self.recipients.is_empty()
    }

    async fn send(&self, report: &AlertReport) -> Result<(), ChannelError> {
        if !self.enabled() {
            return Err(ChannelError::NotConfigured(
                "SMTP API key, sender, and recipients are required".to_string(),
            ));
        }

        let message = self.build_message(report)?;

        let creds = Credentials::new(SMTP_USERNAME.to_string(), self.api_key.clone());
        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_host)?
                .port(self.smtp_port)
                .credentials(creds)
                .build();

        debug!(recipients = self.recipients.len(), "Sending alert email");
        mailer.send(message).await?;

        info!(
            recipients = self.recipients.len(),
            subject = %report.subject(),
            "Alert email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use costwatch_source::{WorkflowCostRecord, WorkflowStatus};

    fn report() -> AlertReport {
        AlertReport::new(
            vec![WorkflowCostRecord {
                namespace: "ns".to_string(),
                workspace: "ws".to_string(),
                submission_id: "sub-1".to_string(),
                workflow_id: "wf-1".to_string(),
                submission_name: "align".to_string(),
                submitter: "user@example.org".to_string(),
                cost: 15.0,
                submit_time: None,
                start_time: None,
                end_time: None,
                status: WorkflowStatus::Failed,
            }],
            Utc::now(),
        )
    }

    #[test]
    fn test_enabled_requires_full_configuration() {
        let full = EmailChannel::new(
            "SG.key",
            "alerts@example.org",
            vec!["ops@example.org".to_string()],
        );
        assert!(full.enabled());

        let no_recipients = EmailChannel::new("SG.key", "alerts@example.org", vec![]);
        assert!(!no_recipients.enabled());

        let no_key = EmailChannel::new("", "alerts@example.org", vec!["ops@example.org".to_string()]);
        assert!(!no_key.enabled());
    }

    #[test]
    fn test_message_addresses_every_recipient() {
        let channel = EmailChannel::new(
            "SG.key",
            "alerts@example.org",
            vec!["ops@example.org".to_string(), "oncall@example.org".to_string()],
        );

        let message = channel.build_message(&report()).unwrap();
        let headers = format!("{:?}", message.headers());
        assert!(headers.contains("ops@example.org"));
        assert!(headers.contains("oncall@example.org"));
        assert!(headers.contains("alerts@example.org"));
    }

    #[test]
    fn test_invalid_sender_is_an_address_error() {
        let channel = EmailChannel::new(
            "SG.key",
            "not-an-address",
            vec!["ops@example.org".to_string()],
        );
        let err = channel.build_message(&report()).unwrap_err();
        assert!(matches!(err, ChannelError::Address(_)));
    }
}
