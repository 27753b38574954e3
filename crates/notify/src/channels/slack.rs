//! Slack chat notification channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::report::AlertReport;
use crate::NotifyChannel;

/// Slack Web API endpoint for posting messages.
const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Slack channel backed by a bot token posting to one channel.
pub struct SlackChannel {
    client: reqwest::Client,
    api_url: String,
    token: String,
    channel: String,
}

impl SlackChannel {
    /// Create a channel posting to `channel` with the given bot token.
    #[must_use]
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: SLACK_POST_MESSAGE_URL.to_string(),
            token: token.into(),
            channel: channel.into(),
        }
    }

    /// Override the API endpoint (tests).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Format a report as a Slack message payload.
    fn format_payload(&self, report: &AlertReport) -> SlackMessage {
        SlackMessage {
            channel: self.channel.clone(),
            text: format!("*{}*\n```{}```", report.subject(), report.text_table()),
        }
    }
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn enabled(&self) -> bool {
        !self.token.is_empty() && !self.channel.is_empty()
    }

    async fn send(&self, report: &AlertReport) -> Result<(), ChannelError> {
        if !self.enabled() {
            return Err(ChannelError::NotConfigured(
                "Slack bot token and channel are required".to_string(),
            ));
        }

        let payload = self.format_payload(report);
        debug!(channel = %self.channel, workflows = report.len(), "Posting Slack alert");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Slack request failed");
            return Err(ChannelError::Other(format!(
                "Slack returned {status}: {body}"
            )));
        }

        // Slack reports API-level failures inside a 200 response.
        let body: SlackResponse = response.json().await?;
        if body.ok {
            debug!(channel = %self.channel, "Slack alert posted");
            Ok(())
        } else {
            let reason = body.error.unwrap_or_else(|| "unknown error".to_string());
            warn!(channel = %self.channel, error = %reason, "Slack rejected message");
            Err(ChannelError::Other(format!("Slack API error: {reason}")))
        }
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SlackMessage {
    channel: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
}
