//! Notification channels for high-cost workflow alerts.
//!
//! One [`AlertReport`] is built per monitor run and delivered through every
//! configured channel. Channel selection is injected configuration: callers
//! construct the channels they want and hand them to [`Notifier`], so there
//! is no global transport switch.
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`SlackChannel`] posts to a Slack channel via a bot token
//! - [`EmailChannel`] sends one multipart email over SMTP
//! - [`Notifier`] delivers a report to all configured channels
//!
//! Delivery failures are logged and reported to the caller, never
//! propagated as errors: a failed notification must not stop the alert log
//! from being updated.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod report;

pub use channels::email::EmailChannel;
pub use channels::slack::SlackChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use report::AlertReport;

use std::sync::Arc;

use tracing::{debug, error, info};

/// Central notification dispatcher.
///
/// Delivers each report to every channel sequentially and keeps going when
/// a channel fails.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
}

impl Notifier {
    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a disabled notifier (dry runs, tests).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
        }
    }

    /// Check if any notification channels are enabled.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        !self.disabled && self.channels.iter().any(|c| c.enabled())
    }

    /// Get the number of configured channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        if self.disabled {
            0
        } else {
            self.channels.len()
        }
    }

    /// Deliver a report to every enabled channel.
    ///
    /// Returns the number of channels that accepted the report. Failures
    /// are logged per channel and never propagate.
    pub async fn send(&self, report: &AlertReport) -> usize {
        if self.disabled {
            debug!("Notifications disabled, skipping report");
            return 0;
        }
        if report.is_empty() {
            debug!("Empty report, nothing to send");
            return 0;
        }

        let mut delivered = 0;
        for channel in &self.channels {
            let channel_name = channel.name();
            if !channel.enabled() {
                debug!(channel = channel_name, "Channel disabled, skipping");
                continue;
            }

            match channel.send(report).await {
                Ok(()) => {
                    info!(channel = channel_name, "Notification sent");
                    delivered += 1;
                }
                Err(e) => {
                    error!(
                        channel = channel_name,
                        error = %e,
                        "Failed to send notification"
                    );
                }
            }
        }

        delivered
    }

    /// Deliver a report and collect per-channel results (tests, delivery
    /// confirmation).
    pub async fn send_and_collect(
        &self,
        report: &AlertReport,
    ) -> Vec<(String, Result<(), ChannelError>)> {
        if self.disabled || self.channels.is_empty() {
            return vec![];
        }

        let mut results = vec![];
        for channel in &self.channels {
            let channel_name = channel.name().to_string();
            let result = channel.send(report).await;
            results.push((channel_name, result));
        }

        results
    }
}
