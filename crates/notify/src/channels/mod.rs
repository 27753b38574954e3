//! Notification channel implementations.

pub mod email;
pub mod slack;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::report::AlertReport;

/// Trait for notification channels (Slack, email, etc.).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Deliver one alert report through this channel.
    async fn send(&self, report: &AlertReport) -> Result<(), ChannelError>;
}
