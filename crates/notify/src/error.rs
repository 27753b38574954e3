//! Error types for the notification channels.

use thiserror::Error;

/// Errors that can occur when sending notifications.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel is not configured
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Message could not be built
    #[error("Message error: {0}")]
    Message(#[from] lettre::error::Error),

    /// A configured address did not parse
    #[error("Address error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// SMTP delivery failed
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}
