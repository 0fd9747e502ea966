//! Source channel abstraction
//!
//! The ingestion pipeline only needs four things from the messaging platform:
//! connect, fetch recent history, wait for new messages and list channels.

use async_trait::async_trait;

use crate::models::trading_plan::ChannelInfo;

/// A message posted to the source channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: i64,
    pub text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("channel API error ({code}): {description}")]
    Api { code: i64, description: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("client is not connected")]
    NotConnected,
}

#[async_trait]
pub trait ChannelClient: Send + Sync {
    /// Authenticate and prepare for fetching
    async fn connect(&self) -> Result<(), ChannelError>;

    /// Most recent messages of the source channel, newest first
    async fn get_recent_messages(&self, limit: usize) -> Result<Vec<ChannelMessage>, ChannelError>;

    /// Wait for the next batch of new messages, in delivery order.
    ///
    /// An empty batch means the wait timed out with nothing new.
    async fn next_messages(&self) -> Result<Vec<ChannelMessage>, ChannelError>;

    /// Channels visible to the client
    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, ChannelError>;
}
