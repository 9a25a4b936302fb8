//! Messaging channel adapters
//!
//! The `Channel` trait is the seam between the relay loop and a concrete
//! chat platform; only Telegram ships today.

pub mod telegram;

use async_trait::async_trait;

pub use telegram::TelegramChannel;

use crate::Result;

/// A message received from a channel
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform message id
    pub id: i64,

    /// Chat the message arrived in
    pub chat_id: i64,

    /// Sender user id
    pub sender_id: i64,

    /// Sender display name
    pub sender_name: String,

    /// Message text
    pub content: String,

    /// Whether this is a direct message
    pub is_dm: bool,
}

/// A message to send to a channel
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Target chat
    pub chat_id: i64,

    /// Message content (plain text, may contain markdown)
    pub content: String,

    /// Optional reply-to message id
    pub reply_to: Option<i64>,
}

impl OutgoingMessage {
    /// Create a simple text message
    #[must_use]
    pub const fn text(chat_id: i64, content: String) -> Self {
        Self {
            chat_id,
            content,
            reply_to: None,
        }
    }

    /// Create a reply message
    #[must_use]
    pub const fn reply(chat_id: i64, content: String, reply_to: i64) -> Self {
        Self {
            chat_id,
            content,
            reply_to: Some(reply_to),
        }
    }
}

/// Trait for messaging channel adapters
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &'static str;

    /// Connect to the channel
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from the channel
    async fn disconnect(&mut self) -> Result<()>;

    /// Send a message
    async fn send(&self, message: OutgoingMessage) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send typing indicator to show the bot is processing
    ///
    /// Default implementation is a no-op for channels that don't support
    /// typing
    async fn send_typing(&self, _chat_id: i64) -> Result<()> {
        Ok(())
    }
}
