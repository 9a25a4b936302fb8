//! Telegram channel adapter
//!
//! Long polling for receiving messages, Bot API over HTTP for sending

mod api;
pub mod chunking;
pub mod dedup;
pub mod polling;
pub mod retry;
pub mod types;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;

use super::{Channel, IncomingMessage, OutgoingMessage};
use crate::Result;

pub use chunking::{TELEGRAM_MESSAGE_LIMIT, chunk_text};
pub use dedup::UpdateDedup;
pub use retry::RetryPolicy;
pub use types::BotCommand;

/// Telegram channel adapter
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    token: String,
    client: Client,
    message_tx: Option<mpsc::Sender<IncomingMessage>>,
    connected: bool,
    /// Retry policy for outbound Bot API calls
    retry: RetryPolicy,
}

impl TelegramChannel {
    /// Create a new Telegram channel adapter
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: Client::new(),
            message_tx: None,
            connected: false,
            retry: RetryPolicy::default(),
        }
    }

    /// Create with a message receiver for polling mode
    ///
    /// Returns the channel and a receiver for incoming messages
    #[must_use]
    pub fn with_receiver(token: String) -> (Self, mpsc::Receiver<IncomingMessage>) {
        let (tx, rx) = mpsc::channel(100);
        let channel = Self {
            token,
            client: Client::new(),
            message_tx: Some(tx),
            connected: false,
            retry: RetryPolicy::default(),
        };
        (channel, rx)
    }

    /// Commands advertised in Telegram's command menu
    #[must_use]
    pub fn default_commands() -> Vec<BotCommand> {
        vec![
            BotCommand {
                command: "start".to_string(),
                description: "Greeting and intro".to_string(),
            },
            BotCommand {
                command: "help".to_string(),
                description: "Usage guide and remaining quota".to_string(),
            },
        ]
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn connect(&mut self) -> Result<()> {
        self.get_me().await?;
        if let Err(e) = self.sync_commands(&Self::default_commands()).await {
            tracing::warn!(error = %e, "command menu sync failed");
        }
        self.connected = true;
        tracing::info!("Telegram channel connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        tracing::info!("Telegram channel disconnected");
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.send_message(message.chat_id, &message.content, message.reply_to)
            .await
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send_typing(&self, chat_id: i64) -> Result<()> {
        self.send_chat_action(chat_id, "typing").await?;
        tracing::debug!(chat_id, "Telegram typing indicator sent");
        Ok(())
    }
}
