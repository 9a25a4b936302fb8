//! Raw Telegram Bot API calls

use super::retry;
use super::types::{
    API_BASE, BotCommand, SendChatActionRequest, SendMessageRequest, SetMyCommandsRequest,
};
use crate::{Error, Result};

impl super::TelegramChannel {
    /// Send a message to a chat
    ///
    /// Uses Markdown parse mode with a plain-text fallback when Telegram
    /// rejects the formatting. Recoverable failures (429, 5xx, transient
    /// network errors) are retried with backoff.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails after retries
    pub async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<()> {
        match self
            .try_send(chat_id, text, reply_to, Some("Markdown"))
            .await
        {
            Err(Error::Channel(ref desc)) if desc.to_lowercase().contains("can't parse entities") => {
                tracing::debug!(chat_id, "markdown rejected, retrying as plain text");
                self.try_send(chat_id, text, reply_to, None).await
            }
            other => other,
        }
    }

    /// Send one message with the given parse mode, retrying recoverable
    /// failures
    async fn try_send(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        parse_mode: Option<&str>,
    ) -> Result<()> {
        let url = format!("{API_BASE}{}/sendMessage", self.token);

        let mut attempt = 0u32;
        loop {
            let request = SendMessageRequest {
                chat_id,
                text: text.to_string(),
                parse_mode: parse_mode.map(String::from),
                reply_to_message_id: reply_to,
                disable_web_page_preview: None,
            };

            match self.client.post(&url).json(&request).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(chat_id, "Telegram message sent");
                    return Ok(());
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();

                    if !retry::is_recoverable(status, &body) || attempt >= self.retry.max_retries {
                        return Err(Error::Channel(format!(
                            "Telegram sendMessage error: {status} - {body}"
                        )));
                    }

                    let delay = self.retry.delay(attempt, retry::parse_retry_after(&body));
                    tracing::warn!(chat_id, status, ?delay, "recoverable Telegram error, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if attempt >= self.retry.max_retries {
                        return Err(Error::Channel(format!("Telegram sendMessage error: {e}")));
                    }

                    let delay = self.retry.delay(attempt, None);
                    tracing::warn!(chat_id, error = %e, ?delay, "Telegram request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }

            attempt += 1;
        }
    }

    /// Send a chat action (typing indicator, etc.)
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<()> {
        let url = format!("{API_BASE}{}/sendChatAction", self.token);

        let request = SendChatActionRequest {
            chat_id,
            action: action.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram sendChatAction error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "Telegram sendChatAction error: {status} - {body}"
            )));
        }

        Ok(())
    }

    /// Sync bot commands with Telegram via `setMyCommands`
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn sync_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let url = format!("{API_BASE}{}/setMyCommands", self.token);

        let request = SetMyCommandsRequest {
            commands: commands.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram setMyCommands error: {e}")))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "Telegram setMyCommands error: {body}"
            )));
        }

        tracing::info!(count = commands.len(), "Telegram bot commands synced");
        Ok(())
    }

    /// Validate the bot token by calling `getMe`
    ///
    /// # Errors
    ///
    /// Returns error if the token is invalid
    pub async fn get_me(&self) -> Result<()> {
        let url = format!("{API_BASE}{}/getMe", self.token);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram getMe error: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Channel("Invalid Telegram bot token".to_string()));
        }

        Ok(())
    }
}
