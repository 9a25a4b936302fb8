//! Telegram polling mode - getUpdates loop and message conversion

use serde::Deserialize;
use tokio::sync::mpsc;

use super::dedup::UpdateDedup;
use super::types::API_BASE;
use crate::channels::IncomingMessage;

/// Response from Telegram getUpdates API
#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    #[allow(dead_code)]
    ok: bool,
    result: Vec<PollingUpdate>,
}

/// A single update from getUpdates
#[derive(Debug, Deserialize)]
struct PollingUpdate {
    update_id: i64,
    message: Option<PollingMessage>,
}

/// Message from a polling update
#[derive(Debug, Deserialize)]
struct PollingMessage {
    message_id: i64,
    chat: PollingChat,
    from: Option<PollingUser>,
    text: Option<String>,
}

/// Chat info from polling
#[derive(Debug, Deserialize)]
struct PollingChat {
    id: i64,
    #[serde(rename = "type")]
    chat_type: String,
}

/// User info from polling
#[derive(Debug, Deserialize)]
struct PollingUser {
    id: i64,
    is_bot: bool,
    first_name: String,
}

impl super::TelegramChannel {
    /// Spawn a background task that polls Telegram's getUpdates API
    ///
    /// Polls every `interval` and forwards received messages into the mpsc
    /// channel. Deletes any existing webhook before starting to avoid
    /// conflicts.
    ///
    /// # Panics
    ///
    /// Panics if the channel was not created with `with_receiver`
    pub fn start_polling(&self, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let token = self.token.clone();
        let client = self.client.clone();
        let tx = self
            .message_tx
            .clone()
            .expect("start_polling requires a message_tx (use with_receiver)");

        tokio::spawn(async move {
            polling_loop(token, client, tx, interval).await;
        })
    }
}

/// Run the polling loop (background task)
async fn polling_loop(
    token: String,
    client: reqwest::Client,
    tx: mpsc::Sender<IncomingMessage>,
    interval: std::time::Duration,
) {
    // Delete any existing webhook so getUpdates works
    let delete_url = format!("{API_BASE}{token}/deleteWebhook");
    if let Err(e) = client.post(&delete_url).send().await {
        tracing::warn!(error = %e, "failed to delete Telegram webhook before polling");
    }

    let mut offset: Option<i64> = None;
    let mut dedup = UpdateDedup::default();

    loop {
        let url = format!("{API_BASE}{token}/getUpdates");
        let mut params = serde_json::json!({
            "timeout": 30,
            "allowed_updates": ["message"],
        });
        if let Some(off) = offset {
            params["offset"] = serde_json::json!(off);
        }

        match client.post(&url).json(&params).send().await {
            Ok(resp) => {
                if let Ok(body) = resp.text().await {
                    if let Ok(updates) = serde_json::from_str::<GetUpdatesResponse>(&body) {
                        for update in &updates.result {
                            // Advance offset past this update
                            offset = Some(update.update_id + 1);

                            if dedup.is_duplicate(update.update_id) {
                                continue;
                            }

                            if let Some(msg) = update_to_incoming(update) {
                                if let Err(e) = tx.send(msg).await {
                                    tracing::warn!(error = %e, "failed to forward Telegram message");
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Telegram getUpdates error");
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Convert a polling update into an `IncomingMessage`
fn update_to_incoming(update: &PollingUpdate) -> Option<IncomingMessage> {
    let msg = update.message.as_ref()?;

    // Skip messages with no text
    let text = msg.text.clone()?;

    // Skip bot messages
    let from = msg.from.as_ref();
    if from.is_some_and(|u| u.is_bot) {
        return None;
    }

    let sender_id = from.map_or(msg.chat.id, |u| u.id);
    let sender_name = from.map_or_else(|| "Unknown".to_string(), |u| u.first_name.clone());

    Some(IncomingMessage {
        id: msg.message_id,
        chat_id: msg.chat.id,
        sender_id,
        sender_name,
        content: text,
        is_dm: msg.chat.chat_type == "private",
    })
}
