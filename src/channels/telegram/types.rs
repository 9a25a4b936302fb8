//! Telegram Bot API request types

use serde::Serialize;

/// Telegram Bot API base URL
pub(crate) const API_BASE: &str = "https://api.telegram.org/bot";

/// Telegram sendMessage request
#[derive(Serialize)]
pub(crate) struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_web_page_preview: Option<bool>,
}

/// Telegram sendChatAction request
#[derive(Serialize)]
pub(crate) struct SendChatActionRequest {
    pub chat_id: i64,
    pub action: String,
}

/// Telegram setMyCommands request
#[derive(Serialize)]
pub(crate) struct SetMyCommandsRequest {
    pub commands: Vec<BotCommand>,
}

/// A bot command for Telegram's command menu
#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}
