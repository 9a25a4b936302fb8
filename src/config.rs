//! Configuration for the courier relay
//!
//! Environment-first: the two tokens are required, everything else has a
//! default with a `COURIER_*` override.

use std::path::PathBuf;
use std::time::Duration;

use crate::quota::QuotaLimits;
use crate::{Error, Result};

/// Default flush/window interval (one hour)
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 3600;

/// Default delay between getUpdates polls
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Courier relay configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token
    pub telegram_token: String,

    /// Text-generation API settings
    pub generator: GeneratorConfig,

    /// Per-window request budgets
    pub limits: QuotaLimits,

    /// Counter flush interval; also the quota window length
    pub flush_interval: Duration,

    /// Delay between getUpdates polls
    pub poll_interval: Duration,

    /// Data directory (database, message log)
    pub data_dir: PathBuf,

    /// Path to the usage counter database
    pub db_path: PathBuf,

    /// Path to the JSONL message log
    pub message_log_path: PathBuf,
}

/// Text-generation API settings
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Bearer token for the chat completions endpoint
    pub api_key: String,

    /// API base URL (OpenAI-compatible)
    pub base_url: String,

    /// Default model id
    pub chat_model: String,

    /// Model id for the `/4` advanced mode
    pub advanced_model: String,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if a required token is missing or an override fails to
    /// parse
    pub fn from_env() -> Result<Self> {
        let telegram_token = require_env("TELEGRAM_BOT_TOKEN")?;
        let api_key = require_env("OPENAI_API_KEY")?;

        let generator = GeneratorConfig {
            api_key,
            base_url: std::env::var("COURIER_OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            chat_model: std::env::var("COURIER_CHAT_MODEL")
                .unwrap_or_else(|_| "gpt-3.5-turbo-0125".to_string()),
            advanced_model: std::env::var("COURIER_ADVANCED_MODEL")
                .unwrap_or_else(|_| "gpt-4-0125-preview".to_string()),
        };

        let defaults = QuotaLimits::default();
        let limits = QuotaLimits {
            cheap: env_u32("COURIER_CHEAP_LIMIT", defaults.cheap)?,
            pro: env_u32("COURIER_PRO_LIMIT", defaults.pro)?,
        };

        let flush_interval = Duration::from_secs(env_u64(
            "COURIER_FLUSH_INTERVAL_SECS",
            DEFAULT_FLUSH_INTERVAL_SECS,
        )?);
        let poll_interval = Duration::from_secs(env_u64(
            "COURIER_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?);

        let data_dir = data_dir();
        std::fs::create_dir_all(&data_dir).ok();

        let db_path = data_dir.join("user_metrics.db");
        let message_log_path = data_dir.join("message_log.jsonl");

        Ok(Self {
            telegram_token,
            generator,
            limits,
            flush_interval,
            poll_interval,
            data_dir,
            db_path,
            message_log_path,
        })
    }
}

/// Resolve the data directory
///
/// `COURIER_DATA_DIR` wins; otherwise the platform data dir
/// (`~/.local/share/courier` on Linux), falling back to the working
/// directory.
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COURIER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("dev", "courier", "courier")
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().to_path_buf())
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{name} is not set")))
}

fn env_u32(name: &str, default: u32) -> Result<u32> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{name} is not a valid integer: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{name} is not a valid integer: {raw}"))),
        Err(_) => Ok(default),
    }
}
