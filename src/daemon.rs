//! Relay daemon - wires the Telegram channel, generator, quota tracker, and
//! flush task together

use rand::seq::SliceRandom;
use tokio::sync::mpsc;

use crate::channels::telegram::{TELEGRAM_MESSAGE_LIMIT, chunk_text};
use crate::channels::{Channel, IncomingMessage, OutgoingMessage, TelegramChannel};
use crate::config::Config;
use crate::db::{self, DbPool, MetricsRepo};
use crate::generator::Generator;
use crate::msglog::MessageLog;
use crate::prompt::GenMode;
use crate::quota::{QuotaLimits, Usage, UsageTracker};
use crate::Result;

/// Replies sent when a user exhausts their window budget
const SPAM_REPLIES: &[&str] = &[
    "Whoa there, speed racer! 🏎️",
    "Someone needs a chill pill.💊",
    "Easy on the keyboard, friend.",
    "Quality over quantity, my friend.",
    "Woah! Someones got chatty fingers.",
    "My reply speed can't match yours.🐌",
    "Spamming at the speed of light, are we?",
    "Spam alert! Must... resist... the urge to reply.",
];

/// Reply for `/start`
const GREETING: &str = "Google gives you _links_\nThis bot gives you _solutions_ 🤖\n\nGet help anytime: /help";

/// First reply for `/help`
const HELP_GUIDE: &str = "*🤖 Bot Command Menu 🤖*\n\n\
    • To ask a question, type it in the chat.\n\
    • If a detailed response is required, start with /a.\n\
    • For the advanced model (slow but very accurate), start with /4.\n\
    • To edit grammar in your message, use /u.";

/// Reply when generation fails
const APOLOGY: &str = "An error occurred. Please try again later.";

/// The relay daemon
pub struct Daemon {
    config: Config,
    db: DbPool,
    tracker: UsageTracker,
    log: MessageLog,
}

impl Daemon {
    /// Create a daemon for the given configuration
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be initialized
    pub fn new(config: Config) -> Result<Self> {
        let db = db::init(&config.db_path)?;
        let tracker = UsageTracker::new(config.limits);
        let log = MessageLog::new(config.message_log_path.clone());

        Ok(Self {
            config,
            db,
            tracker,
            log,
        })
    }

    /// Run until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the Telegram channel cannot connect
    pub async fn run(self) -> Result<()> {
        // Set up shutdown signal
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        let (mut telegram, rx) =
            TelegramChannel::with_receiver(self.config.telegram_token.clone());
        telegram.connect().await?;

        let poll_handle = telegram.start_polling(self.config.poll_interval);

        // Flush task: drain the quota window into the store every interval
        let repo = MetricsRepo::new(self.db.clone());
        let flush_tracker = self.tracker.clone();
        let flush_interval = self.config.flush_interval;
        let flush_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(flush_interval);
            // Skip the immediate first tick; there is nothing to flush yet
            interval.tick().await;
            loop {
                interval.tick().await;
                match persist_usage(&flush_tracker, &repo) {
                    Ok(flushed) => {
                        tracing::info!(users = flushed, "usage counters flushed, window reset");
                    }
                    Err(e) => tracing::error!(error = %e, "usage flush failed"),
                }
            }
        });

        // Relay loop
        let generator = Generator::new(self.config.generator.clone());
        let relay_channel = telegram.clone();
        let relay_tracker = self.tracker.clone();
        let relay_log = self.log.clone();
        let relay_handle = tokio::spawn(async move {
            handle_messages(rx, relay_channel, generator, relay_tracker, relay_log).await;
        });

        tracing::info!(
            flush_interval_secs = self.config.flush_interval.as_secs(),
            "courier relay ready"
        );

        shutdown_rx.recv().await;
        tracing::info!("shutdown requested");

        poll_handle.abort();
        relay_handle.abort();
        flush_handle.abort();

        // Final flush so pending counts survive the restart
        let repo = MetricsRepo::new(self.db.clone());
        match persist_usage(&self.tracker, &repo) {
            Ok(flushed) => tracing::info!(users = flushed, "final usage flush complete"),
            Err(e) => tracing::error!(error = %e, "final usage flush failed"),
        }

        tracing::info!("daemon stopped");
        Ok(())
    }
}

/// Drain the in-memory counters into the store
///
/// Deltas that fail to persist are restored to the tracker and retried on the
/// next flush; a recorded request is never dropped and never written twice.
///
/// # Errors
///
/// Returns the last persist error if any delta failed (the failed deltas are
/// already restored)
pub fn persist_usage(tracker: &UsageTracker, repo: &MetricsRepo) -> Result<usize> {
    let deltas = tracker.drain();
    let total = deltas.len();

    let mut failed: Vec<(i64, Usage)> = Vec::new();
    let mut last_err = None;

    for (user_id, usage) in deltas {
        if let Err(e) = repo.accumulate(user_id, usage.cheap, usage.pro) {
            tracing::warn!(user_id, error = %e, "counter persist failed, will retry next flush");
            failed.push((user_id, usage));
            last_err = Some(e);
        }
    }

    if !failed.is_empty() {
        tracker.restore(&failed);
    }

    match last_err {
        Some(e) => Err(e),
        None => Ok(total),
    }
}

/// Receive-and-handle loop for one channel
async fn handle_messages<C: Channel>(
    mut rx: mpsc::Receiver<IncomingMessage>,
    channel: C,
    generator: Generator,
    tracker: UsageTracker,
    log: MessageLog,
) {
    tracing::info!(channel = channel.name(), "relay loop started");

    while let Some(msg) = rx.recv().await {
        handle_message(&channel, &generator, &tracker, &log, msg).await;
    }
}

/// Handle one incoming message end to end
///
/// Logs the message, serves `/start` and `/help`, enforces the quota, and
/// relays everything else through the generator.
pub async fn handle_message<C: Channel>(
    channel: &C,
    generator: &Generator,
    tracker: &UsageTracker,
    log: &MessageLog,
    msg: IncomingMessage,
) {
    if let Err(e) = log.append(msg.sender_id, &msg.content) {
        tracing::warn!(error = %e, "message log append failed");
    }

    tracing::info!(
        chat = msg.chat_id,
        sender = %msg.sender_name,
        dm = msg.is_dm,
        content = %msg.content,
        "message received"
    );

    if is_command(&msg.content, "/start") {
        send_or_log(
            channel,
            OutgoingMessage::reply(msg.chat_id, GREETING.to_string(), msg.id),
        )
        .await;
        return;
    }

    if is_command(&msg.content, "/help") {
        send_or_log(
            channel,
            OutgoingMessage::reply(msg.chat_id, HELP_GUIDE.to_string(), msg.id),
        )
        .await;

        let (cheap, pro) = tracker.remaining(msg.sender_id);
        send_or_log(
            channel,
            OutgoingMessage::text(msg.chat_id, quota_text(cheap, pro, tracker.limits())),
        )
        .await;
        return;
    }

    if tracker.is_limited(msg.sender_id) {
        tracing::info!(sender = msg.sender_id, "quota exhausted, dropping message");
        send_or_log(
            channel,
            OutgoingMessage::reply(msg.chat_id, spam_reply().to_string(), msg.id),
        )
        .await;
        return;
    }

    let (mode, prompt) = GenMode::parse_command(&msg.content);
    tracker.record(msg.sender_id, mode.tier());

    if let Err(e) = channel.send_typing(msg.chat_id).await {
        tracing::debug!(error = %e, "typing indicator failed");
    }

    match generator.generate(mode, prompt).await {
        Ok(reply) => {
            for chunk in chunk_text(&reply, TELEGRAM_MESSAGE_LIMIT) {
                send_or_log(channel, OutgoingMessage::reply(msg.chat_id, chunk, msg.id)).await;
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "generation failed");
            send_or_log(
                channel,
                OutgoingMessage::reply(msg.chat_id, APOLOGY.to_string(), msg.id),
            )
            .await;
        }
    }
}

/// Whether `text` is `command` itself or `command` followed by arguments
fn is_command(text: &str, command: &str) -> bool {
    text == command || text.starts_with(&format!("{command} "))
}

/// Remaining-quota message for `/help`
fn quota_text(cheap: u32, pro: u32, limits: QuotaLimits) -> String {
    format!(
        "_Message limits apply to free accounts_ 🤏\n\n\
         You have *{cheap}/{}* simple and *{pro}/{}* large requests left for the hour.\n\n\
         Show this message again - /help",
        limits.cheap, limits.pro
    )
}

/// Pick an anti-spam reply at random
fn spam_reply() -> &'static str {
    SPAM_REPLIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(SPAM_REPLIES[0])
}

/// Send a message, logging instead of propagating failures
async fn send_or_log<C: Channel>(channel: &C, message: OutgoingMessage) {
    if let Err(e) = channel.send(message).await {
        tracing::error!(error = %e, "send error");
    }
}
