//! Relay integration tests
//!
//! Exercises the message handling flow with a mock channel

use std::sync::Arc;

use async_trait::async_trait;
use courier::channels::{Channel, IncomingMessage, OutgoingMessage};
use courier::daemon::{handle_message, persist_usage};
use courier::db::MetricsRepo;
use courier::msglog::MessageLog;
use courier::quota::{QuotaLimits, Tier, UsageTracker};
use tokio::sync::Mutex;

mod common;
use common::{offline_generator, setup_test_db};

/// Mock channel for testing
struct MockChannel {
    name: &'static str,
    connected: bool,
    sent_messages: Arc<Mutex<Vec<OutgoingMessage>>>,
}

impl MockChannel {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            connected: false,
            sent_messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn get_sent_messages(&self) -> Vec<OutgoingMessage> {
        self.sent_messages.lock().await.clone()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn connect(&mut self) -> courier::Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> courier::Result<()> {
        self.connected = false;
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> courier::Result<()> {
        self.sent_messages.lock().await.push(message);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn incoming(sender_id: i64, content: &str) -> IncomingMessage {
    IncomingMessage {
        id: 1000,
        chat_id: 555,
        sender_id,
        sender_name: "Ada".to_string(),
        content: content.to_string(),
        is_dm: true,
    }
}

fn test_log() -> (tempfile::TempDir, MessageLog) {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = MessageLog::new(dir.path().join("messages.jsonl"));
    (dir, log)
}

#[tokio::test]
async fn mock_channel_connect_disconnect() {
    let mut channel = MockChannel::new("test");

    assert!(!channel.is_connected());
    channel.connect().await.unwrap();
    assert!(channel.is_connected());
    channel.disconnect().await.unwrap();
    assert!(!channel.is_connected());
}

#[tokio::test]
async fn start_command_gets_a_greeting() {
    let channel = MockChannel::new("test");
    let tracker = UsageTracker::new(QuotaLimits::default());
    let (_dir, log) = test_log();

    handle_message(
        &channel,
        &offline_generator(),
        &tracker,
        &log,
        incoming(1, "/start"),
    )
    .await;

    let sent = channel.get_sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, 555);
    assert_eq!(sent[0].reply_to, Some(1000));
    assert!(sent[0].content.contains("/help"));

    // Commands don't consume quota
    assert_eq!(tracker.remaining(1), (25, 10));
}

#[tokio::test]
async fn help_command_reports_remaining_quota() {
    let channel = MockChannel::new("test");
    let tracker = UsageTracker::new(QuotaLimits::default());
    let (_dir, log) = test_log();

    tracker.record(1, Tier::Cheap);
    tracker.record(1, Tier::Pro);

    handle_message(
        &channel,
        &offline_generator(),
        &tracker,
        &log,
        incoming(1, "/help"),
    )
    .await;

    let sent = channel.get_sent_messages().await;
    assert_eq!(sent.len(), 2);
    assert!(sent[0].content.contains("Command Menu"));
    assert!(sent[1].content.contains("24/25"));
    assert!(sent[1].content.contains("9/10"));
}

#[tokio::test]
async fn limited_user_gets_one_pushback_reply() {
    let channel = MockChannel::new("test");
    let tracker = UsageTracker::new(QuotaLimits { cheap: 1, pro: 1 });
    let (_dir, log) = test_log();

    tracker.record(7, Tier::Cheap);
    assert!(tracker.is_limited(7));

    handle_message(
        &channel,
        &offline_generator(),
        &tracker,
        &log,
        incoming(7, "one more question"),
    )
    .await;

    let sent = channel.get_sent_messages().await;
    assert_eq!(sent.len(), 1);
    // The pushback is not the generator-failure apology
    assert!(!sent[0].content.contains("error occurred"));

    // A blocked message does not consume further quota
    assert_eq!(tracker.remaining(7), (0, 1));
}

#[tokio::test]
async fn generator_failure_sends_apology_and_still_counts() {
    let channel = MockChannel::new("test");
    let tracker = UsageTracker::new(QuotaLimits::default());
    let (_dir, log) = test_log();

    // offline_generator points at a dead endpoint, so generation fails
    handle_message(
        &channel,
        &offline_generator(),
        &tracker,
        &log,
        incoming(3, "/4 prove the halting problem"),
    )
    .await;

    let sent = channel.get_sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].content.contains("error occurred"));

    // The request was admitted, so it counts against the pro budget
    assert_eq!(tracker.remaining(3), (25, 9));
}

#[tokio::test]
async fn every_handled_message_is_logged() {
    let channel = MockChannel::new("test");
    let tracker = UsageTracker::new(QuotaLimits { cheap: 0, pro: 0 });
    let (_dir, log) = test_log();

    handle_message(
        &channel,
        &offline_generator(),
        &tracker,
        &log,
        incoming(9, "/start"),
    )
    .await;
    handle_message(
        &channel,
        &offline_generator(),
        &tracker,
        &log,
        incoming(9, "blocked question"),
    )
    .await;

    let content = std::fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("/start"));
    assert!(lines[1].contains("blocked question"));
}

#[test]
fn recorded_usage_round_trips_through_the_store() {
    let pool = setup_test_db();
    let repo = MetricsRepo::new(pool);
    let tracker = UsageTracker::new(QuotaLimits::default());

    tracker.record(1, Tier::Cheap);
    tracker.record(1, Tier::Cheap);
    tracker.record(1, Tier::Pro);
    tracker.record(2, Tier::Pro);

    let flushed = persist_usage(&tracker, &repo).expect("flush");
    assert_eq!(flushed, 2);

    let one = repo.get(1).unwrap().expect("user 1 persisted");
    assert_eq!((one.count, one.count_pro), (2, 1));
    let two = repo.get(2).unwrap().expect("user 2 persisted");
    assert_eq!((two.count, two.count_pro), (0, 1));

    // The flush reset the window
    assert_eq!(tracker.remaining(1), (25, 10));

    // Next window accumulates on top of persisted totals
    tracker.record(1, Tier::Cheap);
    persist_usage(&tracker, &repo).expect("second flush");
    let one = repo.get(1).unwrap().expect("user 1 persisted");
    assert_eq!(one.count, 3);
}
