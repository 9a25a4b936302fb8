//! Retry with exponential backoff for Telegram Bot API calls

use std::time::{Duration, SystemTime};

/// Retry policy for outbound Bot API calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry numbered `attempt` (0-based)
    ///
    /// A server-provided `retry_after` wins, capped at `max_delay`. Otherwise
    /// exponential backoff with up to 25% jitter taken from the subsecond
    /// part of the system clock.
    #[must_use]
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(ra) = retry_after {
            return ra.min(self.max_delay);
        }

        let base = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);

        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        let jitter = base.mul_f64(f64::from(nanos % 250) / 1000.0);

        (base + jitter).min(self.max_delay)
    }
}

/// Whether an HTTP status and response body indicate an error worth retrying
///
/// Rate limits (429), server errors (5xx), and transient network failures
/// surfaced in the body text are recoverable; everything else is not.
#[must_use]
pub fn is_recoverable(status: u16, body: &str) -> bool {
    if status == 429 || (500..600).contains(&status) {
        return true;
    }

    let lower = body.to_lowercase();
    lower.contains("connection reset")
        || lower.contains("timed out")
        || lower.contains("dns error")
}

/// Extract `parameters.retry_after` (seconds) from a Bot API error body
#[must_use]
pub fn parse_retry_after(body: &str) -> Option<Duration> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    let secs = v.get("parameters")?.get("retry_after")?.as_u64()?;

    Some(Duration::from_secs(secs))
}
