//! Per-user usage tracking for the current quota window
//!
//! Counters live in a shared in-memory map and are drained into the store
//! once per window by the daemon's flush task. `drain` is the only reset
//! path: an increment is either still in the map or has been handed to
//! exactly one flush cycle. A failed persist must `restore` the drained
//! deltas so they are retried next cycle instead of being dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Cost tier of a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Default model, counted against the larger budget
    Cheap,
    /// Expensive modes (long-form, advanced model)
    Pro,
}

/// Request counters for one user in the current window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    /// Cheap-tier request count
    pub cheap: u32,
    /// Pro-tier request count
    pub pro: u32,
}

impl Usage {
    /// Whether both counters are zero
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cheap == 0 && self.pro == 0
    }
}

/// Per-window request budgets
#[derive(Debug, Clone, Copy)]
pub struct QuotaLimits {
    /// Cheap-tier requests allowed per window
    pub cheap: u32,
    /// Pro-tier requests allowed per window
    pub pro: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self { cheap: 25, pro: 10 }
    }
}

/// Shared per-user usage tracker
#[derive(Debug, Clone)]
pub struct UsageTracker {
    limits: QuotaLimits,
    counters: Arc<Mutex<HashMap<i64, Usage>>>,
}

impl UsageTracker {
    /// Create a tracker with the given per-window limits
    #[must_use]
    pub fn new(limits: QuotaLimits) -> Self {
        Self {
            limits,
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The limits this tracker enforces
    #[must_use]
    pub const fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// Count one admitted request against the user's budget
    pub fn record(&self, user_id: i64, tier: Tier) {
        let mut map = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let usage = map.entry(user_id).or_default();
        match tier {
            Tier::Cheap => usage.cheap = usage.cheap.saturating_add(1),
            Tier::Pro => usage.pro = usage.pro.saturating_add(1),
        }
    }

    /// Whether the user has exhausted either budget for this window
    #[must_use]
    pub fn is_limited(&self, user_id: i64) -> bool {
        let map = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let usage = map.get(&user_id).copied().unwrap_or_default();
        usage.cheap >= self.limits.cheap || usage.pro >= self.limits.pro
    }

    /// Remaining (cheap, pro) requests for this window, saturating at zero
    #[must_use]
    pub fn remaining(&self, user_id: i64) -> (u32, u32) {
        let map = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let usage = map.get(&user_id).copied().unwrap_or_default();
        (
            self.limits.cheap.saturating_sub(usage.cheap),
            self.limits.pro.saturating_sub(usage.pro),
        )
    }

    /// Atomically reset the window and return every non-zero delta
    ///
    /// The swap happens under the lock, so increments racing with a drain
    /// land either in the returned deltas or in the fresh window, never both
    /// and never neither.
    #[must_use]
    pub fn drain(&self) -> Vec<(i64, Usage)> {
        let mut map = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *map)
            .into_iter()
            .filter(|(_, usage)| !usage.is_empty())
            .collect()
    }

    /// Merge drained deltas back after a failed persist
    pub fn restore(&self, deltas: &[(i64, Usage)]) {
        let mut map = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        for (user_id, delta) in deltas {
            let usage = map.entry(*user_id).or_default();
            usage.cheap = usage.cheap.saturating_add(delta.cheap);
            usage.pro = usage.pro.saturating_add(delta.pro);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(cheap: u32, pro: u32) -> UsageTracker {
        UsageTracker::new(QuotaLimits { cheap, pro })
    }

    #[test]
    fn unknown_user_has_full_budget() {
        let t = tracker(25, 10);
        assert!(!t.is_limited(1));
        assert_eq!(t.remaining(1), (25, 10));
    }

    #[test]
    fn record_counts_by_tier() {
        let t = tracker(25, 10);
        t.record(1, Tier::Cheap);
        t.record(1, Tier::Cheap);
        t.record(1, Tier::Pro);
        assert_eq!(t.remaining(1), (23, 9));
    }

    #[test]
    fn limited_when_cheap_budget_exhausted() {
        let t = tracker(2, 10);
        t.record(1, Tier::Cheap);
        assert!(!t.is_limited(1));
        t.record(1, Tier::Cheap);
        assert!(t.is_limited(1));
    }

    #[test]
    fn limited_when_pro_budget_exhausted() {
        let t = tracker(25, 1);
        t.record(1, Tier::Pro);
        assert!(t.is_limited(1));
        // Cheap budget untouched but the user is still blocked
        assert_eq!(t.remaining(1), (25, 0));
    }

    #[test]
    fn zero_limits_block_everyone() {
        let t = tracker(0, 0);
        assert!(t.is_limited(42));
    }

    #[test]
    fn users_are_independent() {
        let t = tracker(1, 1);
        t.record(1, Tier::Cheap);
        assert!(t.is_limited(1));
        assert!(!t.is_limited(2));
    }

    #[test]
    fn drain_returns_deltas_and_resets_window() {
        let t = tracker(25, 10);
        t.record(1, Tier::Cheap);
        t.record(1, Tier::Pro);
        t.record(2, Tier::Cheap);

        let mut deltas = t.drain();
        deltas.sort_by_key(|(id, _)| *id);
        assert_eq!(
            deltas,
            vec![
                (1, Usage { cheap: 1, pro: 1 }),
                (2, Usage { cheap: 1, pro: 0 }),
            ]
        );

        // Window reset: budgets are full again
        assert_eq!(t.remaining(1), (25, 10));
        assert!(t.drain().is_empty());
    }

    #[test]
    fn drain_skips_zero_counters() {
        let t = tracker(25, 10);
        t.record(1, Tier::Cheap);
        let _ = t.drain();
        // Second drain sees the map empty, not a zero entry
        assert!(t.drain().is_empty());
    }

    #[test]
    fn restore_merges_into_current_window() {
        let t = tracker(25, 10);
        t.record(1, Tier::Cheap);
        let deltas = t.drain();

        // New traffic arrives while the persist is failing
        t.record(1, Tier::Pro);
        t.restore(&deltas);

        assert_eq!(t.remaining(1), (24, 9));
        let drained = t.drain();
        assert_eq!(drained, vec![(1, Usage { cheap: 1, pro: 1 })]);
    }

    #[test]
    fn drain_restore_drain_loses_nothing() {
        let t = tracker(100, 100);
        for _ in 0..5 {
            t.record(7, Tier::Cheap);
        }
        let deltas = t.drain();
        t.restore(&deltas);
        let again = t.drain();
        assert_eq!(again, vec![(7, Usage { cheap: 5, pro: 0 })]);
    }
}
