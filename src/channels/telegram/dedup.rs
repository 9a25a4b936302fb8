//! Telegram update deduplication cache

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default dedup TTL (5 minutes)
const DEDUP_TTL_SECS: u64 = 300;

/// Maximum dedup cache entries
const DEDUP_MAX_ENTRIES: usize = 2000;

/// Telegram update deduplication cache
///
/// Prevents processing the same polling update twice when the offset resets
/// (restart races, Telegram redelivery). TTL-based eviction with a hard cap
/// on entries.
#[derive(Debug)]
pub struct UpdateDedup {
    seen: HashMap<i64, Instant>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for UpdateDedup {
    fn default() -> Self {
        Self {
            seen: HashMap::new(),
            ttl: Duration::from_secs(DEDUP_TTL_SECS),
            max_entries: DEDUP_MAX_ENTRIES,
        }
    }
}

impl UpdateDedup {
    /// Check if the update id has been seen within the TTL
    ///
    /// Returns `true` for a duplicate; records the id and returns `false` on
    /// first sight.
    pub fn is_duplicate(&mut self, update_id: i64) -> bool {
        let now = Instant::now();

        // Evict expired entries when at capacity
        if self.seen.len() >= self.max_entries {
            self.seen.retain(|_, ts| now.duration_since(*ts) < self.ttl);
        }

        // If still at capacity after eviction, drop the oldest entry
        if self.seen.len() >= self.max_entries {
            if let Some(oldest) = self
                .seen
                .iter()
                .min_by_key(|(_, ts)| *ts)
                .map(|(id, _)| *id)
            {
                self.seen.remove(&oldest);
            }
        }

        if let Some(ts) = self.seen.get(&update_id) {
            if now.duration_since(*ts) < self.ttl {
                return true;
            }
        }

        self.seen.insert(update_id, now);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sight_is_not_a_duplicate() {
        let mut dedup = UpdateDedup::default();
        assert!(!dedup.is_duplicate(1));
    }

    #[test]
    fn second_sight_is_a_duplicate() {
        let mut dedup = UpdateDedup::default();
        assert!(!dedup.is_duplicate(1));
        assert!(dedup.is_duplicate(1));
    }

    #[test]
    fn distinct_ids_are_independent() {
        let mut dedup = UpdateDedup::default();
        assert!(!dedup.is_duplicate(1));
        assert!(!dedup.is_duplicate(2));
        assert!(dedup.is_duplicate(2));
    }

    #[test]
    fn cap_evicts_oldest_entry() {
        let mut dedup = UpdateDedup {
            seen: HashMap::new(),
            ttl: Duration::from_secs(300),
            max_entries: 2,
        };

        assert!(!dedup.is_duplicate(1));
        assert!(!dedup.is_duplicate(2));
        // Inserting a third id evicts the oldest; the cache never exceeds cap
        assert!(!dedup.is_duplicate(3));
        assert!(dedup.seen.len() <= 2);
    }

    #[test]
    fn expired_entries_are_forgotten() {
        let mut dedup = UpdateDedup {
            seen: HashMap::new(),
            ttl: Duration::from_secs(0),
            max_entries: 10,
        };

        assert!(!dedup.is_duplicate(1));
        // Zero TTL expires immediately
        assert!(!dedup.is_duplicate(1));
    }
}
