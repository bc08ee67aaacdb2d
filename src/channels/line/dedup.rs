//! Redelivered webhook event deduplication

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;

/// How long a webhook event id is remembered (5 minutes)
const DEDUP_TTL_SECS: u64 = 300;

/// Maximum remembered event ids
const DEDUP_MAX_ENTRIES: usize = 2000;

/// Remembers recently handled `webhookEventId`s
///
/// LINE retries deliveries it believes failed and marks them with
/// `deliveryContext.isRedelivery`. Ids older than the TTL count as unseen;
/// at capacity the least recently seen id is evicted in O(1).
#[derive(Debug)]
pub struct EventDedup {
    seen: LruCache<String, Instant>,
    ttl: Duration,
}

impl Default for EventDedup {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEDUP_TTL_SECS),
            NonZeroUsize::new(DEDUP_MAX_ENTRIES).unwrap_or(NonZeroUsize::MIN),
        )
    }
}

impl EventDedup {
    #[must_use]
    pub fn new(ttl: Duration, max_entries: NonZeroUsize) -> Self {
        Self {
            seen: LruCache::new(max_entries),
            ttl,
        }
    }

    /// Record `event_id`, returning `true` if it was already seen within the TTL
    pub fn is_duplicate(&mut self, event_id: &str) -> bool {
        let now = Instant::now();

        match self.seen.get_mut(event_id) {
            Some(seen_at) if now.duration_since(*seen_at) < self.ttl => true,
            Some(seen_at) => {
                *seen_at = now;
                false
            }
            None => {
                self.seen.put(event_id.to_string(), now);
                false
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn first_sight_is_not_duplicate() {
        let mut dedup = EventDedup::default();
        assert!(!dedup.is_duplicate("01HXYZ"));
        assert!(dedup.is_duplicate("01HXYZ"));
        assert!(!dedup.is_duplicate("01HABC"));
    }

    #[test]
    fn entries_expire() {
        let mut dedup = EventDedup::new(Duration::from_millis(20), cap(10));
        assert!(!dedup.is_duplicate("e1"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!dedup.is_duplicate("e1"));
        assert!(dedup.is_duplicate("e1"));
    }

    #[test]
    fn capacity_is_bounded() {
        let mut dedup = EventDedup::new(Duration::from_secs(60), cap(3));
        for id in ["a", "b", "c", "d", "e"] {
            dedup.is_duplicate(id);
        }
        assert_eq!(dedup.len(), 3);
        assert!(dedup.is_duplicate("e"));
        assert!(!dedup.is_duplicate("a"), "oldest id should have been evicted");
    }

    #[test]
    fn recently_seen_ids_survive_eviction() {
        let mut dedup = EventDedup::new(Duration::from_secs(60), cap(2));
        dedup.is_duplicate("a");
        dedup.is_duplicate("b");
        // Seeing "a" again makes "b" the eviction candidate
        assert!(dedup.is_duplicate("a"));
        dedup.is_duplicate("c");

        assert!(dedup.is_duplicate("a"));
        assert!(!dedup.is_duplicate("b"));
    }

    #[test]
    fn full_cache_stays_fast() {
        let mut dedup = EventDedup::new(Duration::from_secs(60), cap(2000));
        let started = Instant::now();
        for i in 0..50_000 {
            dedup.is_duplicate(&format!("event-{i}"));
        }
        assert_eq!(dedup.len(), 2000);
        assert!(started.elapsed() < Duration::from_secs(5), "{:?}", started.elapsed());
    }
}
