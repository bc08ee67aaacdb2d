//! Process-wide chat session store
//!
//! Maps a user id to its live [`SessionHandle`]. Every operation runs inside
//! one mutex critical section with no await, so lookups, first-contact
//! creation and resets are atomic with respect to each other. Sessions are
//! bounded by an LRU capacity and an optional idle TTL.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::ai::SessionHandle;
use crate::config::SessionConfig;

struct Slot {
    session: SessionHandle,
    last_used: Instant,
}

impl Slot {
    fn is_expired(&self, now: Instant, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.last_used) >= ttl)
    }
}

/// Session store with LRU eviction and idle expiry
pub struct SessionStore {
    slots: Mutex<LruCache<String, Slot>>,
    idle_ttl: Option<Duration>,
}

impl SessionStore {
    /// Create a store holding at most `capacity` sessions
    #[must_use]
    pub fn new(capacity: NonZeroUsize, idle_ttl: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            idle_ttl,
        }
    }

    /// Create a store from configuration (capacity is clamped to at least 1)
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            NonZeroUsize::new(config.max_sessions).unwrap_or(NonZeroUsize::MIN),
            config.idle_ttl,
        )
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live session for `key`, if any; refreshes its idle timer
    #[must_use]
    pub fn get(&self, key: &str) -> Option<SessionHandle> {
        let mut slots = self.lock();
        let now = Instant::now();

        if slots.peek(key)?.is_expired(now, self.idle_ttl) {
            slots.pop(key);
            return None;
        }

        let slot = slots.get_mut(key)?;
        slot.last_used = now;
        Some(slot.session.clone())
    }

    /// Existing live session for `key`, or one built by `create` and stored
    ///
    /// `create` runs under the store lock, so concurrent first contacts for
    /// the same key produce exactly one session.
    pub fn get_or_insert_with<F>(&self, key: &str, create: F) -> SessionHandle
    where
        F: FnOnce() -> SessionHandle,
    {
        let mut slots = self.lock();
        let now = Instant::now();

        if let Some(slot) = slots.get_mut(key) {
            if !slot.is_expired(now, self.idle_ttl) {
                slot.last_used = now;
                return slot.session.clone();
            }
            tracing::debug!(user = key, "session expired, starting a new one");
        }

        let session = create();
        Self::install(&mut slots, key, session.clone(), now);
        session
    }

    /// Install `session` for `key`, discarding any previous one
    pub fn replace(&self, key: &str, session: SessionHandle) {
        let mut slots = self.lock();
        Self::install(&mut slots, key, session, Instant::now());
    }

    fn install(slots: &mut LruCache<String, Slot>, key: &str, session: SessionHandle, now: Instant) {
        let slot = Slot {
            session,
            last_used: now,
        };
        if let Some((evicted, _)) = slots.push(key.to_string(), slot)
            && evicted != key
        {
            tracing::debug!(user = %evicted, "session evicted (capacity)");
        }
    }

    /// Drop the session for `key`
    pub fn remove(&self, key: &str) -> Option<SessionHandle> {
        self.lock().pop(key).map(|slot| slot.session)
    }

    /// Drop every idle-expired session, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };

        let mut slots = self.lock();
        let now = Instant::now();
        let expired: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.is_expired(now, Some(ttl)))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            slots.pop(key);
        }
        expired.len()
    }

    /// Number of stored sessions (expired ones included until purged)
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
