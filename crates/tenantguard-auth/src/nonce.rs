//! Nonce store trait and the in-memory TTL implementation.
//!
//! The nonce store is the only shared mutable state in the request pipeline.
//! [`NonceStore`] is a capability trait so multi-instance deployments can back
//! it with a shared store; [`MemoryNonceStore`] is the single-process default.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::AuthError;

/// Result of an atomic nonce check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceCheck {
    /// The nonce was not seen within the window and has now been recorded.
    Fresh,
    /// The nonce was already recorded within the window.
    Replayed,
}

/// Storage for nonces and the time each was first observed.
///
/// Implementations must be safe for concurrent use and must stop returning
/// entries once they are older than their retention window.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Look up when `nonce` was recorded, in epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NonceStore`] if the backing store is unavailable.
    async fn get_nonce(&self, nonce: &str) -> Result<Option<i64>, AuthError>;

    /// Record `nonce` as seen at `seen_at_millis`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NonceStore`] if the backing store is unavailable.
    async fn set_nonce(&self, nonce: &str, seen_at_millis: i64) -> Result<(), AuthError>;

    /// Record `nonce` at `now_millis` unless it was recorded less than
    /// `window_ms` before `now_millis`.
    ///
    /// `window_ms` is the replay retention window. It must be at least twice
    /// the allowed clock skew, or a request signed with a future timestamp
    /// could be replayed after its first record ages out of the window.
    ///
    /// The default implementation is a plain get followed by a set, which
    /// lets two concurrent requests with the same nonce both pass. Stores
    /// with an atomic primitive (compare-and-swap, `SET NX`) should override
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NonceStore`] if the backing store is unavailable.
    async fn check_and_set(
        &self,
        nonce: &str,
        now_millis: i64,
        window_ms: u64,
    ) -> Result<NonceCheck, AuthError> {
        if let Some(seen_at) = self.get_nonce(nonce).await? {
            if within_window(seen_at, now_millis, window_ms) {
                return Ok(NonceCheck::Replayed);
            }
        }
        self.set_nonce(nonce, now_millis).await?;
        Ok(NonceCheck::Fresh)
    }
}

/// Whether a nonce recorded at `seen_at` is still inside the replay window.
///
/// Records from the future (the clock moved backwards) count as inside.
fn within_window(seen_at: i64, now_millis: i64, window_ms: u64) -> bool {
    now_millis <= seen_at || now_millis.abs_diff(seen_at) <= window_ms
}

/// In-memory nonce store with time-based expiry.
///
/// Expired entries are invisible to lookups immediately and are physically
/// removed by [`MemoryNonceStore::purge_expired`], which the server calls
/// periodically. The TTL should be no shorter than the replay window passed
/// to [`NonceStore::check_and_set`].
///
/// # Examples
///
/// ```
/// use tenantguard_auth::nonce::{MemoryNonceStore, NonceCheck, NonceStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryNonceStore::new(300_000);
/// let now = 1_700_000_000_000;
/// assert_eq!(store.check_and_set("abcdefgh", now, 300_000).await.unwrap(), NonceCheck::Fresh);
/// assert_eq!(store.check_and_set("abcdefgh", now + 60_000, 300_000).await.unwrap(), NonceCheck::Replayed);
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryNonceStore {
    entries: DashMap<String, i64>,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl MemoryNonceStore {
    /// Create a store that retains nonces for `ttl_ms` milliseconds.
    #[must_use]
    pub fn new(ttl_ms: i64) -> Self {
        Self::with_clock(ttl_ms, Arc::new(SystemClock))
    }

    /// Create a store that measures expiry against `clock`.
    #[must_use]
    pub fn with_clock(ttl_ms: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms,
            clock,
        }
    }

    /// Retention window in milliseconds.
    #[must_use]
    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// Remove every entry older than the retention window.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.entries.len();
        self.entries.retain(|_, seen_at| !self.is_expired(*seen_at, now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "purged expired nonces");
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, seen_at: i64, now: i64) -> bool {
        now.saturating_sub(seen_at) > self.ttl_ms
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn get_nonce(&self, nonce: &str) -> Result<Option<i64>, AuthError> {
        let now = self.clock.now_millis();
        Ok(self
            .entries
            .get(nonce)
            .map(|entry| *entry.value())
            .filter(|seen_at| !self.is_expired(*seen_at, now)))
    }

    async fn set_nonce(&self, nonce: &str, seen_at_millis: i64) -> Result<(), AuthError> {
        self.entries.insert(nonce.to_owned(), seen_at_millis);
        Ok(())
    }

    async fn check_and_set(
        &self,
        nonce: &str,
        now_millis: i64,
        window_ms: u64,
    ) -> Result<NonceCheck, AuthError> {
        // The shard lock is held across the check and the insert.
        match self.entries.entry(nonce.to_owned()) {
            Entry::Occupied(mut entry) => {
                if within_window(*entry.get(), now_millis, window_ms) {
                    Ok(NonceCheck::Replayed)
                } else {
                    entry.insert(now_millis);
                    Ok(NonceCheck::Fresh)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now_millis);
                Ok(NonceCheck::Fresh)
            }
        }
    }
}
