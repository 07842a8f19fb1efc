//! Replay and freshness checks for HMAC-signed requests.
//!
//! [`ReplayGuard`] runs the cheap checks (algorithm, timestamp, skew, nonce
//! shape, nonce freshness) before the caller spends an HMAC computation on the
//! signature. The nonce is recorded before the signature is known to be valid,
//! so unauthenticated callers can occupy store capacity until entries expire.

use std::sync::Arc;

use tracing::debug;

use crate::error::AuthError;
use crate::nonce::{NonceCheck, NonceStore};

/// The only signature algorithm accepted in `X-Signature-Alg`.
pub const SUPPORTED_ALGORITHM: &str = "sha256";

/// Minimum nonce length in characters.
pub const MIN_NONCE_LEN: usize = 8;

/// Freshness and replay policy for signed requests.
#[derive(Clone)]
pub struct ReplayGuard {
    store: Arc<dyn NonceStore>,
    allowed_skew_ms: u64,
    replay_window_ms: u64,
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("store", &"...")
            .field("allowed_skew_ms", &self.allowed_skew_ms)
            .field("replay_window_ms", &self.replay_window_ms)
            .finish()
    }
}

impl ReplayGuard {
    /// Create a guard over `store` tolerating `allowed_skew_ms` of clock skew
    /// and rejecting a nonce seen within the last `replay_window_ms`.
    ///
    /// Negative values are treated as zero. The window is raised to twice the
    /// skew: a request timestamped `skew` in the future passes the skew check
    /// until `2 * skew` after it was first accepted.
    pub fn new(store: Arc<dyn NonceStore>, allowed_skew_ms: i64, replay_window_ms: i64) -> Self {
        let allowed_skew_ms = allowed_skew_ms.max(0).unsigned_abs();
        Self {
            store,
            allowed_skew_ms,
            replay_window_ms: replay_window_ms
                .max(0)
                .unsigned_abs()
                .max(allowed_skew_ms.saturating_mul(2)),
        }
    }

    /// Allowed clock skew in milliseconds.
    #[must_use]
    pub fn allowed_skew_ms(&self) -> u64 {
        self.allowed_skew_ms
    }

    /// How long an accepted nonce blocks replays, in milliseconds.
    #[must_use]
    pub fn replay_window_ms(&self) -> u64 {
        self.replay_window_ms
    }

    /// Check a signed request's algorithm, timestamp, and nonce, and record
    /// the nonce when it is fresh.
    ///
    /// Returns the parsed timestamp.
    ///
    /// # Errors
    ///
    /// In order of evaluation: [`AuthError::UnsupportedAlgorithm`],
    /// [`AuthError::InvalidTimestamp`], [`AuthError::ClockSkewExceeded`],
    /// [`AuthError::InvalidNonce`], [`AuthError::ReplayDetected`], or
    /// [`AuthError::NonceStore`] if the store fails.
    pub async fn check(
        &self,
        nonce: &str,
        timestamp: &str,
        algorithm: &str,
        now_millis: i64,
    ) -> Result<i64, AuthError> {
        if algorithm != SUPPORTED_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
        }

        let timestamp: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| AuthError::InvalidTimestamp)?;

        let skew = now_millis.abs_diff(timestamp);
        if skew > self.allowed_skew_ms {
            debug!(skew_ms = skew, allowed_skew_ms = self.allowed_skew_ms, "timestamp outside allowed skew");
            return Err(AuthError::ClockSkewExceeded);
        }

        if nonce.chars().count() < MIN_NONCE_LEN {
            return Err(AuthError::InvalidNonce);
        }

        match self
            .store
            .check_and_set(nonce, now_millis, self.replay_window_ms)
            .await?
        {
            NonceCheck::Fresh => Ok(timestamp),
            NonceCheck::Replayed => {
                debug!(nonce, "nonce already seen within replay window");
                Err(AuthError::ReplayDetected)
            }
        }
    }
}
