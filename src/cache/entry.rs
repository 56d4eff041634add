//! Cache Entry Module
//!
//! Defines the expiry-stamped envelope stored for every cached key.

use std::time::Duration;

use chrono::Utc;

// == Cache Entry ==
/// A cached value together with its absolute expiry time.
///
/// `value` is `None` for a negative entry: the fallback resolved nothing for
/// the key and empty results are being cached.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: Option<V>,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry expiring `ttl` from now.
    pub fn new(value: Option<V>, ttl: Duration) -> Self {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            value,
            expires_at: current_timestamp().saturating_add(ttl_secs),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current second reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        current_timestamp() >= self.expires_at
    }

    /// Returns remaining TTL in seconds, zero once expired.
    pub fn ttl_remaining(&self) -> u64 {
        u64::try_from(self.expires_at - current_timestamp()).unwrap_or(0)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}
