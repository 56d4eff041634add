//! Cache Module
//!
//! Provides an in-memory read-through cache with TTL expiration, LRU eviction
//! and batched fallback loading.

mod entry;
mod fallback;
mod lru;
mod result;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use fallback::{fallback_multi, resolve_one, EmptyCheck, FallbackMulti};
pub use lru::LruStore;
pub use result::CacheResult;
pub use store::{CacheBuilder, LruCache};
