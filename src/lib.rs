//! Readthrough Cache - A generic in-process read-through cache
//!
//! Provides a thread-safe cache with TTL expiration, LRU eviction and batched
//! fallback loading of misses.

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod timex;

pub use cache::{CacheResult, LruCache};
pub use config::CacheConfig;
pub use error::CacheError;
pub use event::{Event, EventBus};
