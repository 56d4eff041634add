//! Readthrough Cache demo
//!
//! Runs the read-through scenario against a simulated user repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use readthrough_cache::cache::fallback_multi;
use readthrough_cache::{CacheConfig, Event, EventBus, LruCache};

/// Emitted with the ids resolved by each repository round trip.
const USERS_LOADED: Event<Vec<u64>> = Event::new("users.loaded");

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u64,
    name: String,
}

/// Main entry point for the cache demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache over a simulated repository
/// 4. Exercise get / get_multi / set / del / has and print the results
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readthrough_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: capacity={}, ttl={}s, cache_empty={}",
        config.capacity, config.ttl, config.cache_empty
    );

    EventBus::global().on(&USERS_LOADED, |ids| info!(?ids, "Users loaded from repository"))?;

    let round_trips = Arc::new(AtomicUsize::new(0));
    let counter = round_trips.clone();
    let repository = fallback_multi(move |ids: Vec<u64>| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            // Ids above 100 do not exist
            let users: HashMap<u64, User> = ids
                .into_iter()
                .filter(|id| *id <= 100)
                .map(|id| {
                    let user = User {
                        id,
                        name: format!("user-{id}"),
                    };
                    (id, user)
                })
                .collect();
            EventBus::global().emit(&USERS_LOADED, users.keys().copied().collect());
            Ok(users)
        }
    });

    let cache: LruCache<u64, User> = LruCache::from_config(&config, Some(repository))?;
    info!("Cache initialized: {:?}", cache);

    let first = cache.get(1).await.into_result()?;
    let again = cache.get(1).await.into_result()?;
    print_json("get(1)", &first)?;
    print_json("get(1) again", &again)?;

    let many = cache.get_multi(&[1, 2, 3, 404]).await.into_result()?;
    print_json("get_multi([1, 2, 3, 404])", &many)?;

    cache
        .set(
            7,
            User {
                id: 7,
                name: "seven".to_string(),
            },
        )
        .await
        .into_result()?;
    print_json("get(7) after set", &cache.get(7).await.into_result()?)?;

    let removed = cache.del(&[1, 2, 99]).await.into_result()?;
    let has_one = cache.has(&1).await.into_result()?;
    info!(removed, has_one, "Deleted entries");

    info!(
        round_trips = round_trips.load(Ordering::SeqCst),
        resident = cache.len().await,
        "Demo complete"
    );
    Ok(())
}

fn print_json<T: Serialize>(label: &str, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(value).context("failed to serialize result")?;
    println!("{label}: {json}");
    Ok(())
}
