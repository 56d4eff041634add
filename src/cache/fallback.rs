//! Fallback Module
//!
//! Function types used to resolve cache misses from an authoritative source.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

/// Batched miss resolver bound to a cache at construction.
///
/// Receives the missing keys and returns whatever it could resolve. Keys
/// absent from the returned map are treated as unresolved.
pub type FallbackMulti<K, V> =
    Arc<dyn Fn(Vec<K>) -> BoxFuture<'static, anyhow::Result<HashMap<K, V>>> + Send + Sync>;

/// Predicate marking a resolved value as empty.
pub type EmptyCheck<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Boxes an async closure into a [`FallbackMulti`].
pub fn fallback_multi<K, V, F, Fut>(f: F) -> FallbackMulti<K, V>
where
    F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<HashMap<K, V>>> + Send + 'static,
{
    Arc::new(move |keys| f(keys).boxed())
}

/// Resolves a single key through a batched resolver as a one-element batch.
pub async fn resolve_one<K, V>(fallback: FallbackMulti<K, V>, key: K) -> anyhow::Result<Option<V>>
where
    K: Eq + Hash + Clone,
{
    let mut resolved = fallback(vec![key.clone()]).await?;
    Ok(resolved.remove(&key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> FallbackMulti<u32, String> {
        fallback_multi(|keys: Vec<u32>| async move {
            Ok(keys
                .into_iter()
                .filter(|k| k % 2 == 0)
                .map(|k| (k, format!("v{k}")))
                .collect())
        })
    }

    #[tokio::test]
    async fn test_resolve_one_hit() {
        let value = resolve_one(echo(), 4).await.unwrap();
        assert_eq!(value.as_deref(), Some("v4"));
    }

    #[tokio::test]
    async fn test_resolve_one_unresolved() {
        let value = resolve_one(echo(), 3).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_resolve_one_error() {
        let failing: FallbackMulti<u32, String> =
            fallback_multi(|_keys: Vec<u32>| async { Err(anyhow::anyhow!("unavailable")) });

        let err = resolve_one(failing, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "unavailable");
    }
}
