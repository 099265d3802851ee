use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Session-lifetime map shared between the fetcher and the projector.
/// Entries are never expired.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let cache = self.inner.lock().await;
        let value = cache.get(key).cloned();
        if value.is_some() {
            debug!("Cache HIT");
        } else {
            debug!("Cache MISS");
        }
        value
    }

    /// Inserts every entry under a single lock, so readers see all or none.
    pub async fn extend<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut cache = self.inner.lock().await;
        let before = cache.len();
        cache.extend(entries);
        debug!(added = cache.len() - before, "Cache PUT batch");
    }

    pub async fn snapshot(&self) -> HashMap<K, V> {
        self.inner.lock().await.clone()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_get_after_extend() {
        let cache = Cache::<String, i32>::new();

        // Initially, cache is empty
        assert!(cache.get(&"key1".to_string()).await.is_none());
        assert!(cache.snapshot().await.is_empty());

        cache.extend([("key1".to_string(), 123)]).await;

        assert_eq!(cache.get(&"key1".to_string()).await, Some(123));
        assert!(cache.get(&"key2".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_extend_merges_and_overwrites() {
        let cache = Cache::<&'static str, f64>::new();
        cache.extend([("a", 1.0)]).await;

        cache.extend([("a", 2.0), ("b", 3.0)]).await;

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("a"), Some(&2.0));
        assert_eq!(snapshot.get("b"), Some(&3.0));
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = Cache::<u8, u8>::new();
        let other = cache.clone();
        other.extend([(1, 10)]).await;
        assert_eq!(cache.get(&1).await, Some(10));
    }
}
