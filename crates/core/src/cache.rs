use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;

/// Key → value map where every entry expires `ttl` after it was stored.
///
/// Expired entries are dropped on lookup of their key and swept on every insert, so the map
/// never holds more than the entries stored within one `ttl`.
/// The `*_at` variants take the current time explicitly; the plain ones use `Utc::now()`.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: tokio::sync::Mutex<HashMap<K, CachedValue<V>>>,
}

#[derive(Debug, Clone)]
struct CachedValue<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Utc::now()).await
    }

    pub async fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let mut guard = self.entries.lock().await;
        match guard.get(key) {
            Some(cached) if now < cached.expires_at => Some(cached.value.clone()),
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Utc::now()).await
    }

    /// Stores `value` and drops every entry already expired at `now`.
    pub async fn insert_at(&self, key: K, value: V, now: DateTime<Utc>) {
        let expires_at = now + self.ttl;
        let mut guard = self.entries.lock().await;
        guard.retain(|_, cached| now < cached.expires_at);
        guard.insert(key, CachedValue { value, expires_at });
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Entry count, including expired entries not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
