//! Latest-known snapshot per resource, with a fixed time-to-live.
//!
//! Entries expire a fixed duration after their last write; reads do not
//! extend them. An expired entry reads as a miss even before the sweeper
//! has reclaimed it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::CacheError;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Concurrent TTL cache keyed by `"{resource_type}:{resource_id}"`.
///
/// Cloning is cheap and shares the underlying map.
#[derive(Debug, Clone)]
pub struct ResourceCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResourceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `payload` for a resource, replacing any previous value and
    /// restarting its TTL. Ignored when both `kind` and `id` are empty.
    pub fn put(&self, kind: &str, id: &str, payload: Value) {
        if kind.is_empty() && id.is_empty() {
            return;
        }
        self.entries.insert(
            cache_key(kind, id),
            CacheEntry {
                payload,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Raw stored payload, or `None` if absent or expired.
    pub fn get_raw(&self, kind: &str, id: &str) -> Option<Value> {
        let key = cache_key(kind, id);
        let now = Instant::now();
        {
            let entry = self.entries.get(&key)?;
            if !entry.is_expired(now) {
                return Some(entry.payload.clone());
            }
        }
        self.entries.remove_if(&key, |_, e| e.is_expired(now));
        None
    }

    /// Read a resource as `T`.
    ///
    /// `Ok(None)` is a miss. A hit whose payload cannot be re-read as `T`
    /// is a [`CacheError::Coercion`].
    pub fn get<T: DeserializeOwned>(&self, kind: &str, id: &str) -> Result<Option<T>, CacheError> {
        let Some(payload) = self.get_raw(kind, id) else {
            return Ok(None);
        };
        serde_json::from_value(payload)
            .map(Some)
            .map_err(|source| CacheError::Coercion {
                key: cache_key(kind, id),
                source,
            })
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Spawn a task that purges expired entries every `every`.
    ///
    /// The task stops on its own once the last clone of the cache is dropped.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let entries: Weak<DashMap<String, CacheEntry>> = Arc::downgrade(&self.entries);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(entries) = entries.upgrade() else {
                    break;
                };
                let removed = purge(&entries);
                if removed > 0 {
                    tracing::debug!(removed, remaining = entries.len(), "cache sweep");
                }
            }
        })
    }
}

fn purge(entries: &DashMap<String, CacheEntry>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, e| !e.is_expired(now));
    before.saturating_sub(entries.len())
}

fn cache_key(kind: &str, id: &str) -> String {
    format!("{kind}:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(300);

    #[derive(Debug, Deserialize, PartialEq)]
    struct Container {
        id: String,
        state: String,
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl() {
        let cache = ResourceCache::new(TTL);
        cache.put("container", "1i1", json!({"id": "1i1", "state": "running"}));

        tokio::time::advance(Duration::from_secs(299)).await;

        let got: Option<Container> = cache.get("container", "1i1").unwrap();
        assert_eq!(
            got,
            Some(Container {
                id: "1i1".into(),
                state: "running".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn miss_after_ttl() {
        let cache = ResourceCache::new(TTL);
        cache.put("container", "1i1", json!({"id": "1i1", "state": "running"}));

        tokio::time::advance(TTL).await;

        let got: Option<Container> = cache.get("container", "1i1").unwrap();
        assert!(got.is_none());
        // the lazy read reclaimed the entry
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reads_do_not_extend_ttl() {
        let cache = ResourceCache::new(TTL);
        cache.put("stack", "1st1", json!({"id": "1st1"}));
        tokio::time::advance(Duration::from_secs(200)).await;
        assert!(cache.get_raw("stack", "1st1").is_some());
        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(cache.get_raw("stack", "1st1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn write_restarts_ttl() {
        let cache = ResourceCache::new(TTL);
        cache.put("stack", "1st1", json!({"v": 1}));
        tokio::time::advance(Duration::from_secs(200)).await;
        cache.put("stack", "1st1", json!({"v": 2}));
        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(cache.get_raw("stack", "1st1"), Some(json!({"v": 2})));
    }

    #[test]
    fn empty_key_is_never_stored() {
        let cache = ResourceCache::new(TTL);
        cache.put("", "", json!({"id": "x"}));
        assert!(cache.is_empty());
        assert!(cache.get_raw("", "").is_none());
    }

    #[test]
    fn partial_key_is_stored() {
        let cache = ResourceCache::new(TTL);
        cache.put("host", "", json!({"id": ""}));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn coercion_failure_is_not_a_miss() {
        let cache = ResourceCache::new(TTL);
        cache.put("container", "1i1", json!({"id": 12}));
        let err = cache.get::<Container>("container", "1i1").unwrap_err();
        let CacheError::Coercion { key, .. } = err;
        assert_eq!(key, "container:1i1");
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_removes_only_stale() {
        let cache = ResourceCache::new(TTL);
        cache.put("stack", "old", json!({}));
        tokio::time::advance(Duration::from_secs(250)).await;
        cache.put("stack", "new", json!({}));
        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_raw("stack", "new").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_reclaims_in_background() {
        let cache = ResourceCache::new(Duration::from_secs(10));
        let sweeper = cache.spawn_sweeper(Duration::from_secs(30));
        cache.put("stack", "1st1", json!({}));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(cache.is_empty());

        drop(cache);
        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert!(sweeper.is_finished());
    }
}
