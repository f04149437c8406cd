//! Recommendation response cache
//!
//! Memoizes ordered recommendation lists keyed by (user id, top-n). Hits
//! return the stored list prefix-trimmed to the requested length; entries are
//! evicted by a background sweep when their owning user has gone unaccessed
//! past the aging threshold.
//!
//! Concurrent misses for the same key coalesce: exactly one caller performs
//! the fan-out while the rest wait on its `OnceCell`. A leader that fails (or
//! is cancelled by client disconnect) leaves the cell empty, so the cache is
//! never populated from an incomplete computation.

use crate::snapshot::CacheSnapshotEntry;
use cinegrid_core::types::{RecommendationItem, UserId};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info};

pub type CacheKey = (UserId, usize);

/// Result of a cache-or-compute round.
#[derive(Debug, Clone)]
pub struct CacheOutcome {
    pub items: Vec<RecommendationItem>,
    /// True when the list came from the cache or from a coalesced in-flight
    /// computation rather than this caller's own fan-out.
    pub cache_hit: bool,
    /// Workers consulted by this caller; 0 on a hit.
    pub nodes_used: usize,
}

pub struct RecommendationCache {
    entries: RwLock<HashMap<CacheKey, Vec<RecommendationItem>>>,
    last_access: RwLock<HashMap<UserId, Instant>>,
    inflight: Mutex<HashMap<CacheKey, Arc<OnceCell<Vec<RecommendationItem>>>>>,
    max_age: Duration,
}

impl RecommendationCache {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            last_access: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    /// Fetch a stored list, trimmed to the requested top-n. Touches the
    /// owning user's access time on a hit.
    pub async fn get(&self, key: CacheKey) -> Option<Vec<RecommendationItem>> {
        let found = {
            let entries = self.entries.read().await;
            entries.get(&key).map(|stored| {
                if stored.len() > key.1 {
                    stored[..key.1].to_vec()
                } else {
                    stored.clone()
                }
            })
        };

        if found.is_some() {
            debug!(user_id = key.0, top_n = key.1, "cache hit");
            self.touch(key.0).await;
        }
        found
    }

    /// Store a computed list. The write section is short; callers must not
    /// hold the lock across a fan-out.
    pub async fn put(&self, key: CacheKey, items: Vec<RecommendationItem>) {
        {
            let mut entries = self.entries.write().await;
            entries.insert(key, items);
        }
        self.touch(key.0).await;
        debug!(user_id = key.0, top_n = key.1, "recommendations cached");
    }

    /// Cache-or-compute with per-key singleflight.
    ///
    /// `compute` is polled by at most one concurrent caller per key (the
    /// rest never poll theirs); the cache is written by that leader before
    /// its waiters resume. The leader reports its own node count; waiters
    /// report a hit.
    pub async fn get_or_compute<Fut, E>(
        &self,
        key: CacheKey,
        compute: Fut,
    ) -> Result<CacheOutcome, E>
    where
        Fut: Future<Output = Result<(Vec<RecommendationItem>, usize), E>>,
    {
        if let Some(items) = self.get(key).await {
            return Ok(CacheOutcome {
                items,
                cache_hit: true,
                nodes_used: 0,
            });
        }

        let cell = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key)
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let mut leader_nodes: Option<usize> = None;
        let leader_nodes_ref = &mut leader_nodes;
        let result = cell
            .get_or_try_init(move || async move {
                let (items, nodes_used) = compute.await?;
                self.put(key, items.clone()).await;
                *leader_nodes_ref = Some(nodes_used);
                Ok(items)
            })
            .await
            .cloned();

        // Drop the coalescing point so later requests see the cache (and its
        // eviction) instead of a stale cell.
        {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(&key) {
                if Arc::ptr_eq(existing, &cell) {
                    inflight.remove(&key);
                }
            }
        }

        let items = result?;
        Ok(match leader_nodes {
            Some(nodes_used) => CacheOutcome {
                items,
                cache_hit: false,
                nodes_used,
            },
            None => CacheOutcome {
                items,
                cache_hit: true,
                nodes_used: 0,
            },
        })
    }

    /// Evict every entry whose owning user has not been accessed within the
    /// aging threshold. Returns the number of entries removed.
    pub async fn sweep(&self) -> usize {
        let stale: HashSet<UserId> = {
            let access = self.last_access.read().await;
            access
                .iter()
                .filter(|(_, touched)| touched.elapsed() > self.max_age)
                .map(|(user_id, _)| *user_id)
                .collect()
        };

        if stale.is_empty() {
            return 0;
        }

        let mut removed = 0usize;
        {
            let mut entries = self.entries.write().await;
            entries.retain(|(user_id, _), _| {
                if stale.contains(user_id) {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        {
            let mut access = self.last_access.write().await;
            for user_id in &stale {
                access.remove(user_id);
            }
        }

        info!(entries_removed = removed, users = stale.len(), "cache sweep complete");
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Entries in deterministic key order, for snapshot persistence.
    pub async fn export_entries(&self) -> Vec<CacheSnapshotEntry> {
        let entries = self.entries.read().await;
        let mut exported: Vec<CacheSnapshotEntry> = entries
            .iter()
            .map(|(&(user_id, top_n), items)| CacheSnapshotEntry {
                user_id,
                top_n,
                items: items.clone(),
            })
            .collect();
        exported.sort_by_key(|entry| (entry.user_id, entry.top_n));
        exported
    }

    /// Restore entries from a snapshot, marking their users freshly accessed.
    pub async fn restore(&self, entries: Vec<CacheSnapshotEntry>) {
        for entry in entries {
            self.put((entry.user_id, entry.top_n), entry.items).await;
        }
    }

    async fn touch(&self, user_id: UserId) {
        let mut access = self.last_access.write().await;
        access.insert(user_id, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn items(n: usize) -> Vec<RecommendationItem> {
        (0..n as u32)
            .map(|i| RecommendationItem {
                movie_id: i + 1,
                title: format!("Movie {}", i + 1),
                predicted_score: 5.0 - i as f64 * 0.1,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_store_then_fetch_round_trip() {
        let cache = RecommendationCache::new(Duration::from_secs(3600));

        cache.put((7, 10), items(10)).await;
        let fetched = cache.get((7, 10)).await.unwrap();
        assert_eq!(fetched, items(10));
    }

    #[tokio::test]
    async fn test_fetch_trims_to_requested_top_n() {
        let cache = RecommendationCache::new(Duration::from_secs(3600));

        // A restored snapshot can hold more items than a later request asks
        // for under the same key shape.
        cache.put((7, 5), items(10)).await;
        let fetched = cache.get((7, 5)).await.unwrap();
        assert_eq!(fetched.len(), 5);
        assert_eq!(fetched, items(10)[..5].to_vec());
    }

    #[tokio::test]
    async fn test_fetch_never_extends() {
        let cache = RecommendationCache::new(Duration::from_secs(3600));

        cache.put((7, 10), items(3)).await;
        let fetched = cache.get((7, 10)).await.unwrap();
        assert_eq!(fetched.len(), 3);
    }

    #[tokio::test]
    async fn test_miss_is_none() {
        let cache = RecommendationCache::new(Duration::from_secs(3600));
        assert!(cache.get((1, 10)).await.is_none());
    }

    #[tokio::test]
    async fn test_keys_distinguish_top_n() {
        let cache = RecommendationCache::new(Duration::from_secs(3600));

        cache.put((7, 5), items(5)).await;
        assert!(cache.get((7, 10)).await.is_none());
        assert!(cache.get((7, 5)).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_evicts_stale_users_only() {
        let cache = RecommendationCache::new(Duration::from_millis(50));

        cache.put((1, 10), items(10)).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.put((2, 10), items(10)).await;

        let removed = cache.sweep().await;
        assert_eq!(removed, 1);
        assert!(cache.get((1, 10)).await.is_none());
        assert!(cache.get((2, 10)).await.is_some());
    }

    #[tokio::test]
    async fn test_access_refreshes_age() {
        let cache = RecommendationCache::new(Duration::from_millis(80));

        cache.put((1, 10), items(10)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Reading keeps the user fresh.
        assert!(cache.get((1, 10)).await.is_some());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.sweep().await, 0);
        assert!(cache.get((1, 10)).await.is_some());
    }

    #[tokio::test]
    async fn test_singleflight_coalesces_concurrent_misses() {
        let cache = Arc::new(RecommendationCache::new(Duration::from_secs(3600)));
        let computations = Arc::new(AtomicUsize::new(0));

        let callers = (0..8).map(|_| {
            let cache = Arc::clone(&cache);
            let computations = Arc::clone(&computations);
            async move {
                let computations = Arc::clone(&computations);
                cache
                    .get_or_compute((42, 10), async move {
                        computations.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok::<_, Infallible>((items(10), 3))
                    })
                    .await
                    .unwrap()
            }
        });

        let outcomes = futures::future::join_all(callers).await;

        assert_eq!(computations.load(Ordering::SeqCst), 1);

        let leaders: Vec<_> = outcomes.iter().filter(|o| !o.cache_hit).collect();
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].nodes_used, 3);
        for outcome in &outcomes {
            assert_eq!(outcome.items, items(10));
            if outcome.cache_hit {
                assert_eq!(outcome.nodes_used, 0);
            }
        }
    }

    #[tokio::test]
    async fn test_failed_leader_does_not_populate_cache() {
        let cache = RecommendationCache::new(Duration::from_secs(3600));

        let result = cache
            .get_or_compute((1, 10), async { Err::<(Vec<_>, usize), &str>("boom") })
            .await;
        assert!(result.is_err());
        assert!(cache.get((1, 10)).await.is_none());

        // The key is recomputable afterwards.
        let outcome = cache
            .get_or_compute((1, 10), async { Ok::<_, Infallible>((items(2), 1)) })
            .await
            .unwrap();
        assert!(!outcome.cache_hit);
        assert_eq!(outcome.items.len(), 2);
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let cache = RecommendationCache::new(Duration::from_secs(3600));
        let recomputes = AtomicUsize::new(0);

        let first = cache
            .get_or_compute((9, 10), async {
                recomputes.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>((items(10), 2))
            })
            .await
            .unwrap();
        assert!(!first.cache_hit);
        assert_eq!(first.nodes_used, 2);
        assert_eq!(recomputes.load(Ordering::SeqCst), 1);

        let second = cache
            .get_or_compute((9, 10), async {
                recomputes.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>((items(1), 1))
            })
            .await
            .unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.nodes_used, 0);
        assert_eq!(second.items, first.items);
        // The second future is never polled.
        assert_eq!(recomputes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_export_restore_round_trip() {
        let cache = RecommendationCache::new(Duration::from_secs(3600));
        cache.put((2, 10), items(10)).await;
        cache.put((1, 5), items(5)).await;

        let exported = cache.export_entries().await;
        assert_eq!(exported.len(), 2);
        // Deterministic key order.
        assert_eq!(exported[0].user_id, 1);
        assert_eq!(exported[1].user_id, 2);

        let restored = RecommendationCache::new(Duration::from_secs(3600));
        restored.restore(exported).await;
        assert_eq!(restored.len().await, 2);
        assert_eq!(restored.get((1, 5)).await.unwrap(), items(5));
    }
}
