//! Raw-input memoisation per share key.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

use super::{MatchSource, StorageError};
use crate::models::PlayerMatches;

type Slot = Arc<OnceCell<Arc<Vec<PlayerMatches>>>>;

/// Loads each share key from the source at most once.
///
/// Only the raw records are kept; callers run the pipeline on every request.
/// Failed loads are not cached.
pub struct MatchCache {
    source: Arc<dyn MatchSource>,
    slots: RwLock<HashMap<String, Slot>>,
}

impl MatchCache {
    pub fn new(source: Arc<dyn MatchSource>) -> Self {
        Self {
            source,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, share_key: &str) -> Result<Arc<Vec<PlayerMatches>>, StorageError> {
        let slot = self.slot(share_key).await;
        if let Some(hit) = slot.get() {
            debug!(share_key, "Match cache hit");
            return Ok(Arc::clone(hit));
        }

        // Loads of one key are serialised by its cell, not by the map lock.
        let loaded = slot
            .get_or_try_init(|| async {
                debug!(share_key, "Match cache miss");
                self.source.load(share_key).await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(loaded))
    }

    async fn slot(&self, share_key: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(share_key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(share_key.to_string()).or_default())
    }

    /// Number of share keys loaded successfully.
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MatchSource for CountingSource {
        async fn load(&self, share_key: &str) -> Result<Vec<PlayerMatches>, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if share_key == "missing" {
                return Err(StorageError::NotFound(share_key.to_string()));
            }
            Ok(vec![PlayerMatches::new(share_key, Vec::new())])
        }
    }

    #[tokio::test]
    async fn test_loads_once_per_key() {
        let source = Arc::new(CountingSource::default());
        let cache = MatchCache::new(source.clone());

        let (a, b) = tokio::join!(cache.get("k1"), cache.get("k1"));
        assert_eq!(assert_ok!(a), assert_ok!(b));
        assert_ok!(cache.get("k1").await);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        cache.get("k2").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let source = Arc::new(CountingSource::default());
        let cache = MatchCache::new(source.clone());

        assert_err!(cache.get("missing").await);
        assert_err!(cache.get("missing").await);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    /// Holds loads of "slow" until released.
    #[derive(Default)]
    struct GatedSource {
        started: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MatchSource for GatedSource {
        async fn load(&self, share_key: &str) -> Result<Vec<PlayerMatches>, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if share_key == "slow" {
                self.started.notify_one();
                self.release.notified().await;
            }
            Ok(vec![PlayerMatches::new(share_key, Vec::new())])
        }
    }

    #[tokio::test]
    async fn test_slow_load_does_not_block_other_keys() {
        let source = Arc::new(GatedSource::default());
        let cache = Arc::new(MatchCache::new(source.clone()));
        assert_ok!(cache.get("fast").await);

        let slow = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get("slow").await }
        });
        source.started.notified().await;

        let hit = tokio::time::timeout(Duration::from_secs(1), cache.get("fast")).await;
        assert_ok!(assert_ok!(hit));
        let miss = tokio::time::timeout(Duration::from_secs(1), cache.get("other")).await;
        assert_ok!(assert_ok!(miss));

        source.release.notify_one();
        assert_ok!(slow.await.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len().await, 3);
    }
}
