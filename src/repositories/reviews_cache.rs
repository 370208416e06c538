use std::sync::Arc;
use std::time::Duration;
use moka::future::Cache;

const MAX_CACHED_RESPONSES: u64 = 64;

/// A serialized reviews response, replayed byte for byte on a cache hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedReviews {
    pub body: String,
    pub cache_control: String,
}

/// Shared response cache keyed by request URI. Entries expire a fixed time after they
/// were written; concurrent misses may each populate the same key.
#[derive(Clone)]
pub struct ReviewsCache {
    inner: Cache<String, Arc<CachedReviews>>,
    ttl: Duration,
}

impl ReviewsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_CACHED_RESPONSES)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &str) -> Option<Arc<CachedReviews>> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: CachedReviews) -> Arc<CachedReviews> {
        let value = Arc::new(value);
        self.inner.insert(key, value.clone()).await;
        value
    }
}
