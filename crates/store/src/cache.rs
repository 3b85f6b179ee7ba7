use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::fetch::FetchResult;

/// Session-scoped cache of fetch results, keyed by owner.
///
/// Passed into the pipeline explicitly: the TTL and the invalidation
/// policy belong to the caller, never to ambient global state. Entries
/// expire on read; an import that just inserted rows should invalidate its
/// owner so the next fetch sees them.
pub struct PageCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Arc<FetchResult>)>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, owner: &str) -> Option<Arc<FetchResult>> {
        let mut entries = self.entries.lock().expect("cache lock");
        match entries.get(owner) {
            Some((stored_at, result)) if stored_at.elapsed() < self.ttl => Some(result.clone()),
            Some(_) => {
                entries.remove(owner);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, owner: &str, result: FetchResult) -> Arc<FetchResult> {
        let result = Arc::new(result);
        self.entries
            .lock()
            .expect("cache lock")
            .insert(owner.to_string(), (Instant::now(), result.clone()));
        result
    }

    pub fn invalidate(&self, owner: &str) {
        self.entries.lock().expect("cache lock").remove(owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(n: usize) -> FetchResult {
        FetchResult {
            records: Vec::with_capacity(n),
            truncated: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_miss_after() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.put("owner-a", result(0));
        assert!(cache.get("owner-a").is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get("owner-a").is_none());
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.put("owner-a", result(0));
        assert!(cache.get("owner-b").is_none());
    }

    #[tokio::test]
    async fn invalidation_drops_the_entry() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.put("owner-a", result(0));
        cache.invalidate("owner-a");
        assert!(cache.get("owner-a").is_none());
    }
}
