use std::sync::Arc;

use fusion_query_planner::CompiledPlan;
use moka::future::Cache;
use xxhash_rust::xxh3::Xxh3;

/// Compiled plans keyed by `(supergraph id, operation text, operation name)`.
///
/// Concurrent misses for the same key may both plan; the last insert wins.
#[derive(Clone)]
pub struct PlanCache {
    inner: Cache<u64, Arc<CompiledPlan>>,
}

impl PlanCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    pub fn key(supergraph_id: u64, operation: &str, operation_name: Option<&str>) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.update(&supergraph_id.to_le_bytes());
        hasher.update(operation.as_bytes());
        match operation_name {
            // The length prefix keeps `None` and `Some("")` apart.
            Some(name) => {
                hasher.update(&(name.len() as u64 + 1).to_le_bytes());
                hasher.update(name.as_bytes());
            }
            None => hasher.update(&0u64.to_le_bytes()),
        }
        hasher.digest()
    }

    pub async fn get(&self, key: u64) -> Option<Arc<CompiledPlan>> {
        self.inner.get(&key).await
    }

    pub async fn insert(&self, key: u64, plan: Arc<CompiledPlan>) {
        self.inner.insert(key, plan).await;
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Approximate number of cached plans, settled before counting.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::PlanCache;

    #[test]
    fn key_covers_every_part() {
        let base = PlanCache::key(1, "{ a }", None);

        assert_eq!(base, PlanCache::key(1, "{ a }", None));
        assert_ne!(base, PlanCache::key(2, "{ a }", None));
        assert_ne!(base, PlanCache::key(1, "{ b }", None));
        assert_ne!(base, PlanCache::key(1, "{ a }", Some("")));
        assert_ne!(
            PlanCache::key(1, "{ a }", Some("A")),
            PlanCache::key(1, "{ a }", Some("B"))
        );
    }
}
