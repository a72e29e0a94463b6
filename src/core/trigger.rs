use crate::core::cache::BalanceCache;
use crate::core::errors::LedgerError;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// What happened to the cache after a mutation was reported.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecomputeOutcome {
    /// Balances were recomputed and stored under `version`.
    Refreshed { version: u64 },
    /// Recompute failed; the entry is left invalid and the next read retries.
    Invalidated { error: LedgerError },
}

impl RecomputeOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RecomputeOutcome::Refreshed { .. })
    }
}

/// Called by mutation handlers once an expense or settlement change is
/// committed. Never fails: the write already happened, so a failed refresh
/// only leaves the cache entry invalid for the next read to heal.
pub struct RecomputeTrigger<S: Storage, C: Cache> {
    cache: Arc<BalanceCache<S, C>>,
}

impl<S: Storage, C: Cache> Clone for RecomputeTrigger<S, C> {
    fn clone(&self) -> Self {
        RecomputeTrigger {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S: Storage, C: Cache> RecomputeTrigger<S, C> {
    pub fn new(cache: Arc<BalanceCache<S, C>>) -> Self {
        RecomputeTrigger { cache }
    }

    pub async fn notify_mutation(&self, group_id: &str) -> RecomputeOutcome {
        match self.cache.refresh(group_id).await {
            Ok(entry) => RecomputeOutcome::Refreshed { version: entry.version },
            Err(error) => {
                warn!(
                    "Balances of group {} left invalid after mutation: {}",
                    group_id, error
                );
                RecomputeOutcome::Invalidated { error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::LedgerReader;
    use crate::core::models::Expense;
    use crate::infrastructure::cache::in_memory::InMemoryCache;
    use crate::infrastructure::storage::in_memory::InMemoryStorage;
    use std::time::Duration;

    fn trigger_over(storage: &InMemoryStorage) -> (RecomputeTrigger<InMemoryStorage, InMemoryCache>, Arc<BalanceCache<InMemoryStorage, InMemoryCache>>) {
        let reader = LedgerReader::new(Arc::new(storage.clone()), Duration::from_secs(1));
        let cache = Arc::new(BalanceCache::new(reader, Arc::new(InMemoryCache::new()), None));
        (RecomputeTrigger::new(Arc::clone(&cache)), cache)
    }

    #[tokio::test]
    async fn mutation_refreshes_the_entry() {
        let storage = InMemoryStorage::new();
        let (trigger, cache) = trigger_over(&storage);
        let expense = Expense::split_equally("g", "alice", 10_000, &["alice", "bob"], "Dinner").unwrap();
        storage.save_expense(expense).await.unwrap();

        assert_eq!(trigger.notify_mutation("g").await, RecomputeOutcome::Refreshed { version: 1 });
        let entry = cache.peek("g").await.unwrap().unwrap();
        assert_eq!(entry.balances.get("alice"), 5_000);
    }

    #[tokio::test]
    async fn store_outage_invalidates_instead_of_failing() {
        let storage = InMemoryStorage::new();
        let (trigger, cache) = trigger_over(&storage);
        trigger.notify_mutation("g").await;

        storage.set_available(false);
        let outcome = trigger.notify_mutation("g").await;
        assert!(!outcome.is_refreshed());
        assert!(!cache.peek("g").await.unwrap().unwrap().valid);

        storage.set_available(true);
        let balances = cache.get("g").await.unwrap();
        assert!(balances.is_empty());
        assert!(cache.peek("g").await.unwrap().unwrap().valid);
    }
}
