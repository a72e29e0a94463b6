use crate::core::calculator::compute_balances;
use crate::core::errors::LedgerError;
use crate::core::ledger::LedgerReader;
use crate::core::models::{BalanceMap, CachedBalance};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::storage::Storage;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

/// One mutex per group id, so recomputes of a group run one at a time while
/// different groups proceed in parallel.
#[derive(Default)]
struct GroupLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GroupLocks {
    async fn acquire(&self, group_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(group_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drops the group's mutex unless a task still holds or waits on it.
    /// Clones are only handed out under the map lock, so the count cannot
    /// grow while we look at it.
    async fn forget(&self, group_id: &str) {
        let mut locks = self.locks.lock().await;
        if locks.get(group_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(group_id);
        }
    }
}

/// Read-through cache of per-group balances.
///
/// Readers get the stored entry without locking as long as it is valid.
/// Every write is a read-compute-swap under the group's lock and replaces the
/// whole entry at once; a failed recompute leaves the entry flagged invalid so
/// the next read recomputes instead of serving it.
pub struct BalanceCache<S: Storage, C: Cache> {
    reader: LedgerReader<S>,
    store: Arc<C>,
    locks: GroupLocks,
    max_age: Option<Duration>,
}

impl<S: Storage, C: Cache> BalanceCache<S, C> {
    pub fn new(reader: LedgerReader<S>, store: Arc<C>, max_age: Option<Duration>) -> Self {
        BalanceCache {
            reader,
            store,
            locks: GroupLocks::default(),
            max_age,
        }
    }

    /// Current balances of `group_id`, recomputed first if there is no fresh entry.
    pub async fn get(&self, group_id: &str) -> Result<BalanceMap, LedgerError> {
        Ok(self.get_entry(group_id).await?.balances)
    }

    /// Like [`get`](Self::get) but returns the whole entry with its version.
    pub async fn get_entry(&self, group_id: &str) -> Result<CachedBalance, LedgerError> {
        if let Some(entry) = self.fresh_entry(group_id).await? {
            return Ok(entry);
        }

        let _guard = self.locks.acquire(group_id).await;
        // Someone may have refreshed the entry while we waited.
        if let Some(entry) = self.fresh_entry(group_id).await? {
            debug!("Balances for group {} refreshed by a concurrent writer", group_id);
            return Ok(entry);
        }
        debug!("Cache miss for group {}, recomputing", group_id);
        self.recompute_locked(group_id).await
    }

    /// Stored entry without any recompute, valid or not.
    pub async fn peek(&self, group_id: &str) -> Result<Option<CachedBalance>, LedgerError> {
        self.store.get_group_balances(group_id).await
    }

    /// Recomputes `group_id` from the ledger and swaps in the result. Meant to
    /// be called after every committed mutation of the group.
    pub async fn invalidate_and_recompute(&self, group_id: &str) -> Result<BalanceMap, LedgerError> {
        Ok(self.refresh(group_id).await?.balances)
    }

    /// [`invalidate_and_recompute`](Self::invalidate_and_recompute) returning the new entry.
    pub async fn refresh(&self, group_id: &str) -> Result<CachedBalance, LedgerError> {
        // Flag first so readers stop trusting the old entry while we wait for the lock.
        self.invalidate(group_id).await?;
        let _guard = self.locks.acquire(group_id).await;
        self.recompute_locked(group_id).await
    }

    /// Marks the entry of `group_id` invalid without recomputing.
    pub async fn invalidate(&self, group_id: &str) -> Result<(), LedgerError> {
        self.store.invalidate_group_balances(group_id).await.map_err(|e| {
            error!("Failed to invalidate cached balances of group {}: {}", group_id, e);
            e
        })
    }

    /// Drops everything cached for a deleted group.
    pub async fn evict(&self, group_id: &str) -> Result<(), LedgerError> {
        let guard = self.locks.acquire(group_id).await;
        self.store.remove_group_balances(group_id).await?;
        drop(guard);
        self.locks.forget(group_id).await;
        info!("Evicted cached balances of group {}", group_id);
        Ok(())
    }

    async fn fresh_entry(&self, group_id: &str) -> Result<Option<CachedBalance>, LedgerError> {
        let entry = self.store.get_group_balances(group_id).await?;
        Ok(entry.filter(|e| e.is_fresh(self.max_age, Utc::now())))
    }

    /// Caller must hold the group's lock.
    async fn recompute_locked(&self, group_id: &str) -> Result<CachedBalance, LedgerError> {
        let previous_version = match self.store.get_group_balances(group_id).await {
            Ok(previous) => previous.map_or(0, |p| p.version),
            Err(e) => {
                self.mark_failed(group_id, &e).await;
                return Err(e);
            }
        };

        let computed = match self.reader.read_ledger(group_id).await {
            Ok(ledger) => compute_balances(&ledger.expenses, &ledger.settlements),
            Err(e) => Err(e),
        };
        let balances = match computed {
            Ok(balances) => balances,
            Err(e) => {
                self.mark_failed(group_id, &e).await;
                return Err(e);
            }
        };

        let entry = CachedBalance {
            group_id: group_id.to_string(),
            balances,
            version: previous_version + 1,
            computed_at: Utc::now(),
            valid: true,
        };
        if let Err(e) = self.store.save_group_balances(entry.clone()).await {
            self.mark_failed(group_id, &e).await;
            return Err(e);
        }
        info!(
            "Recomputed balances for group {} (version {}, {} members)",
            group_id,
            entry.version,
            entry.balances.len()
        );
        Ok(entry)
    }

    async fn mark_failed(&self, group_id: &str, cause: &LedgerError) {
        match cause {
            LedgerError::BalanceInvariantViolation(detail) => {
                error!("Balance invariant violated for group {}: {}", group_id, detail)
            }
            other => warn!("Recompute of group {} failed: {}", group_id, other),
        }
        // Already logged inside `invalidate`; nothing more to do if the cache store is down too.
        let _ = self.invalidate(group_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Expense, Split};
    use crate::infrastructure::cache::in_memory::InMemoryCache;
    use crate::infrastructure::storage::in_memory::InMemoryStorage;

    fn cache_over(storage: &InMemoryStorage, max_age: Option<Duration>) -> BalanceCache<InMemoryStorage, InMemoryCache> {
        let reader = LedgerReader::new(Arc::new(storage.clone()), Duration::from_secs(1));
        BalanceCache::new(reader, Arc::new(InMemoryCache::new()), max_age)
    }

    #[tokio::test]
    async fn first_read_creates_the_entry_lazily() {
        let storage = InMemoryStorage::new();
        let cache = cache_over(&storage, None);
        assert!(cache.peek("g").await.unwrap().is_none());

        let balances = cache.get("g").await.unwrap();
        assert!(balances.is_empty());
        let entry = cache.peek("g").await.unwrap().unwrap();
        assert_eq!(entry.version, 1);
        assert!(entry.valid);
    }

    #[tokio::test]
    async fn valid_entry_is_served_without_reading_the_ledger() {
        let storage = InMemoryStorage::new();
        let cache = cache_over(&storage, None);
        cache.get("g").await.unwrap();
        cache.get("g").await.unwrap();
        cache.get("g").await.unwrap();
        assert_eq!(storage.ledger_reads(), 1);
    }

    #[tokio::test]
    async fn every_refresh_bumps_the_version() {
        let storage = InMemoryStorage::new();
        let cache = cache_over(&storage, None);
        cache.get("g").await.unwrap();
        cache.invalidate_and_recompute("g").await.unwrap();
        let entry = cache.refresh("g").await.unwrap();
        assert_eq!(entry.version, 3);
    }

    #[tokio::test]
    async fn corrupt_ledger_leaves_entry_invalid() {
        let storage = InMemoryStorage::new();
        let cache = cache_over(&storage, None);
        cache.get("g").await.unwrap();

        // Bypasses validation, as a broken upstream writer would.
        let broken = Expense::new("g", "a", 1_000, vec![Split::new("b", 999)], "Broken");
        storage.save_expense(broken).await.unwrap();

        let err = cache.invalidate_and_recompute("g").await.unwrap_err();
        assert!(matches!(err, LedgerError::BalanceInvariantViolation(_)));
        let entry = cache.peek("g").await.unwrap().unwrap();
        assert!(!entry.valid);
        assert_eq!(entry.version, 1);
        assert!(cache.get("g").await.is_err());
    }

    #[tokio::test]
    async fn expired_entry_is_recomputed() {
        let storage = InMemoryStorage::new();
        let cache = cache_over(&storage, Some(Duration::ZERO));
        cache.get("g").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.get("g").await.unwrap();
        assert_eq!(storage.ledger_reads(), 2);
    }

    #[tokio::test]
    async fn group_lock_survives_forget_while_held() {
        let locks = GroupLocks::default();
        let held = locks.acquire("g").await;
        locks.forget("g").await;
        assert!(locks.locks.lock().await.contains_key("g"));

        // A second acquire must queue behind the first holder, not get a fresh mutex.
        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire("g")).await;
        assert!(second.is_err());

        drop(held);
        locks.forget("g").await;
        assert!(!locks.locks.lock().await.contains_key("g"));
    }

    #[tokio::test]
    async fn evict_removes_the_entry() {
        let storage = InMemoryStorage::new();
        let cache = cache_over(&storage, None);
        cache.get("g").await.unwrap();
        cache.evict("g").await.unwrap();
        assert!(cache.peek("g").await.unwrap().is_none());
    }
}
