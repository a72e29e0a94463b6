use crate::core::errors::LedgerError;
use crate::core::models::CachedBalance;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::cache::cache_keys::group_balances_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryCache {
    cache: Arc<RwLock<HashMap<String, CachedBalance>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_group_balances(&self, group_id: &str) -> Result<Option<CachedBalance>, LedgerError> {
        let cache = self.cache.read().await;
        Ok(cache.get(&group_balances_key(group_id)).cloned())
    }

    async fn save_group_balances(&self, entry: CachedBalance) -> Result<(), LedgerError> {
        let mut cache = self.cache.write().await;
        cache.insert(group_balances_key(&entry.group_id), entry);
        Ok(())
    }

    async fn invalidate_group_balances(&self, group_id: &str) -> Result<(), LedgerError> {
        let mut cache = self.cache.write().await;
        if let Some(entry) = cache.get_mut(&group_balances_key(group_id)) {
            entry.valid = false;
        }
        Ok(())
    }

    async fn remove_group_balances(&self, group_id: &str) -> Result<(), LedgerError> {
        let mut cache = self.cache.write().await;
        cache.remove(&group_balances_key(group_id));
        Ok(())
    }
}
