pub mod cache_keys;
pub mod in_memory;

use crate::core::errors::LedgerError;
use crate::core::models::CachedBalance;
use async_trait::async_trait;

/// Keyed store of cached group balances. Entries are written as whole values;
/// there is no field-level update.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_group_balances(&self, group_id: &str) -> Result<Option<CachedBalance>, LedgerError>;
    async fn save_group_balances(&self, entry: CachedBalance) -> Result<(), LedgerError>;
    /// Flags the entry `valid = false`, keeping its last balances and version.
    async fn invalidate_group_balances(&self, group_id: &str) -> Result<(), LedgerError>;
    async fn remove_group_balances(&self, group_id: &str) -> Result<(), LedgerError>;
}
