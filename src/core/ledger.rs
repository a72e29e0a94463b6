use crate::core::errors::LedgerError;
use crate::core::models::LedgerSnapshot;
use crate::infrastructure::storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Pulls the active expenses and completed settlements of a group out of the store.
pub struct LedgerReader<S: Storage> {
    storage: Arc<S>,
    timeout: Duration,
}

impl<S: Storage> LedgerReader<S> {
    pub fn new(storage: Arc<S>, timeout: Duration) -> Self {
        LedgerReader { storage, timeout }
    }

    /// Reads the ledger of `group_id`. A group with no activity yields an
    /// empty snapshot, not an error.
    pub async fn read_ledger(&self, group_id: &str) -> Result<LedgerSnapshot, LedgerError> {
        let snapshot = tokio::time::timeout(self.timeout, self.storage.read_ledger(group_id))
            .await
            .map_err(|_| {
                warn!("Ledger read for group {} timed out after {:?}", group_id, self.timeout);
                LedgerError::StoreUnavailable(format!(
                    "ledger read for group {} timed out after {}ms",
                    group_id,
                    self.timeout.as_millis()
                ))
            })??;

        // The store filters already; a misbehaving one must not leak
        // deleted expenses or non-completed payments into the balances.
        let snapshot = LedgerSnapshot {
            expenses: snapshot
                .expenses
                .into_iter()
                .filter(|e| e.active && e.group_id == group_id)
                .collect(),
            settlements: snapshot
                .settlements
                .into_iter()
                .filter(|s| s.is_completed() && s.group_id == group_id)
                .collect(),
        };
        debug!(
            "Read ledger for group {}: {} expenses, {} settlements",
            group_id,
            snapshot.expenses.len(),
            snapshot.settlements.len()
        );
        Ok(snapshot)
    }
}
