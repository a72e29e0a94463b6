pub mod in_memory;

use crate::core::errors::LedgerError;
use crate::core::models::{Expense, LedgerSnapshot, Settlement};
use async_trait::async_trait;

/// Durable store of expense and settlement records, keyed by group.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn save_expense(&self, expense: Expense) -> Result<(), LedgerError>;
    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, LedgerError>;
    async fn list_active_expenses(&self, group_id: &str) -> Result<Vec<Expense>, LedgerError>;
    async fn save_settlement(&self, settlement: Settlement) -> Result<(), LedgerError>;
    async fn get_settlement(&self, settlement_id: &str) -> Result<Option<Settlement>, LedgerError>;
    async fn list_completed_settlements(&self, group_id: &str) -> Result<Vec<Settlement>, LedgerError>;
    /// Deleting an unknown id is not an error.
    async fn delete_settlement(&self, settlement_id: &str) -> Result<(), LedgerError>;
    async fn delete_group(&self, group_id: &str) -> Result<(), LedgerError>;

    /// Both ledger lists of a group. Stores that can read them under one
    /// snapshot should override this; the default issues two queries.
    async fn read_ledger(&self, group_id: &str) -> Result<LedgerSnapshot, LedgerError> {
        let expenses = self.list_active_expenses(group_id).await?;
        let settlements = self.list_completed_settlements(group_id).await?;
        Ok(LedgerSnapshot { expenses, settlements })
    }
}
