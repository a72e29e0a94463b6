use crate::core::errors::LedgerError;
use crate::core::models::{Expense, LedgerSnapshot, Settlement};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
    expenses: HashMap<String, Expense>,
    settlements: HashMap<String, Settlement>,
}

impl Ledger {
    fn active_expenses(&self, group_id: &str) -> Vec<Expense> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .values()
            .filter(|e| e.group_id == group_id && e.active)
            .cloned()
            .collect();
        expenses.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        expenses
    }

    fn completed_settlements(&self, group_id: &str) -> Vec<Settlement> {
        let mut settlements: Vec<Settlement> = self
            .settlements
            .values()
            .filter(|s| s.group_id == group_id && s.is_completed())
            .cloned()
            .collect();
        settlements.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        settlements
    }
}

/// Store held in process memory. Both collections sit behind one lock so
/// `read_ledger` sees a single point in time.
#[derive(Clone)]
pub struct InMemoryStorage {
    ledger: Arc<RwLock<Ledger>>,
    available: Arc<AtomicBool>,
    ledger_reads: Arc<AtomicUsize>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage {
            ledger: Arc::new(RwLock::new(Ledger::default())),
            available: Arc::new(AtomicBool::new(true)),
            ledger_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulates the store going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of ledger reads served so far.
    pub fn ledger_reads(&self) -> usize {
        self.ledger_reads.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), LedgerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::StoreUnavailable("in-memory store is offline".to_string()))
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save_expense(&self, expense: Expense) -> Result<(), LedgerError> {
        self.ensure_available()?;
        self.ledger.write().await.expenses.insert(expense.id.clone(), expense);
        Ok(())
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, LedgerError> {
        self.ensure_available()?;
        Ok(self.ledger.read().await.expenses.get(expense_id).cloned())
    }

    async fn list_active_expenses(&self, group_id: &str) -> Result<Vec<Expense>, LedgerError> {
        self.ensure_available()?;
        Ok(self.ledger.read().await.active_expenses(group_id))
    }

    async fn save_settlement(&self, settlement: Settlement) -> Result<(), LedgerError> {
        self.ensure_available()?;
        self.ledger
            .write()
            .await
            .settlements
            .insert(settlement.id.clone(), settlement);
        Ok(())
    }

    async fn get_settlement(&self, settlement_id: &str) -> Result<Option<Settlement>, LedgerError> {
        self.ensure_available()?;
        Ok(self.ledger.read().await.settlements.get(settlement_id).cloned())
    }

    async fn list_completed_settlements(&self, group_id: &str) -> Result<Vec<Settlement>, LedgerError> {
        self.ensure_available()?;
        Ok(self.ledger.read().await.completed_settlements(group_id))
    }

    async fn delete_settlement(&self, settlement_id: &str) -> Result<(), LedgerError> {
        self.ensure_available()?;
        self.ledger.write().await.settlements.remove(settlement_id);
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> Result<(), LedgerError> {
        self.ensure_available()?;
        let mut ledger = self.ledger.write().await;
        ledger.expenses.retain(|_, e| e.group_id != group_id);
        ledger.settlements.retain(|_, s| s.group_id != group_id);
        Ok(())
    }

    async fn read_ledger(&self, group_id: &str) -> Result<LedgerSnapshot, LedgerError> {
        self.ensure_available()?;
        self.ledger_reads.fetch_add(1, Ordering::SeqCst);
        let ledger = self.ledger.read().await;
        Ok(LedgerSnapshot {
            expenses: ledger.active_expenses(group_id),
            settlements: ledger.completed_settlements(group_id),
        })
    }
}
