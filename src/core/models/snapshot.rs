use super::expense::Expense;
use super::settlement::Settlement;
use serde::{Deserialize, Serialize};

/// Active expenses and completed settlements of one group, read at one point in time.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub expenses: Vec<Expense>,
    pub settlements: Vec<Settlement>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty() && self.settlements.is_empty()
    }
}
