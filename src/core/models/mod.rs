pub mod audit;
pub mod balance;
pub mod expense;
pub mod money;
pub mod plan;
pub mod settlement;
pub mod snapshot;

pub use audit::AppLog;
pub use balance::{BalanceMap, CachedBalance};
pub use expense::{Expense, Split, SplitType};
pub use plan::{SettlementPlan, Transfer};
pub use settlement::{Settlement, SettlementStatus};
pub use snapshot::LedgerSnapshot;
