pub mod config;
pub mod constants;
pub mod core;
pub mod infrastructure;

pub use crate::core::errors::{ErrorClass, LedgerError};
pub use crate::core::models::{BalanceMap, Expense, Settlement, SettlementPlan, SettlementStatus, Split, Transfer};
pub use crate::core::optimizer::SettlementAlgorithm;
pub use crate::core::services::BalanceService;
pub use crate::core::trigger::RecomputeOutcome;
pub use config::Config;
pub use infrastructure::cache::in_memory::InMemoryCache;
pub use infrastructure::logging::in_memory::InMemoryLogging;
pub use infrastructure::storage::in_memory::InMemoryStorage;

#[cfg(test)]
mod tests;
