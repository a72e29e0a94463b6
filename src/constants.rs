pub const EXPENSE_ADDED: &str = "EXPENSE_ADDED";
pub const EXPENSE_UPDATED: &str = "EXPENSE_UPDATED";
pub const EXPENSE_DELETED: &str = "EXPENSE_DELETED";
pub const SETTLEMENT_RECORDED: &str = "SETTLEMENT_RECORDED";
pub const SETTLEMENT_STATUS_CHANGED: &str = "SETTLEMENT_STATUS_CHANGED";
pub const SETTLEMENT_DELETED: &str = "SETTLEMENT_DELETED";
pub const GROUP_DELETED: &str = "GROUP_DELETED";
pub const BALANCE_RECOMPUTE_FAILED: &str = "BALANCE_RECOMPUTE_FAILED";
pub const BALANCE_INVARIANT_VIOLATED: &str = "BALANCE_INVARIANT_VIOLATED";

/// Longest description accepted on an expense.
pub const MAX_DESCRIPTION_LEN: usize = 255;
