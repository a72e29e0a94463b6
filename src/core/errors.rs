use crate::core::models::settlement::SettlementStatus;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

/// How the API layer in front of this crate should surface an error.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Transient; the caller may retry the same request.
    Retryable,
    /// Corrupt data or a bug upstream. Distinct from "no data yet".
    Internal,
    /// The request itself was wrong (bad input, unknown id).
    Rejected,
}

#[derive(Error, Debug, Clone, Serialize, PartialEq, Eq)]
pub enum LedgerError {
    /// Backing store could not be reached or timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Folded balances do not sum to zero
    #[error("Balance invariant violated: {0}")]
    BalanceInvariantViolation(String),

    /// A balance map that does not sum to zero was handed to the optimizer
    #[error("Optimizer input invalid: balances sum to {0}, expected 0")]
    OptimizerInputInvalid(i64),

    /// Split amounts don't add up to the expense amount
    #[error("Invalid split: splits sum to {actual}, expected {expected}")]
    InvalidSplit { expected: i64, actual: i64 },

    /// Generic input validation error with detailed field information
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),

    #[error("Cannot create settlement to self")]
    SelfSettlement,

    #[error("Expense {0} not found")]
    ExpenseNotFound(String),

    #[error("Settlement {0} not found")]
    SettlementNotFound(String),

    #[error("Invalid settlement status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: SettlementStatus,
        to: SettlementStatus,
    },

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),
}

impl LedgerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::StoreUnavailable(_) | LedgerError::CacheError(_) => ErrorClass::Retryable,
            LedgerError::BalanceInvariantViolation(_)
            | LedgerError::OptimizerInputInvalid(_)
            | LedgerError::LoggingError(_) => ErrorClass::Internal,
            LedgerError::InvalidSplit { .. }
            | LedgerError::InvalidInput(..)
            | LedgerError::SelfSettlement
            | LedgerError::ExpenseNotFound(_)
            | LedgerError::SettlementNotFound(_)
            | LedgerError::InvalidStatusTransition { .. } => ErrorClass::Rejected,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    pub(crate) fn invalid_input(field: &str, title: &str, description: String) -> Self {
        LedgerError::InvalidInput(
            field.to_string(),
            FieldError {
                field: field.to_string(),
                title: title.to_string(),
                description,
            },
        )
    }
}
