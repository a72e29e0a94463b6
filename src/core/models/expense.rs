use crate::core::errors::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Custom,
}

/// The part of an expense attributed to one member, in minor units.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Split {
    pub user_id: String,
    pub amount: i64,
}

impl Split {
    pub fn new(user_id: impl Into<String>, amount: i64) -> Self {
        Split {
            user_id: user_id.into(),
            amount,
        }
    }

    /// Divides `amount` across `members`. Leftover minor units go one each to
    /// the first members in the order given, so the result always sums to
    /// `amount` exactly.
    pub fn equal<S: AsRef<str>>(amount: i64, members: &[S]) -> Result<Vec<Split>, LedgerError> {
        if members.is_empty() {
            return Err(LedgerError::invalid_input(
                "splits",
                "Invalid Splits",
                "At least one member is required for an equal split".to_string(),
            ));
        }
        if amount <= 0 {
            return Err(LedgerError::invalid_input(
                "amount",
                "Invalid Amount",
                "Amount must be greater than 0".to_string(),
            ));
        }

        let count = members.len() as i64;
        let base = amount / count;
        let remainder = amount % count;
        Ok(members
            .iter()
            .enumerate()
            .map(|(i, m)| Split::new(m.as_ref(), base + i64::from((i as i64) < remainder)))
            .collect())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub amount: i64,
    pub splits: Vec<Split>,
    pub split_type: SplitType,
    pub description: String,
    /// Soft-delete flag. Inactive expenses never reach the balance calculator.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        group_id: impl Into<String>,
        payer_id: impl Into<String>,
        amount: i64,
        splits: Vec<Split>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Expense {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.into(),
            payer_id: payer_id.into(),
            amount,
            splits,
            split_type: SplitType::Custom,
            description: description.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// An expense split evenly between `members` (see [`Split::equal`]).
    pub fn split_equally<S: AsRef<str>>(
        group_id: impl Into<String>,
        payer_id: impl Into<String>,
        amount: i64,
        members: &[S],
        description: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let splits = Split::equal(amount, members)?;
        let mut expense = Expense::new(group_id, payer_id, amount, splits, description);
        expense.split_type = SplitType::Equal;
        Ok(expense)
    }

    pub fn split_total(&self) -> i128 {
        self.splits.iter().map(|s| i128::from(s.amount)).sum()
    }

    /// Checks the money invariants: positive amount, non-negative splits,
    /// one split per member, and splits summing to the amount exactly.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= 0 {
            return Err(LedgerError::invalid_input(
                "amount",
                "Invalid Amount",
                "Amount must be greater than 0".to_string(),
            ));
        }
        if self.splits.is_empty() {
            return Err(LedgerError::invalid_input(
                "splits",
                "Invalid Splits",
                "An expense needs at least one split".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for split in &self.splits {
            if split.user_id.trim().is_empty() {
                return Err(LedgerError::invalid_input(
                    "splits",
                    "Invalid Splits",
                    "Split user id cannot be empty".to_string(),
                ));
            }
            if split.amount < 0 {
                return Err(LedgerError::invalid_input(
                    "splits",
                    "Invalid Splits",
                    format!("Split for {} is negative", split.user_id),
                ));
            }
            if !seen.insert(split.user_id.as_str()) {
                return Err(LedgerError::invalid_input(
                    "splits",
                    "Invalid Splits",
                    format!("User {} appears in more than one split", split.user_id),
                ));
            }
        }

        let total = self.split_total();
        if total != i128::from(self.amount) {
            return Err(LedgerError::InvalidSplit {
                expected: self.amount,
                actual: i64::try_from(total).unwrap_or(i64::MAX),
            });
        }
        Ok(())
    }
}
