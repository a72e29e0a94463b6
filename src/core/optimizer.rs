//! Turning balances into a short list of payments.
//!
//! Finding the true minimum number of transfers is a partition problem, so
//! the default is a greedy largest-creditor / largest-debtor matching. It
//! needs at most `n - 1` transfers for `n` members with a nonzero balance,
//! runs in `O(n log n)` and is deterministic: ties on amount are broken by
//! member id.

use crate::core::errors::LedgerError;
use crate::core::models::{BalanceMap, Expense, Settlement, SettlementPlan, Transfer};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettlementAlgorithm {
    /// Greedy matching over net balances.
    #[default]
    Greedy,
    /// Nets each pair of members separately, never routing money through a third member.
    Pairwise,
}

impl FromStr for SettlementAlgorithm {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" | "advanced" => Ok(SettlementAlgorithm::Greedy),
            "pairwise" | "normal" => Ok(SettlementAlgorithm::Pairwise),
            other => Err(LedgerError::invalid_input(
                "settlement_algorithm",
                "Unknown Algorithm",
                format!("`{}` is not one of greedy, pairwise", other),
            )),
        }
    }
}

/// Heap entry: larger amount first, then smaller member id first.
#[derive(Debug, PartialEq, Eq)]
struct Position {
    // Widened so that i64::MIN debtors can be negated.
    amount: i128,
    member: Reverse<String>,
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount
            .cmp(&other.amount)
            .then_with(|| self.member.cmp(&other.member))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Greedy plan for `balances`. Rejects maps that do not sum to zero rather
/// than returning a plan that cannot balance.
pub fn optimize(balances: &BalanceMap) -> Result<SettlementPlan, LedgerError> {
    let total = balances.total();
    if total != 0 {
        return Err(LedgerError::OptimizerInputInvalid(
            i64::try_from(total).unwrap_or(if total > 0 { i64::MAX } else { i64::MIN }),
        ));
    }

    let mut creditors = BinaryHeap::new();
    let mut debtors = BinaryHeap::new();
    for (member, amount) in balances.iter() {
        match amount.cmp(&0) {
            Ordering::Greater => creditors.push(Position {
                amount: i128::from(amount),
                member: Reverse(member.to_string()),
            }),
            Ordering::Less => debtors.push(Position {
                amount: -i128::from(amount),
                member: Reverse(member.to_string()),
            }),
            Ordering::Equal => {}
        }
    }

    let mut transfers = Vec::with_capacity(creditors.len() + debtors.len());
    while let (Some(mut creditor), Some(mut debtor)) = (creditors.pop(), debtors.pop()) {
        let amount = creditor.amount.min(debtor.amount);
        // Bounded by a creditor's original i64 balance.
        let paid = i64::try_from(amount).map_err(|_| LedgerError::OptimizerInputInvalid(0))?;
        transfers.push(Transfer::new(debtor.member.0.clone(), creditor.member.0.clone(), paid));

        creditor.amount -= amount;
        debtor.amount -= amount;
        if creditor.amount > 0 {
            creditors.push(creditor);
        }
        if debtor.amount > 0 {
            debtors.push(debtor);
        }
    }

    // Zero-sum input drains both heaps together.
    debug_assert!(creditors.is_empty() && debtors.is_empty());
    Ok(SettlementPlan::new(transfers))
}

/// Plan that only nets direct relationships: each split of a non-payer is a
/// debt to the payer, each completed settlement pays some of it back, and
/// every pair of members ends up with at most one transfer between them.
/// Transfers come out sorted by (from, to).
pub fn pairwise_plan(expenses: &[Expense], settlements: &[Settlement]) -> Result<SettlementPlan, LedgerError> {
    // Key is the ordered pair (low, high); positive means low owes high.
    let mut net: BTreeMap<(String, String), i128> = BTreeMap::new();
    let mut owe = |debtor: &str, creditor: &str, amount: i64| {
        if debtor == creditor || amount == 0 {
            return;
        }
        let (key, signed) = if debtor < creditor {
            ((debtor.to_string(), creditor.to_string()), i128::from(amount))
        } else {
            ((creditor.to_string(), debtor.to_string()), -i128::from(amount))
        };
        *net.entry(key).or_insert(0) += signed;
    };

    for expense in expenses.iter().filter(|e| e.active) {
        for split in &expense.splits {
            owe(&split.user_id, &expense.payer_id, split.amount);
        }
    }
    for settlement in settlements.iter().filter(|s| s.is_completed()) {
        // Paying someone reduces what you owe them.
        owe(&settlement.payee_id, &settlement.payer_id, settlement.amount);
    }

    let mut transfers = Vec::new();
    for ((low, high), amount) in net {
        let magnitude = i64::try_from(amount.unsigned_abs()).map_err(|_| {
            LedgerError::BalanceInvariantViolation(format!("debt between {} and {} overflows", low, high))
        })?;
        match amount.cmp(&0) {
            Ordering::Greater => transfers.push(Transfer::new(low, high, magnitude)),
            Ordering::Less => transfers.push(Transfer::new(high, low, magnitude)),
            Ordering::Equal => {}
        }
    }
    transfers.sort_by(|a, b| {
        a.from_user_id
            .cmp(&b.from_user_id)
            .then_with(|| a.to_user_id.cmp(&b.to_user_id))
    });
    Ok(SettlementPlan::new(transfers))
}
