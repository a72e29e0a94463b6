use crate::core::errors::LedgerError;
use crate::core::models::{BalanceMap, Expense, Settlement};

fn add(balances: &mut BalanceMap, member_id: &str, delta: i64) -> Result<(), LedgerError> {
    let slot = balances.entry_mut(member_id);
    *slot = slot.checked_add(delta).ok_or_else(|| {
        LedgerError::BalanceInvariantViolation(format!("balance of {} overflows", member_id))
    })?;
    Ok(())
}

/// Folds a group's ledger into net balances.
///
/// The payer of an expense is credited the full amount and every split,
/// the payer's own included, is debited from its member. A completed
/// settlement moves `amount` from payee to payer. Inactive expenses and
/// settlements that are not completed are ignored.
///
/// Every member that appears anywhere in the ledger gets an entry, even
/// when it nets to zero. The result must sum to exactly zero; anything
/// else means corrupt input and is reported instead of returned.
pub fn compute_balances(expenses: &[Expense], settlements: &[Settlement]) -> Result<BalanceMap, LedgerError> {
    let mut balances = BalanceMap::new();

    for expense in expenses.iter().filter(|e| e.active) {
        add(&mut balances, &expense.payer_id, expense.amount)?;
        for split in &expense.splits {
            let debit = split.amount.checked_neg().ok_or_else(|| {
                LedgerError::BalanceInvariantViolation(format!("split of {} overflows", split.user_id))
            })?;
            add(&mut balances, &split.user_id, debit)?;
        }
    }

    for settlement in settlements.iter().filter(|s| s.is_completed()) {
        add(&mut balances, &settlement.payer_id, settlement.amount)?;
        let credit = settlement.amount.checked_neg().ok_or_else(|| {
            LedgerError::BalanceInvariantViolation(format!("settlement {} overflows", settlement.id))
        })?;
        add(&mut balances, &settlement.payee_id, credit)?;
    }

    let total = balances.total();
    if total != 0 {
        let culprits: Vec<&str> = expenses
            .iter()
            .filter(|e| e.active && e.split_total() != i128::from(e.amount))
            .map(|e| e.id.as_str())
            .collect();
        return Err(LedgerError::BalanceInvariantViolation(format!(
            "balances sum to {} instead of 0 (expenses with mismatched splits: {:?})",
            total, culprits
        )));
    }
    Ok(balances)
}
