use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::plan::SettlementPlan;
use crate::core::errors::LedgerError;

/// Net position per member in minor units. Positive means the member is owed
/// money, negative means they owe. Ordered by member id so iteration, and
/// everything derived from it, is deterministic.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct BalanceMap(BTreeMap<String, i64>);

impl BalanceMap {
    pub fn new() -> Self {
        BalanceMap(BTreeMap::new())
    }

    /// Balance for `member_id`; members not in the map are at zero.
    pub fn get(&self, member_id: &str) -> i64 {
        self.0.get(member_id).copied().unwrap_or(0)
    }

    pub fn insert(&mut self, member_id: impl Into<String>, amount: i64) {
        self.0.insert(member_id.into(), amount);
    }

    pub(crate) fn entry_mut(&mut self, member_id: &str) -> &mut i64 {
        self.0.entry(member_id.to_string()).or_insert(0)
    }

    pub fn contains(&self, member_id: &str) -> bool {
        self.0.contains_key(member_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all balances, widened so it cannot overflow.
    pub fn total(&self) -> i128 {
        self.0.values().map(|v| i128::from(*v)).sum()
    }

    pub fn nonzero_members(&self) -> usize {
        self.0.values().filter(|v| **v != 0).count()
    }

    /// True when nobody owes anything.
    pub fn is_settled(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }

    /// Balances after every transfer in `plan` has been paid.
    pub fn apply(&self, plan: &SettlementPlan) -> Result<BalanceMap, LedgerError> {
        let overflow = |member: &str| {
            LedgerError::BalanceInvariantViolation(format!("balance of {} overflows while applying plan", member))
        };
        let mut next = self.clone();
        for transfer in plan.iter() {
            let from = next.entry_mut(&transfer.from_user_id);
            *from = from
                .checked_add(transfer.amount)
                .ok_or_else(|| overflow(&transfer.from_user_id))?;
            let to = next.entry_mut(&transfer.to_user_id);
            *to = to
                .checked_sub(transfer.amount)
                .ok_or_else(|| overflow(&transfer.to_user_id))?;
        }
        Ok(next)
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for BalanceMap {
    fn from_iter<T: IntoIterator<Item = (K, i64)>>(iter: T) -> Self {
        BalanceMap(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// The last computed balances of one group. Only the balance cache writes
/// these, and always as a whole value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedBalance {
    pub group_id: String,
    pub balances: BalanceMap,
    /// Incremented on every successful recompute of the group.
    pub version: u64,
    pub computed_at: DateTime<Utc>,
    pub valid: bool,
}

impl CachedBalance {
    /// Whether the entry can be served as-is at `now`.
    pub fn is_fresh(&self, max_age: Option<Duration>, now: DateTime<Utc>) -> bool {
        if !self.valid {
            return false;
        }
        match max_age.and_then(|age| chrono::Duration::from_std(age).ok()) {
            Some(age) => now - self.computed_at <= age,
            None => true,
        }
    }
}
