use serde::{Deserialize, Serialize};

/// One suggested payment: `from_user_id` pays `to_user_id` `amount` minor units.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transfer {
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: i64,
}

impl Transfer {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: i64) -> Self {
        Transfer {
            from_user_id: from.into(),
            to_user_id: to.into(),
            amount,
        }
    }
}

/// Ordered transfers that bring a group to zero. Derived per request, never stored.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SettlementPlan(Vec<Transfer>);

impl SettlementPlan {
    pub fn new(transfers: Vec<Transfer>) -> Self {
        SettlementPlan(transfers)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transfer> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// An empty plan means the group is settled up.
    pub fn is_settled(&self) -> bool {
        self.0.is_empty()
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.0
    }

    pub fn into_transfers(self) -> Vec<Transfer> {
        self.0
    }

    /// Transfers this member has to pay.
    pub fn paid_by<'a>(&'a self, member_id: &'a str) -> impl Iterator<Item = &'a Transfer> + 'a {
        self.0.iter().filter(move |t| t.from_user_id == member_id)
    }

    /// Transfers this member receives.
    pub fn received_by<'a>(&'a self, member_id: &'a str) -> impl Iterator<Item = &'a Transfer> + 'a {
        self.0.iter().filter(move |t| t.to_user_id == member_id)
    }
}

impl<'a> IntoIterator for &'a SettlementPlan {
    type Item = &'a Transfer;
    type IntoIter = std::slice::Iter<'a, Transfer>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
