use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Completed,
    Cancelled,
}

impl SettlementStatus {
    /// Pending can complete or be cancelled, a completed payment can still be
    /// cancelled, and cancelled is terminal.
    pub fn can_transition_to(self, next: SettlementStatus) -> bool {
        matches!(
            (self, next),
            (SettlementStatus::Pending, SettlementStatus::Completed)
                | (SettlementStatus::Pending, SettlementStatus::Cancelled)
                | (SettlementStatus::Completed, SettlementStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Completed => "completed",
            SettlementStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// A recorded payment from `payer_id` to `payee_id`, in minor units.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settlement {
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: i64,
    pub status: SettlementStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Settlement {
    pub fn new(
        group_id: impl Into<String>,
        payer_id: impl Into<String>,
        payee_id: impl Into<String>,
        amount: i64,
        status: SettlementStatus,
    ) -> Self {
        let now = Utc::now();
        Settlement {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.into(),
            payer_id: payer_id.into(),
            payee_id: payee_id.into(),
            amount,
            status,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == SettlementStatus::Completed
    }
}
