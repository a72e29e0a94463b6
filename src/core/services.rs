use crate::config::Config;
use crate::constants::{
    BALANCE_INVARIANT_VIOLATED, BALANCE_RECOMPUTE_FAILED, EXPENSE_ADDED, EXPENSE_DELETED, EXPENSE_UPDATED,
    GROUP_DELETED, MAX_DESCRIPTION_LEN, SETTLEMENT_DELETED, SETTLEMENT_RECORDED, SETTLEMENT_STATUS_CHANGED,
};
use crate::core::cache::BalanceCache;
use crate::core::calculator::compute_balances;
use crate::core::errors::LedgerError;
use crate::core::ledger::LedgerReader;
use crate::core::models::{
    AppLog, BalanceMap, CachedBalance, Expense, Settlement, SettlementPlan, SettlementStatus, Transfer,
};
use crate::core::optimizer::{SettlementAlgorithm, optimize, pairwise_plan};
use crate::core::trigger::{RecomputeOutcome, RecomputeTrigger};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::Utc;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Where one member stands in one group, with the transfers that settle them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemberBalance {
    pub user_id: String,
    pub net_balance: i64,
    pub pays: Vec<Transfer>,
    pub receives: Vec<Transfer>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupBalance {
    pub group_id: String,
    pub balance: i64,
}

/// A user's position summed over several groups. Reporting only: no
/// transfers are netted across groups.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct UserBalanceSummary {
    pub user_id: String,
    pub total_owed_to_you: i64,
    pub total_you_owe: i64,
    pub net_balance: i64,
    pub groups: Vec<GroupBalance>,
}

/// Entry point for the API layer: balance reads, settlement plans, and the
/// validating write path that keeps the cache in step with the ledger.
pub struct BalanceService<L: LoggingService, S: Storage, C: Cache> {
    storage: Arc<S>,
    logging: L,
    reader: LedgerReader<S>,
    cache: Arc<BalanceCache<S, C>>,
    trigger: RecomputeTrigger<S, C>,
    algorithm: SettlementAlgorithm,
}

impl<L: LoggingService, S: Storage, C: Cache> BalanceService<L, S, C> {
    pub fn new(storage: S, cache: C, logging: L, config: &Config) -> Self {
        let storage = Arc::new(storage);
        let cache = Arc::new(BalanceCache::new(
            LedgerReader::new(Arc::clone(&storage), config.store_timeout),
            Arc::new(cache),
            config.balance_max_age,
        ));
        info!("Initializing BalanceService with {:?}", config);
        BalanceService {
            reader: LedgerReader::new(Arc::clone(&storage), config.store_timeout),
            trigger: RecomputeTrigger::new(Arc::clone(&cache)),
            storage,
            logging,
            cache,
            algorithm: config.settlement_algorithm,
        }
    }

    /// Trigger to hand to mutation handlers that write to the store directly.
    pub fn trigger(&self) -> RecomputeTrigger<S, C> {
        self.trigger.clone()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // READS

    /// Net balance of every member of `group_id`. An unknown group is simply empty.
    pub async fn balances(&self, group_id: &str) -> Result<BalanceMap, LedgerError> {
        self.validate_id("group_id", group_id)?;
        self.cache.get(group_id).await
    }

    /// Balances together with their version and computation time.
    pub async fn cached_balance(&self, group_id: &str) -> Result<CachedBalance, LedgerError> {
        self.validate_id("group_id", group_id)?;
        self.cache.get_entry(group_id).await
    }

    /// Settlement plan using the configured algorithm.
    pub async fn settlement_plan(&self, group_id: &str) -> Result<SettlementPlan, LedgerError> {
        self.settlement_plan_with(group_id, self.algorithm).await
    }

    pub async fn settlement_plan_with(
        &self,
        group_id: &str,
        algorithm: SettlementAlgorithm,
    ) -> Result<SettlementPlan, LedgerError> {
        self.validate_id("group_id", group_id)?;
        match algorithm {
            SettlementAlgorithm::Greedy => {
                let balances = self.balances(group_id).await?;
                optimize(&balances)
            }
            SettlementAlgorithm::Pairwise => {
                let ledger = self.reader.read_ledger(group_id).await?;
                // Same zero-sum check as the cached path; a corrupt ledger gets no plan.
                compute_balances(&ledger.expenses, &ledger.settlements)?;
                pairwise_plan(&ledger.expenses, &ledger.settlements)
            }
        }
    }

    pub async fn member_balance(&self, group_id: &str, user_id: &str) -> Result<MemberBalance, LedgerError> {
        self.validate_id("user_id", user_id)?;
        let balances = self.balances(group_id).await?;
        let plan = optimize(&balances)?;
        Ok(MemberBalance {
            user_id: user_id.to_string(),
            net_balance: balances.get(user_id),
            pays: plan.paid_by(user_id).cloned().collect(),
            receives: plan.received_by(user_id).cloned().collect(),
        })
    }

    /// Sums the cached position of `user_id` over `group_ids`, one read per group.
    pub async fn user_summary(&self, user_id: &str, group_ids: &[String]) -> Result<UserBalanceSummary, LedgerError> {
        self.validate_id("user_id", user_id)?;
        let per_group = try_join_all(group_ids.iter().map(|group_id| async move {
            let balances = self.balances(group_id).await?;
            Ok::<_, LedgerError>(GroupBalance {
                group_id: group_id.clone(),
                balance: balances.get(user_id),
            })
        }))
        .await?;

        let (mut owed_to_you, mut you_owe) = (0i128, 0i128);
        let mut groups = Vec::new();
        for group in per_group.into_iter().filter(|g| g.balance != 0) {
            if group.balance > 0 {
                owed_to_you += i128::from(group.balance);
            } else {
                you_owe -= i128::from(group.balance);
            }
            groups.push(group);
        }

        let narrow = |total: i128, what: &str| {
            i64::try_from(total).map_err(|_| {
                warn!("Summary of {} overflows: {} is {}", user_id, what, total);
                LedgerError::BalanceInvariantViolation(format!("{} of {} overflows", what, user_id))
            })
        };
        Ok(UserBalanceSummary {
            user_id: user_id.to_string(),
            total_owed_to_you: narrow(owed_to_you, "total owed")?,
            total_you_owe: narrow(you_owe, "total owing")?,
            net_balance: narrow(owed_to_you - you_owe, "net balance")?,
            groups,
        })
    }

    // MUTATIONS

    /// Reports an externally committed change to `group_id`.
    pub async fn notify_mutation(&self, group_id: &str) -> RecomputeOutcome {
        let outcome = self.trigger.notify_mutation(group_id).await;
        if let RecomputeOutcome::Invalidated { error } = &outcome {
            let action = match error {
                LedgerError::BalanceInvariantViolation(_) => BALANCE_INVARIANT_VIOLATED,
                _ => BALANCE_RECOMPUTE_FAILED,
            };
            self.audit(Some(group_id), action, json!({ "group_id": group_id, "error": error.to_string() }))
                .await;
        }
        outcome
    }

    pub async fn add_expense(&self, expense: Expense) -> Result<Expense, LedgerError> {
        info!(
            "Adding expense in group {} paid by {} for {}",
            expense.group_id, expense.payer_id, expense.amount
        );
        self.validate_expense(&expense)?;
        let mut expense = expense;
        expense.active = true;

        self.storage.save_expense(expense.clone()).await?;
        self.notify_mutation(&expense.group_id).await;
        self.audit(
            Some(&expense.group_id),
            EXPENSE_ADDED,
            json!({
                "expense_id": expense.id,
                "amount": expense.amount,
                "payer_id": expense.payer_id,
            }),
        )
        .await;
        Ok(expense)
    }

    pub async fn update_expense(&self, expense: Expense) -> Result<Expense, LedgerError> {
        info!("Updating expense {} in group {}", expense.id, expense.group_id);
        self.validate_expense(&expense)?;
        let existing = self.existing_expense(&expense.id).await?;
        if existing.group_id != expense.group_id {
            warn!(
                "Expense {} cannot move from group {} to {}",
                expense.id, existing.group_id, expense.group_id
            );
            return Err(LedgerError::invalid_input(
                "group_id",
                "Invalid Group",
                "An expense cannot move between groups".to_string(),
            ));
        }

        let updated = Expense {
            created_at: existing.created_at,
            updated_at: Utc::now(),
            active: existing.active,
            ..expense
        };
        self.storage.save_expense(updated.clone()).await?;
        self.notify_mutation(&updated.group_id).await;
        self.audit(
            Some(&updated.group_id),
            EXPENSE_UPDATED,
            json!({ "expense_id": updated.id, "amount": updated.amount }),
        )
        .await;
        Ok(updated)
    }

    /// Soft-deletes an expense; it stays in the store but stops counting.
    pub async fn delete_expense(&self, expense_id: &str) -> Result<Expense, LedgerError> {
        info!("Deleting expense {}", expense_id);
        let mut expense = self.existing_expense(expense_id).await?;
        if !expense.active {
            return Err(LedgerError::ExpenseNotFound(expense_id.to_string()));
        }
        expense.active = false;
        expense.updated_at = Utc::now();

        self.storage.save_expense(expense.clone()).await?;
        self.notify_mutation(&expense.group_id).await;
        self.audit(Some(&expense.group_id), EXPENSE_DELETED, json!({ "expense_id": expense.id }))
            .await;
        Ok(expense)
    }

    pub async fn record_settlement(&self, settlement: Settlement) -> Result<Settlement, LedgerError> {
        info!(
            "Recording {} settlement in group {}: {} pays {} {}",
            settlement.status, settlement.group_id, settlement.payer_id, settlement.payee_id, settlement.amount
        );
        self.validate_id("group_id", &settlement.group_id)?;
        self.validate_id("payer_id", &settlement.payer_id)?;
        self.validate_id("payee_id", &settlement.payee_id)?;
        if settlement.payer_id == settlement.payee_id {
            warn!("Settlement from {} to self rejected", settlement.payer_id);
            return Err(LedgerError::SelfSettlement);
        }
        self.validate_amount("amount", settlement.amount)?;
        if let Some(description) = &settlement.description {
            self.validate_description(description)?;
        }

        self.storage.save_settlement(settlement.clone()).await?;
        self.notify_mutation(&settlement.group_id).await;
        self.audit(
            Some(&settlement.group_id),
            SETTLEMENT_RECORDED,
            json!({
                "settlement_id": settlement.id,
                "payer_id": settlement.payer_id,
                "payee_id": settlement.payee_id,
                "amount": settlement.amount,
                "status": settlement.status,
            }),
        )
        .await;
        Ok(settlement)
    }

    pub async fn update_settlement_status(
        &self,
        settlement_id: &str,
        status: SettlementStatus,
    ) -> Result<Settlement, LedgerError> {
        info!("Setting settlement {} to {}", settlement_id, status);
        let mut settlement = self
            .storage
            .get_settlement(settlement_id)
            .await?
            .ok_or_else(|| LedgerError::SettlementNotFound(settlement_id.to_string()))?;
        if !settlement.status.can_transition_to(status) {
            warn!(
                "Settlement {} cannot go from {} to {}",
                settlement_id, settlement.status, status
            );
            return Err(LedgerError::InvalidStatusTransition {
                from: settlement.status,
                to: status,
            });
        }

        let previous = settlement.status;
        settlement.status = status;
        settlement.updated_at = Utc::now();
        self.storage.save_settlement(settlement.clone()).await?;
        self.notify_mutation(&settlement.group_id).await;
        self.audit(
            Some(&settlement.group_id),
            SETTLEMENT_STATUS_CHANGED,
            json!({ "settlement_id": settlement.id, "from": previous, "to": status }),
        )
        .await;
        Ok(settlement)
    }

    /// Removes a settlement record outright, whatever its status.
    pub async fn delete_settlement(&self, settlement_id: &str) -> Result<Settlement, LedgerError> {
        info!("Deleting settlement {}", settlement_id);
        let settlement = self
            .storage
            .get_settlement(settlement_id)
            .await?
            .ok_or_else(|| LedgerError::SettlementNotFound(settlement_id.to_string()))?;

        self.storage.delete_settlement(settlement_id).await?;
        self.notify_mutation(&settlement.group_id).await;
        self.audit(
            Some(&settlement.group_id),
            SETTLEMENT_DELETED,
            json!({
                "settlement_id": settlement.id,
                "amount": settlement.amount,
                "status": settlement.status,
            }),
        )
        .await;
        Ok(settlement)
    }

    /// Removes a group's ledger and its cached balances.
    pub async fn delete_group(&self, group_id: &str) -> Result<(), LedgerError> {
        info!("Deleting group {}", group_id);
        self.validate_id("group_id", group_id)?;
        self.storage.delete_group(group_id).await?;
        self.cache.evict(group_id).await?;
        self.audit(Some(group_id), GROUP_DELETED, json!({ "group_id": group_id }))
            .await;
        Ok(())
    }

    pub async fn get_logs(&self) -> Result<Vec<AppLog>, LedgerError> {
        self.logging.get_logs().await
    }

    // HELPERS

    async fn existing_expense(&self, expense_id: &str) -> Result<Expense, LedgerError> {
        self.storage
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| LedgerError::ExpenseNotFound(expense_id.to_string()))
    }

    /// Audit failures after a committed write are logged, never returned.
    async fn audit(&self, group_id: Option<&str>, action: &str, details: serde_json::Value) {
        if let Err(e) = self.logging.log_action(action, details, group_id).await {
            warn!("Failed to record {} audit entry: {}", action, e);
        }
    }

    fn validate_expense(&self, expense: &Expense) -> Result<(), LedgerError> {
        self.validate_id("group_id", &expense.group_id)?;
        self.validate_id("payer_id", &expense.payer_id)?;
        self.validate_description(&expense.description)?;
        expense.validate().inspect_err(|e| {
            warn!("Expense {} rejected: {}", expense.id, e);
        })
    }

    fn validate_id(&self, field: &str, value: &str) -> Result<(), LedgerError> {
        if value.trim().is_empty() {
            return Err(LedgerError::invalid_input(
                field,
                &format!("Invalid {}", field),
                format!("{} cannot be empty", field),
            ));
        }
        Ok(())
    }

    fn validate_description(&self, value: &str) -> Result<(), LedgerError> {
        if value.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(LedgerError::invalid_input(
                "description",
                "description Too Long",
                format!("description cannot exceed {} characters", MAX_DESCRIPTION_LEN),
            ));
        }
        if value.chars().any(|c| c.is_control()) {
            return Err(LedgerError::invalid_input(
                "description",
                "Invalid description",
                "description contains invalid characters".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_amount(&self, field: &str, amount: i64) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::invalid_input(
                field,
                "Invalid Amount",
                "Amount must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
