use super::create_test_service;
use crate::constants::{BALANCE_INVARIANT_VIOLATED, EXPENSE_ADDED, EXPENSE_DELETED, GROUP_DELETED, SETTLEMENT_DELETED};
use crate::core::errors::{ErrorClass, LedgerError};
use crate::core::models::{Expense, Settlement, SettlementStatus, Split};
use crate::core::optimizer::SettlementAlgorithm;
use crate::infrastructure::storage::Storage;

#[tokio::test]
async fn splits_off_by_one_cent_are_rejected_before_storage() {
    let service = create_test_service();
    let expense = Expense::new("g", "a", 10_000, vec![Split::new("a", 3_333), Split::new("b", 6_666)], "Rent");
    let err = service.add_expense(expense.clone()).await.unwrap_err();
    assert_eq!(err, LedgerError::InvalidSplit { expected: 10_000, actual: 9_999 });
    assert_eq!(err.class(), ErrorClass::Rejected);

    assert!(service.storage().get_expense(&expense.id).await.unwrap().is_none());
    assert!(service.balances("g").await.unwrap().is_empty());
}

#[tokio::test]
async fn long_or_control_descriptions_are_rejected() {
    let service = create_test_service();
    let long = "x".repeat(300);
    let expense = Expense::split_equally("g", "a", 100, &["a", "b"], long).unwrap();
    assert!(matches!(service.add_expense(expense).await, Err(LedgerError::InvalidInput(..))));

    let expense = Expense::split_equally("g", "a", 100, &["a", "b"], "bad\u{0007}").unwrap();
    assert!(matches!(service.add_expense(expense).await, Err(LedgerError::InvalidInput(..))));
}

#[tokio::test]
async fn updating_an_expense_rebalances_the_group() {
    let service = create_test_service();
    let expense = service
        .add_expense(Expense::split_equally("g", "a", 1_000, &["a", "b"], "Pizza").unwrap())
        .await
        .unwrap();

    let mut changed = expense.clone();
    changed.amount = 3_000;
    changed.splits = vec![Split::new("a", 1_000), Split::new("b", 2_000)];
    let updated = service.update_expense(changed).await.unwrap();
    assert_eq!(updated.created_at, expense.created_at);

    let balances = service.balances("g").await.unwrap();
    assert_eq!(balances.get("a"), 2_000);
    assert_eq!(balances.get("b"), -2_000);
}

#[tokio::test]
async fn expense_cannot_change_group() {
    let service = create_test_service();
    let expense = service
        .add_expense(Expense::split_equally("g1", "a", 1_000, &["a", "b"], "Pizza").unwrap())
        .await
        .unwrap();
    let mut moved = expense;
    moved.group_id = "g2".to_string();
    assert!(matches!(service.update_expense(moved).await, Err(LedgerError::InvalidInput(..))));
}

#[tokio::test]
async fn deleted_expense_stops_counting() {
    let service = create_test_service();
    let expense = service
        .add_expense(Expense::split_equally("g", "a", 1_000, &["a", "b"], "Pizza").unwrap())
        .await
        .unwrap();
    service.delete_expense(&expense.id).await.unwrap();

    assert!(service.balances("g").await.unwrap().is_empty());
    assert_eq!(
        service.delete_expense(&expense.id).await.unwrap_err(),
        LedgerError::ExpenseNotFound(expense.id.clone())
    );

    let actions: Vec<String> = service.get_logs().await.unwrap().into_iter().map(|l| l.action).collect();
    assert_eq!(actions, vec![EXPENSE_ADDED.to_string(), EXPENSE_DELETED.to_string()]);
}

#[tokio::test]
async fn settlement_to_self_is_rejected() {
    let service = create_test_service();
    let err = service
        .record_settlement(Settlement::new("g", "a", "a", 100, SettlementStatus::Completed))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::SelfSettlement);
}

#[tokio::test]
async fn only_completed_settlements_move_balances() {
    let service = create_test_service();
    service
        .add_expense(Expense::split_equally("g", "a", 2_000, &["a", "b"], "Museum").unwrap())
        .await
        .unwrap();
    let pending = service
        .record_settlement(Settlement::new("g", "b", "a", 1_000, SettlementStatus::Pending))
        .await
        .unwrap();
    assert_eq!(service.balances("g").await.unwrap().get("b"), -1_000);

    service
        .update_settlement_status(&pending.id, SettlementStatus::Completed)
        .await
        .unwrap();
    assert_eq!(service.balances("g").await.unwrap().get("b"), 0);

    service
        .update_settlement_status(&pending.id, SettlementStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(service.balances("g").await.unwrap().get("b"), -1_000);

    let err = service
        .update_settlement_status(&pending.id, SettlementStatus::Completed)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::InvalidStatusTransition {
            from: SettlementStatus::Cancelled,
            to: SettlementStatus::Completed,
        }
    );
}

#[tokio::test]
async fn unknown_settlement_is_not_found() {
    let service = create_test_service();
    let err = service
        .update_settlement_status("missing", SettlementStatus::Completed)
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::SettlementNotFound("missing".to_string()));
}

#[tokio::test]
async fn corrupt_record_is_audited_and_surfaced_as_internal() {
    let service = create_test_service();
    // A writer that skips validation.
    let broken = Expense::new("g", "a", 1_000, vec![Split::new("b", 900)], "Broken");
    service.storage().save_expense(broken).await.unwrap();

    let outcome = service.notify_mutation("g").await;
    assert!(!outcome.is_refreshed());

    let err = service.balances("g").await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Internal);
    let logs = service.get_logs().await.unwrap();
    assert!(logs.iter().any(|l| l.action == BALANCE_INVARIANT_VIOLATED));
}

#[tokio::test]
async fn corrupt_record_gets_no_plan_from_either_algorithm() {
    let service = create_test_service();
    let broken = Expense::new("g", "a", 1_000, vec![Split::new("b", 999)], "Broken");
    service.storage().save_expense(broken).await.unwrap();

    for algorithm in [SettlementAlgorithm::Greedy, SettlementAlgorithm::Pairwise] {
        let err = service.settlement_plan_with("g", algorithm).await.unwrap_err();
        assert!(matches!(err, LedgerError::BalanceInvariantViolation(_)), "{:?}: {:?}", algorithm, err);
    }
}

#[tokio::test]
async fn deleting_a_completed_settlement_restores_balances() {
    let service = create_test_service();
    service
        .add_expense(Expense::split_equally("g", "a", 2_000, &["a", "b"], "Concert").unwrap())
        .await
        .unwrap();
    let before = service.balances("g").await.unwrap();

    let paid = service
        .record_settlement(Settlement::new("g", "b", "a", 1_000, SettlementStatus::Completed))
        .await
        .unwrap();
    assert!(service.balances("g").await.unwrap().is_settled());

    service.delete_settlement(&paid.id).await.unwrap();
    assert_eq!(service.balances("g").await.unwrap(), before);
    assert!(service.storage().get_settlement(&paid.id).await.unwrap().is_none());

    assert_eq!(
        service.delete_settlement(&paid.id).await.unwrap_err(),
        LedgerError::SettlementNotFound(paid.id.clone())
    );
    let logs = service.get_logs().await.unwrap();
    assert!(logs.iter().any(|l| l.action == SETTLEMENT_DELETED));
}

#[tokio::test]
async fn deleting_a_group_drops_ledger_and_cache() {
    let service = create_test_service();
    service
        .add_expense(Expense::split_equally("g", "a", 2_000, &["a", "b"], "Boat").unwrap())
        .await
        .unwrap();
    assert_eq!(service.cached_balance("g").await.unwrap().version, 1);

    service.delete_group("g").await.unwrap();
    assert!(service.balances("g").await.unwrap().is_empty());
    // Recreated lazily from scratch.
    assert_eq!(service.cached_balance("g").await.unwrap().version, 1);
    let logs = service.get_logs().await.unwrap();
    assert!(logs.iter().any(|l| l.action == GROUP_DELETED));
}
