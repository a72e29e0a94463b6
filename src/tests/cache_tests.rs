use super::{create_test_service, create_test_service_with};
use crate::config::Config;
use crate::core::errors::LedgerError;
use crate::core::models::{Expense, Settlement, SettlementStatus};
use crate::core::trigger::RecomputeOutcome;
use crate::infrastructure::storage::Storage;
use std::time::Duration;

#[tokio::test]
async fn read_after_mutation_is_never_stale() {
    let service = create_test_service();
    for i in 1..=5 {
        service
            .add_expense(Expense::split_equally("g", "a", 1_000, &["a", "b"], format!("Round {}", i)).unwrap())
            .await
            .unwrap();
        let balances = service.balances("g").await.unwrap();
        assert_eq!(balances.get("a"), 500 * i);
        assert_eq!(balances.total(), 0);
    }
    assert_eq!(service.cached_balance("g").await.unwrap().version, 5);
}

#[tokio::test]
async fn mutation_succeeds_while_store_reads_fail_and_cache_heals() {
    let service = create_test_service();
    service
        .add_expense(Expense::split_equally("g", "a", 1_000, &["a", "b"], "Before").unwrap())
        .await
        .unwrap();

    // The write lands through a handler that talks to the store directly,
    // then the store goes away before the recompute.
    let expense = Expense::split_equally("g", "b", 4_000, &["a", "b"], "During").unwrap();
    service.storage().save_expense(expense).await.unwrap();
    service.storage().set_available(false);
    let outcome = service.notify_mutation("g").await;
    assert!(matches!(
        outcome,
        RecomputeOutcome::Invalidated { error: LedgerError::StoreUnavailable(_) }
    ));
    assert!(service.cached_balance("g").await.is_err());

    let err = service.balances("g").await.unwrap_err();
    assert!(err.is_retryable());

    service.storage().set_available(true);
    let balances = service.balances("g").await.unwrap();
    assert_eq!(balances.get("a"), -1_500);
    assert_eq!(balances.get("b"), 1_500);
}

#[tokio::test]
async fn failed_write_is_reported_and_cache_untouched() {
    let service = create_test_service();
    service
        .add_expense(Expense::split_equally("g", "a", 1_000, &["a", "b"], "Before").unwrap())
        .await
        .unwrap();
    service.storage().set_available(false);
    let err = service
        .record_settlement(Settlement::new("g", "b", "a", 500, SettlementStatus::Completed))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    service.storage().set_available(true);

    // Nothing was written, the cached entry is still valid and correct.
    let entry = service.cached_balance("g").await.unwrap();
    assert_eq!(entry.version, 1);
    assert_eq!(entry.balances.get("b"), -500);
}

#[tokio::test]
async fn stale_entries_are_recomputed_when_max_age_is_set() {
    let config = Config {
        balance_max_age: Some(Duration::from_millis(1)),
        ..Config::default()
    };
    let service = create_test_service_with(&config);
    service.balances("g").await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    service.balances("g").await.unwrap();
    assert_eq!(service.storage().ledger_reads(), 2);
}

#[tokio::test]
async fn reads_are_served_from_cache_between_mutations() {
    let service = create_test_service();
    service
        .add_expense(Expense::split_equally("g", "a", 1_000, &["a", "b"], "Once").unwrap())
        .await
        .unwrap();
    let reads_after_write = service.storage().ledger_reads();
    for _ in 0..10 {
        service.balances("g").await.unwrap();
        service.settlement_plan("g").await.unwrap();
    }
    assert_eq!(service.storage().ledger_reads(), reads_after_write);
}
