//! LedgerStore interface tests.
//!
//! These tests verify the contract of the LedgerStore trait.
//! Each storage implementation should run these tests. Every test works in
//! its own guild so they can share one database.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use uuid::Uuid;

use pointledger::calendar::day_window;
use pointledger::storage::{LedgerStore, QuotaGuard, StorageError, TransactionRecord};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

fn tx(guild: &str, giver: &str, receiver: &str, amount: i64, created_at: DateTime<Utc>) -> TransactionRecord {
    TransactionRecord {
        id: Uuid::new_v4(),
        guild_id: guild.to_string(),
        type_key: "mero".to_string(),
        giver_user_id: giver.to_string(),
        receiver_user_id: receiver.to_string(),
        amount,
        message: "thanks".to_string(),
        created_at,
    }
}

fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

// =============================================================================
// Balances
// =============================================================================

pub async fn test_get_balance_absent<S: LedgerStore>(store: &S) {
    let balance = store
        .get_balance("test_absent", "nobody", "mero")
        .await
        .expect("get_balance should succeed");
    assert_eq!(balance, 0, "fresh key should read as zero");
}

pub async fn test_apply_delta_accumulates<S: LedgerStore>(store: &S) {
    let guild = "test_delta";

    assert_eq!(store.apply_delta(guild, "u", "mero", 5).await.unwrap(), 5);
    assert_eq!(store.apply_delta(guild, "u", "mero", 7).await.unwrap(), 12);
    assert_eq!(store.apply_delta(guild, "u", "mero", -2).await.unwrap(), 10);

    assert_eq!(store.get_balance(guild, "u", "mero").await.unwrap(), 10);
    assert_eq!(
        store.get_balance(guild, "u", "stream").await.unwrap(),
        0,
        "other types untouched"
    );
}

pub async fn test_list_balances<S: LedgerStore>(store: &S) {
    let guild = "test_list";

    store.apply_delta(guild, "u", "stream", 3).await.unwrap();
    store.apply_delta(guild, "u", "stream", -3).await.unwrap();
    store.apply_delta(guild, "u", "mero", 4).await.unwrap();
    store.apply_delta(guild, "other", "mero", 9).await.unwrap();

    let rows = store.list_balances(guild, "u").await.unwrap();
    let pairs: Vec<_> = rows.iter().map(|r| (r.type_key.as_str(), r.balance)).collect();
    assert_eq!(pairs, vec![("mero", 4), ("stream", 0)], "ordered by type, zero rows kept");
}

pub async fn test_top_by_type<S: LedgerStore>(store: &S) {
    let guild = "test_top";

    store.apply_delta(guild, "zed", "mero", 10).await.unwrap();
    store.apply_delta(guild, "amy", "mero", 10).await.unwrap();
    store.apply_delta(guild, "bob", "mero", 20).await.unwrap();
    store.apply_delta(guild, "cat", "mero", 1).await.unwrap();
    store.apply_delta(guild, "bob", "stream", 99).await.unwrap();
    store.apply_delta("test_top_other", "eve", "mero", 50).await.unwrap();

    let top = store.top_by_type(guild, "mero", 3).await.unwrap();
    let users: Vec<_> = top.iter().map(|r| (r.user_id.as_str(), r.balance)).collect();
    assert_eq!(users, vec![("bob", 20), ("amy", 10), ("zed", 10)]);

    let again = store.top_by_type(guild, "mero", 3).await.unwrap();
    assert_eq!(top, again, "ordering should be stable");

    assert!(store.top_by_type(guild, "none", 10).await.unwrap().is_empty());
}

// =============================================================================
// Transactions
// =============================================================================

pub async fn test_append_duplicate_id<S: LedgerStore>(store: &S) {
    let record = tx("test_dup", "a", "b", 1, at(3));

    store
        .append_transaction(&record)
        .await
        .expect("first append should succeed");
    let err = store
        .append_transaction(&record)
        .await
        .expect_err("second append should fail");
    assert!(
        matches!(err, StorageError::DuplicateId(id) if id == record.id),
        "expected DuplicateId, got {:?}",
        err
    );
}

pub async fn test_count_window_half_open<S: LedgerStore>(store: &S) {
    let guild = "test_window";
    let window = day_window(at(3), jst());

    let last_ms = window.end - Duration::milliseconds(1);
    for created_at in [window.start, at(3), last_ms, window.end] {
        store
            .append_transaction(&tx(guild, "g", "r", 1, created_at))
            .await
            .unwrap();
    }
    store
        .append_transaction(&tx(guild, "someone", "r", 1, at(3)))
        .await
        .unwrap();

    let count = store
        .count_transactions_in_window(guild, "mero", "g", window)
        .await
        .unwrap();
    assert_eq!(count, 3, "start and last millisecond count, end does not");

    let next = day_window(window.end, jst());
    let count = store
        .count_transactions_in_window(guild, "mero", "g", next)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

pub async fn test_record_grant_with_quota<S: LedgerStore>(store: &S) {
    let guild = "test_grant_quota";
    let quota = Some(QuotaGuard {
        limit: 2,
        window: day_window(at(3), jst()),
    });

    assert_eq!(store.record_grant(&tx(guild, "g", "r", 10, at(3)), quota).await.unwrap(), 10);
    assert_eq!(store.record_grant(&tx(guild, "g", "r", 20, at(4)), quota).await.unwrap(), 30);

    let err = store
        .record_grant(&tx(guild, "g", "r", 30, at(5)), quota)
        .await
        .expect_err("third grant should exceed the quota");
    assert!(matches!(
        err,
        StorageError::QuotaExhausted {
            limit: 2,
            current: 2
        }
    ));

    assert_eq!(store.get_balance(guild, "r", "mero").await.unwrap(), 30);
    assert_eq!(store.get_balance(guild, "g", "mero").await.unwrap(), 0, "giver not debited");
}

pub async fn test_record_grant_without_quota<S: LedgerStore>(store: &S) {
    let guild = "test_grant_open";
    for _ in 0..5 {
        store
            .record_grant(&tx(guild, "SYSTEM", "r", 2, at(3)), None)
            .await
            .unwrap();
    }
    assert_eq!(store.get_balance(guild, "r", "mero").await.unwrap(), 10);
}

pub async fn test_record_transfer<S: LedgerStore>(store: &S) {
    let guild = "test_transfer";
    store.apply_delta(guild, "g", "mero", 10).await.unwrap();

    let balances = store
        .record_transfer(&tx(guild, "g", "r", 4, at(3)))
        .await
        .unwrap();
    assert_eq!(balances.giver_balance, 6);
    assert_eq!(balances.receiver_balance, 4);

    let err = store
        .record_transfer(&tx(guild, "g", "r", 7, at(4)))
        .await
        .expect_err("overdraft should fail");
    assert!(matches!(
        err,
        StorageError::InsufficientBalance {
            balance: 6,
            required: 7
        }
    ));
    assert_eq!(store.get_balance(guild, "g", "mero").await.unwrap(), 6);
    assert_eq!(store.get_balance(guild, "r", "mero").await.unwrap(), 4);

    // Only the successful transfer was logged.
    let window = day_window(at(3), jst());
    assert_eq!(
        store
            .count_transactions_in_window(guild, "mero", "g", window)
            .await
            .unwrap(),
        1
    );
}

pub async fn test_record_transfer_duplicate_rolls_back<S: LedgerStore>(store: &S) {
    let guild = "test_transfer_dup";
    store.apply_delta(guild, "g", "mero", 10).await.unwrap();

    let record = tx(guild, "g", "r", 3, at(3));
    store.record_transfer(&record).await.unwrap();
    let err = store.record_transfer(&record).await.expect_err("replay should fail");
    assert!(matches!(err, StorageError::DuplicateId(_)));

    assert_eq!(store.get_balance(guild, "g", "mero").await.unwrap(), 7);
    assert_eq!(store.get_balance(guild, "r", "mero").await.unwrap(), 3);
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all LedgerStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_ledger_store_tests {
    ($store:expr) => {
        use $crate::storage::ledger_store_tests::*;

        test_get_balance_absent($store).await;
        println!("  test_get_balance_absent: PASSED");

        test_apply_delta_accumulates($store).await;
        println!("  test_apply_delta_accumulates: PASSED");

        test_list_balances($store).await;
        println!("  test_list_balances: PASSED");

        test_top_by_type($store).await;
        println!("  test_top_by_type: PASSED");

        test_append_duplicate_id($store).await;
        println!("  test_append_duplicate_id: PASSED");

        test_count_window_half_open($store).await;
        println!("  test_count_window_half_open: PASSED");

        test_record_grant_with_quota($store).await;
        println!("  test_record_grant_with_quota: PASSED");

        test_record_grant_without_quota($store).await;
        println!("  test_record_grant_without_quota: PASSED");

        test_record_transfer($store).await;
        println!("  test_record_transfer: PASSED");

        test_record_transfer_duplicate_rolls_back($store).await;
        println!("  test_record_transfer_duplicate_rolls_back: PASSED");
    };
}
