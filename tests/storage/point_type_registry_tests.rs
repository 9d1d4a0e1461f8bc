//! PointTypeRegistry interface tests.
//!
//! Keys are prefixed with `test_` so seeded types do not interfere.

use pointledger::storage::{PointType, PointTypeRegistry};

pub async fn test_lookup_missing<R: PointTypeRegistry>(registry: &R) {
    let result = registry
        .lookup("test_missing")
        .await
        .expect("lookup should succeed");
    assert!(result.is_none(), "unknown key should be None");
}

pub async fn test_upsert_and_lookup<R: PointTypeRegistry>(registry: &R) {
    let kudos = PointType::new("test_kudos", "Kudos", 3);
    registry.upsert(&kudos).await.expect("upsert should succeed");

    let found = registry
        .lookup("test_kudos")
        .await
        .unwrap()
        .expect("type should exist");
    assert_eq!(found, kudos);
    assert!(found.enabled);
}

pub async fn test_upsert_replaces<R: PointTypeRegistry>(registry: &R) {
    registry
        .upsert(&PointType::new("test_replace", "Before", 5))
        .await
        .unwrap();
    let after = PointType::new("test_replace", "After", 1).disabled();
    registry.upsert(&after).await.unwrap();

    let found = registry.lookup("test_replace").await.unwrap().unwrap();
    assert_eq!(found, after);
    assert!(!found.enabled);
}

pub async fn test_list_ordered_by_key<R: PointTypeRegistry>(registry: &R) {
    registry
        .upsert(&PointType::new("test_list_b", "B", 1))
        .await
        .unwrap();
    registry
        .upsert(&PointType::new("test_list_a", "A", 1))
        .await
        .unwrap();

    let keys: Vec<_> = registry
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.key)
        .filter(|k| k.starts_with("test_list_"))
        .collect();
    assert_eq!(keys, vec!["test_list_a", "test_list_b"]);
}

/// Run all PointTypeRegistry interface tests against an implementation.
#[macro_export]
macro_rules! run_point_type_registry_tests {
    ($registry:expr) => {
        use $crate::storage::point_type_registry_tests::*;

        test_lookup_missing($registry).await;
        println!("  test_lookup_missing: PASSED");

        test_upsert_and_lookup($registry).await;
        println!("  test_upsert_and_lookup: PASSED");

        test_upsert_replaces($registry).await;
        println!("  test_upsert_replaces: PASSED");

        test_list_ordered_by_key($registry).await;
        println!("  test_list_ordered_by_key: PASSED");
    };
}
