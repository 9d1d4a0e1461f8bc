//! Shared storage integration tests.
//!
//! Tests the LedgerStore and PointTypeRegistry interfaces against a concrete
//! implementation. Each implementation module imports these test functions
//! and runs them.

pub mod ledger_store_tests;
pub mod point_type_registry_tests;
