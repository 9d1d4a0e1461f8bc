//! Abstract interfaces for pointledger components.
//!
//! These traits define the contracts for:
//! - Ledger storage (balances and the transaction log)
//! - Point-type registry (currency configuration)

pub mod ledger_store;
pub mod point_type_registry;

pub use ledger_store::{
    BalanceRow, LedgerStore, QuotaGuard, Result, StorageError, TransactionRecord,
    TransferBalances,
};
pub use point_type_registry::{PointType, PointTypeRegistry};
