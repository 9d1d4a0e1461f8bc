//! SQLite implementations of storage interfaces.

mod ledger_store;
mod point_type_registry;

pub use ledger_store::SqliteLedgerStore;
pub use point_type_registry::SqlitePointTypeRegistry;
