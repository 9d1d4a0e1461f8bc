//! Mock storage implementations for testing.
//!
//! Both stores keep everything in memory behind a single lock, which gives
//! the same all-or-nothing behavior as the SQLite units.

mod ledger_store;
mod point_type_registry;

pub use ledger_store::MockLedgerStore;
pub use point_type_registry::MockPointTypeRegistry;
