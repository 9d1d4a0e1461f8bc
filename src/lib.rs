//! PointLedger - per-community points ledger
//!
//! Balances per (guild, user, point type), quota-limited gifts, tips backed
//! by the giver's balance, leaderboards, and a scheduler that grants points
//! for presence in live sessions. Everything is stored in SQLite.

pub mod calendar;
pub mod config;
pub mod facade;
pub mod interfaces;
pub mod services;
pub mod storage;
pub mod utils;

pub use facade::{PointLedger, PointLedgerError};
