//! Ledger storage interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::calendar::DayWindow;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Transaction id already exists: {0}")]
    DuplicateId(Uuid),

    #[error("Daily quota exhausted: {current}/{limit}")]
    QuotaExhausted { limit: i64, current: i64 },

    #[error("Insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: i64, required: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// One balance row: `(guild, user, point type) -> amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRow {
    pub guild_id: String,
    pub user_id: String,
    pub type_key: String,
    pub balance: i64,
}

/// Immutable audit record of a grant or transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub guild_id: String,
    pub type_key: String,
    pub giver_user_id: String,
    pub receiver_user_id: String,
    pub amount: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Quota condition evaluated inside a grant's atomic unit.
///
/// The grant is refused with [`StorageError::QuotaExhausted`] when the giver
/// already has `limit` or more transactions of the record's type in `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaGuard {
    pub limit: i64,
    pub window: DayWindow,
}

/// Balances of both parties after a debit/credit transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferBalances {
    pub giver_balance: i64,
    pub receiver_balance: i64,
}

/// Interface for the points ledger.
///
/// Balances only ever change by additive deltas, so concurrent increments to
/// the same key compose. Composite operations (`record_grant`,
/// `record_transfer`) commit all of their effects or none of them.
///
/// Implementations:
/// - `SqliteLedgerStore`: SQLite storage
/// - `MockLedgerStore`: in-memory storage for tests
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Add `delta` to a balance, creating the row at 0 first if needed.
    ///
    /// Returns the balance after the delta is applied.
    async fn apply_delta(
        &self,
        guild_id: &str,
        user_id: &str,
        type_key: &str,
        delta: i64,
    ) -> Result<i64>;

    /// Current balance, 0 if the user never touched this type.
    async fn get_balance(&self, guild_id: &str, user_id: &str, type_key: &str) -> Result<i64>;

    /// Every balance row the user has in the guild, ordered by type key.
    async fn list_balances(&self, guild_id: &str, user_id: &str) -> Result<Vec<BalanceRow>>;

    /// Highest balances for a type, descending; ties by user id ascending.
    async fn top_by_type(
        &self,
        guild_id: &str,
        type_key: &str,
        limit: u32,
    ) -> Result<Vec<BalanceRow>>;

    /// Append an audit record. Fails with `DuplicateId` if the id exists.
    async fn append_transaction(&self, record: &TransactionRecord) -> Result<()>;

    /// Count transactions sent by `giver_user_id` with `created_at` in `window`.
    async fn count_transactions_in_window(
        &self,
        guild_id: &str,
        type_key: &str,
        giver_user_id: &str,
        window: DayWindow,
    ) -> Result<i64>;

    /// Atomically append `record` and credit its receiver.
    ///
    /// When `quota` is given it is re-checked inside the same unit.
    /// Returns the receiver's new balance.
    async fn record_grant(&self, record: &TransactionRecord, quota: Option<QuotaGuard>)
        -> Result<i64>;

    /// Atomically debit the giver, credit the receiver and append `record`.
    ///
    /// The giver's balance is checked inside the unit; a shortfall fails
    /// with `InsufficientBalance` and leaves no effect.
    async fn record_transfer(&self, record: &TransactionRecord) -> Result<TransferBalances>;
}
