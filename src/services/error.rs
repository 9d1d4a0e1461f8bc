//! Ledger operation outcomes.
//!
//! Every rejection the ledger can produce is a variant here, carrying the
//! values a caller needs to explain it. Storage faults collapse into
//! [`LedgerError::Internal`], whose display text reveals nothing.

use uuid::Uuid;

use crate::interfaces::StorageError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Amount must be between 1 and {max}, got {amount}")]
    InvalidAmount { amount: i64, max: i64 },

    #[error("Message must be between {min} and {max} characters, got {length}")]
    InvalidMessage { length: usize, min: usize, max: usize },

    #[error("Cannot send points to yourself")]
    SelfSendNotAllowed,

    #[error("Bots cannot send or receive points")]
    BotTargetNotAllowed,

    #[error("Point type not found: {0}")]
    PointTypeNotFound(String),

    #[error("Point type is disabled: {0}")]
    PointTypeDisabled(String),

    #[error("Daily limit exceeded ({current}/{limit})")]
    DailyLimitExceeded { limit: i64, current: i64 },

    #[error("Insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: i64, required: i64 },

    #[error("Giver and receiver are not in the same session")]
    NotInSameSession,

    #[error("Receiver is not broadcasting")]
    ReceiverNotBroadcasting,

    #[error("Leaderboard limit must be between 1 and {max}, got {limit}")]
    InvalidLimit { limit: u32, max: u32 },

    #[error("Transaction id collision: {0}")]
    DuplicateId(Uuid),

    #[error("internal error")]
    Internal(#[source] StorageError),
}

impl LedgerError {
    /// Faults that are not the caller's doing.
    ///
    /// The caller should show a generic failure for these instead of the
    /// error text.
    pub fn is_internal(&self) -> bool {
        matches!(self, LedgerError::Internal(_) | LedgerError::DuplicateId(_))
    }
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::QuotaExhausted { limit, current } => {
                LedgerError::DailyLimitExceeded { limit, current }
            }
            StorageError::InsufficientBalance { balance, required } => {
                LedgerError::InsufficientBalance { balance, required }
            }
            StorageError::DuplicateId(id) => LedgerError::DuplicateId(id),
            other => LedgerError::Internal(other),
        }
    }
}
