//! Ledger services: transfers, queries and passive rewards.

pub mod error;
pub mod points;
pub mod query;
pub mod rewards;

pub use error::{LedgerError, Result};
pub use points::{GiveParams, GiveReceipt, PointsService, TipEligibility, TipParams, TipReceipt};
pub use query::{BalanceEntry, LeaderboardEntry, QueryService};
pub use rewards::{
    GroupPresence, JsonFilePresenceSource, PresenceError, PresenceSource, RewardScheduler,
    TickReport, STREAMING_REWARD, SYSTEM_SENDER_ID, VIEWING_REWARD,
};
