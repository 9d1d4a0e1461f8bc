//! PointLedger facade for in-process library usage.
//!
//! Opens storage, seeds the default point types and wires the services
//! together, so the chat integration only deals with one handle.
//!
//! # Example
//!
//! ```ignore
//! use pointledger::config::Config;
//! use pointledger::facade::PointLedger;
//!
//! let ledger = PointLedger::open(&Config::for_test()).await?;
//! let receipt = ledger.give(params).await?;
//! let board = ledger.get_leaderboard("guild", "mero", None).await?;
//! ```

use std::sync::Arc;

use crate::calendar::Clock;
use crate::config::{Config, ConfigError};
use crate::interfaces::{LedgerStore, PointType, PointTypeRegistry, StorageError};
use crate::services::{
    BalanceEntry, GiveParams, GiveReceipt, LeaderboardEntry, PresenceSource, PointsService,
    QueryService, RewardScheduler, TipParams, TipReceipt,
};
use crate::storage::{init_storage, Storage};

/// Errors opening a ledger.
#[derive(Debug, thiserror::Error)]
pub enum PointLedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Ledger handle: transfers, queries and point-type administration.
pub struct PointLedger {
    config: Config,
    storage: Storage,
    points: PointsService,
    query: QueryService,
}

impl PointLedger {
    /// Open (and if needed create and seed) the ledger described by `config`.
    pub async fn open(config: &Config) -> Result<Self, PointLedgerError> {
        config.validate()?;
        let storage = init_storage(&config.storage).await?;

        let store: Arc<dyn LedgerStore> = storage.ledger.clone();
        let points = PointsService::new(
            store.clone(),
            storage.registry.clone(),
            config.ledger.clone(),
        )?;
        let query = QueryService::new(store, &config.ledger);

        Ok(Self {
            config: config.clone(),
            storage,
            points,
            query,
        })
    }

    /// Replace the clock used for quota windows and timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.points = self.points.with_clock(clock);
        self
    }

    pub async fn give(&self, params: GiveParams) -> crate::services::Result<GiveReceipt> {
        self.points.give(params).await
    }

    pub async fn tip(&self, params: TipParams) -> crate::services::Result<TipReceipt> {
        self.points.tip(params).await
    }

    pub async fn get_balances(
        &self,
        guild_id: &str,
        user_id: &str,
        type_key: Option<&str>,
    ) -> crate::services::Result<Vec<BalanceEntry>> {
        self.query.get_balances(guild_id, user_id, type_key).await
    }

    pub async fn get_leaderboard(
        &self,
        guild_id: &str,
        type_key: &str,
        limit: Option<u32>,
    ) -> crate::services::Result<Vec<LeaderboardEntry>> {
        self.query.get_leaderboard(guild_id, type_key, limit).await
    }

    /// Create or replace a point type.
    pub async fn upsert_point_type(&self, point_type: &PointType) -> Result<(), StorageError> {
        self.storage.registry.upsert(point_type).await
    }

    /// All point types, ordered by key.
    pub async fn point_types(&self) -> Result<Vec<PointType>, StorageError> {
        self.storage.registry.list().await
    }

    /// Build a reward scheduler over this ledger's store.
    ///
    /// The scheduler is not started.
    pub fn reward_scheduler(&self, presence: Arc<dyn PresenceSource>) -> RewardScheduler {
        RewardScheduler::new(
            self.config.rewards.clone(),
            self.config.ledger.reward_type_key.clone(),
            self.storage.ledger.clone(),
            presence,
        )
    }

    /// Direct access to storage.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.storage.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{GroupPresence, LedgerError, TipEligibility};

    fn give(giver: &str, receiver: &str, amount: i64) -> GiveParams {
        GiveParams {
            guild_id: "guild".to_string(),
            type_key: "mero".to_string(),
            giver_user_id: giver.to_string(),
            giver_is_bot: false,
            receiver_user_id: receiver.to_string(),
            receiver_is_bot: false,
            amount,
            message: "nice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_seeds_point_types() {
        let ledger = PointLedger::open(&Config::for_test()).await.unwrap();
        let keys: Vec<_> = ledger
            .point_types()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.key)
            .collect();
        assert_eq!(keys, vec!["mero", "stream"]);
    }

    #[tokio::test]
    async fn test_give_and_query() {
        let ledger = PointLedger::open(&Config::for_test()).await.unwrap();

        let receipt = ledger.give(give("a", "b", 15)).await.unwrap();
        assert_eq!(receipt.new_balance, 15);
        ledger.give(give("a", "c", 5)).await.unwrap();

        let balances = ledger.get_balances("guild", "b", Some("mero")).await.unwrap();
        assert_eq!(balances[0].balance, 15);

        let board = ledger.get_leaderboard("guild", "mero", None).await.unwrap();
        let users: Vec<_> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(users, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_disabled_type_rejected() {
        let ledger = PointLedger::open(&Config::for_test()).await.unwrap();
        ledger
            .upsert_point_type(&PointType::new("mero", "Mero Points", 10).disabled())
            .await
            .unwrap();

        assert!(matches!(
            ledger.give(give("a", "b", 1)).await.unwrap_err(),
            LedgerError::PointTypeDisabled(_)
        ));
    }

    #[tokio::test]
    async fn test_rewards_then_tip() {
        let mut config = Config::for_test();
        config.rewards.enabled = true;
        let ledger = PointLedger::open(&config).await.unwrap();

        struct NoPresence;
        #[async_trait::async_trait]
        impl PresenceSource for NoPresence {
            async fn snapshot(
                &self,
            ) -> Result<Vec<GroupPresence>, crate::services::PresenceError> {
                Ok(Vec::new())
            }
        }

        let scheduler = ledger.reward_scheduler(Arc::new(NoPresence));
        let group = GroupPresence {
            guild_id: "guild".to_string(),
            group_id: "voice".to_string(),
            broadcasters: ["s".to_string()].into_iter().collect(),
            participants: ["v".to_string()].into_iter().collect(),
        };
        for _ in 0..3 {
            scheduler.process_tick(std::slice::from_ref(&group)).await;
        }

        let receipt = ledger
            .tip(TipParams {
                guild_id: "guild".to_string(),
                giver_user_id: "v".to_string(),
                giver_is_bot: false,
                receiver_user_id: "s".to_string(),
                receiver_is_bot: false,
                amount: 2,
                message: None,
                eligibility: TipEligibility {
                    same_session: true,
                    receiver_broadcasting: true,
                },
            })
            .await
            .unwrap();
        assert_eq!(receipt.giver_balance, 1);
        assert_eq!(receipt.receiver_balance, 8);
    }
}
