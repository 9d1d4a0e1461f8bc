//! Read-only balance and leaderboard queries.

use std::sync::Arc;

use tracing::error;

use crate::config::LedgerConfig;
use crate::interfaces::{BalanceRow, LedgerStore};

use super::error::{LedgerError, Result};

/// One of a user's balances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    pub type_key: String,
    pub balance: i64,
}

/// One leaderboard position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub balance: i64,
}

impl From<BalanceRow> for BalanceEntry {
    fn from(row: BalanceRow) -> Self {
        Self {
            type_key: row.type_key,
            balance: row.balance,
        }
    }
}

impl From<BalanceRow> for LeaderboardEntry {
    fn from(row: BalanceRow) -> Self {
        Self {
            user_id: row.user_id,
            balance: row.balance,
        }
    }
}

/// Balance lookups and rankings over the ledger store.
pub struct QueryService {
    store: Arc<dyn LedgerStore>,
    default_limit: u32,
    max_limit: u32,
}

impl QueryService {
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            store,
            default_limit: config.default_leaderboard_limit,
            max_limit: config.max_leaderboard_limit,
        }
    }

    /// A user's balances.
    ///
    /// With `type_key`, returns that balance only if it is positive; a zero
    /// balance yields an empty list. Without it, returns every type the user
    /// has a row for, whatever the amount, ordered by type key.
    pub async fn get_balances(
        &self,
        guild_id: &str,
        user_id: &str,
        type_key: Option<&str>,
    ) -> Result<Vec<BalanceEntry>> {
        match type_key {
            Some(type_key) => {
                let balance = self
                    .store
                    .get_balance(guild_id, user_id, type_key)
                    .await
                    .map_err(storage_fault)?;
                if balance > 0 {
                    Ok(vec![BalanceEntry {
                        type_key: type_key.to_string(),
                        balance,
                    }])
                } else {
                    Ok(Vec::new())
                }
            }
            None => Ok(self
                .store
                .list_balances(guild_id, user_id)
                .await
                .map_err(storage_fault)?
                .into_iter()
                .map(BalanceEntry::from)
                .collect()),
        }
    }

    /// Top holders of `type_key`, highest balance first, ties by user id.
    ///
    /// `None` uses the configured default size. An empty board is a valid
    /// result.
    pub async fn get_leaderboard(
        &self,
        guild_id: &str,
        type_key: &str,
        limit: Option<u32>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 || limit > self.max_limit {
            return Err(LedgerError::InvalidLimit {
                limit,
                max: self.max_limit,
            });
        }

        Ok(self
            .store
            .top_by_type(guild_id, type_key, limit)
            .await
            .map_err(storage_fault)?
            .into_iter()
            .map(LeaderboardEntry::from)
            .collect())
    }
}

fn storage_fault(err: crate::interfaces::StorageError) -> LedgerError {
    error!(error = %err, "Ledger query failed");
    LedgerError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::MockLedgerStore;

    fn service_with(store: Arc<MockLedgerStore>) -> QueryService {
        QueryService::new(store, &LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_specific_type_hides_zero_balance() {
        let store = Arc::new(MockLedgerStore::new());
        store.apply_delta("g", "u", "stream", 5).await.unwrap();
        store.apply_delta("g", "u", "stream", -5).await.unwrap();
        let service = service_with(store);

        assert!(service.get_balances("g", "u", Some("stream")).await.unwrap().is_empty());
        assert!(service.get_balances("g", "u", Some("never")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_specific_type_positive_balance() {
        let store = Arc::new(MockLedgerStore::new());
        store.apply_delta("g", "u", "mero", 7).await.unwrap();
        let service = service_with(store);

        let balances = service.get_balances("g", "u", Some("mero")).await.unwrap();
        assert_eq!(
            balances,
            vec![BalanceEntry {
                type_key: "mero".to_string(),
                balance: 7
            }]
        );
    }

    #[tokio::test]
    async fn test_all_types_includes_zero_rows() {
        let store = Arc::new(MockLedgerStore::new());
        store.apply_delta("g", "u", "stream", 3).await.unwrap();
        store.apply_delta("g", "u", "stream", -3).await.unwrap();
        store.apply_delta("g", "u", "mero", 4).await.unwrap();
        store.apply_delta("other", "u", "mero", 9).await.unwrap();
        let service = service_with(store);

        let balances = service.get_balances("g", "u", None).await.unwrap();
        let keys: Vec<_> = balances.iter().map(|b| (b.type_key.as_str(), b.balance)).collect();
        assert_eq!(keys, vec![("mero", 4), ("stream", 0)]);
    }

    #[tokio::test]
    async fn test_leaderboard_default_and_bounds() {
        let store = Arc::new(MockLedgerStore::new());
        for i in 0..15 {
            store
                .apply_delta("g", &format!("user{:02}", i), "mero", i + 1)
                .await
                .unwrap();
        }
        let service = service_with(store);

        let board = service.get_leaderboard("g", "mero", None).await.unwrap();
        assert_eq!(board.len(), 10);
        assert_eq!(board[0].user_id, "user14");
        assert_eq!(board[0].balance, 15);

        assert_eq!(service.get_leaderboard("g", "mero", Some(50)).await.unwrap().len(), 15);
        assert!(matches!(
            service.get_leaderboard("g", "mero", Some(0)).await.unwrap_err(),
            LedgerError::InvalidLimit { limit: 0, max: 50 }
        ));
        assert!(matches!(
            service.get_leaderboard("g", "mero", Some(51)).await.unwrap_err(),
            LedgerError::InvalidLimit { limit: 51, max: 50 }
        ));
    }

    #[tokio::test]
    async fn test_leaderboard_empty_is_ok() {
        let service = service_with(Arc::new(MockLedgerStore::new()));
        assert!(service.get_leaderboard("g", "mero", Some(5)).await.unwrap().is_empty());
    }
}
