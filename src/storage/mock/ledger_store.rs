use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::calendar::DayWindow;
use crate::storage::{
    BalanceRow, LedgerStore, QuotaGuard, Result, StorageError, TransactionRecord,
    TransferBalances,
};

/// Key type for balances: (guild, user, type).
type BalanceKey = (String, String, String);

#[derive(Default)]
struct LedgerState {
    balances: BTreeMap<BalanceKey, i64>,
    transactions: Vec<TransactionRecord>,
}

impl LedgerState {
    fn balance(&self, guild_id: &str, user_id: &str, type_key: &str) -> i64 {
        self.balances
            .get(&(guild_id.to_string(), user_id.to_string(), type_key.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn add(&mut self, guild_id: &str, user_id: &str, type_key: &str, delta: i64) -> i64 {
        let entry = self
            .balances
            .entry((guild_id.to_string(), user_id.to_string(), type_key.to_string()))
            .or_insert(0);
        *entry += delta;
        *entry
    }

    fn count(&self, guild_id: &str, type_key: &str, giver_user_id: &str, window: DayWindow) -> i64 {
        self.transactions
            .iter()
            .filter(|t| {
                t.guild_id == guild_id
                    && t.type_key == type_key
                    && t.giver_user_id == giver_user_id
                    && window.contains(t.created_at)
            })
            .count() as i64
    }

    fn check_unique(&self, record: &TransactionRecord) -> Result<()> {
        if self.transactions.iter().any(|t| t.id == record.id) {
            return Err(StorageError::DuplicateId(record.id));
        }
        Ok(())
    }
}

fn to_row(key: &BalanceKey, balance: i64) -> BalanceRow {
    BalanceRow {
        guild_id: key.0.clone(),
        user_id: key.1.clone(),
        type_key: key.2.clone(),
        balance,
    }
}

/// Mock ledger store that keeps balances and transactions in memory.
#[derive(Default)]
pub struct MockLedgerStore {
    state: Mutex<LedgerState>,
    fail_on_write: RwLock<bool>,
    failing_users: RwLock<HashSet<String>>,
}

impl MockLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutating call fail with `Unavailable`.
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    /// Make mutating calls whose receiver (or delta target) is `user_id` fail.
    pub async fn fail_for_user(&self, user_id: &str) {
        self.failing_users.write().await.insert(user_id.to_string());
    }

    /// Snapshot of the transaction log, in insertion order.
    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.state.lock().await.transactions.clone()
    }

    async fn check_write(&self, user_id: &str) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Unavailable("write failure injected".to_string()));
        }
        if self.failing_users.read().await.contains(user_id) {
            return Err(StorageError::Unavailable(format!(
                "write failure injected for {}",
                user_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MockLedgerStore {
    async fn apply_delta(
        &self,
        guild_id: &str,
        user_id: &str,
        type_key: &str,
        delta: i64,
    ) -> Result<i64> {
        self.check_write(user_id).await?;
        let mut state = self.state.lock().await;
        Ok(state.add(guild_id, user_id, type_key, delta))
    }

    async fn get_balance(&self, guild_id: &str, user_id: &str, type_key: &str) -> Result<i64> {
        Ok(self.state.lock().await.balance(guild_id, user_id, type_key))
    }

    async fn list_balances(&self, guild_id: &str, user_id: &str) -> Result<Vec<BalanceRow>> {
        let state = self.state.lock().await;
        // BTreeMap order puts a user's types in key order.
        Ok(state
            .balances
            .iter()
            .filter(|(key, _)| key.0 == guild_id && key.1 == user_id)
            .map(|(key, balance)| to_row(key, *balance))
            .collect())
    }

    async fn top_by_type(
        &self,
        guild_id: &str,
        type_key: &str,
        limit: u32,
    ) -> Result<Vec<BalanceRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<BalanceRow> = state
            .balances
            .iter()
            .filter(|(key, _)| key.0 == guild_id && key.2 == type_key)
            .map(|(key, balance)| to_row(key, *balance))
            .collect();
        rows.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.user_id.cmp(&b.user_id)));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn append_transaction(&self, record: &TransactionRecord) -> Result<()> {
        self.check_write(&record.receiver_user_id).await?;
        let mut state = self.state.lock().await;
        state.check_unique(record)?;
        state.transactions.push(record.clone());
        Ok(())
    }

    async fn count_transactions_in_window(
        &self,
        guild_id: &str,
        type_key: &str,
        giver_user_id: &str,
        window: DayWindow,
    ) -> Result<i64> {
        Ok(self
            .state
            .lock()
            .await
            .count(guild_id, type_key, giver_user_id, window))
    }

    async fn record_grant(
        &self,
        record: &TransactionRecord,
        quota: Option<QuotaGuard>,
    ) -> Result<i64> {
        self.check_write(&record.receiver_user_id).await?;
        let mut state = self.state.lock().await;

        if let Some(quota) = quota {
            let current = state.count(
                &record.guild_id,
                &record.type_key,
                &record.giver_user_id,
                quota.window,
            );
            if current >= quota.limit {
                return Err(StorageError::QuotaExhausted {
                    limit: quota.limit,
                    current,
                });
            }
        }

        state.check_unique(record)?;
        state.transactions.push(record.clone());
        Ok(state.add(
            &record.guild_id,
            &record.receiver_user_id,
            &record.type_key,
            record.amount,
        ))
    }

    async fn record_transfer(&self, record: &TransactionRecord) -> Result<TransferBalances> {
        self.check_write(&record.receiver_user_id).await?;
        let mut state = self.state.lock().await;

        let balance = state.balance(&record.guild_id, &record.giver_user_id, &record.type_key);
        if balance < record.amount {
            return Err(StorageError::InsufficientBalance {
                balance,
                required: record.amount,
            });
        }
        state.check_unique(record)?;

        let giver_balance = state.add(
            &record.guild_id,
            &record.giver_user_id,
            &record.type_key,
            -record.amount,
        );
        let receiver_balance = state.add(
            &record.guild_id,
            &record.receiver_user_id,
            &record.type_key,
            record.amount,
        );
        state.transactions.push(record.clone());

        Ok(TransferBalances {
            giver_balance,
            receiver_balance,
        })
    }
}
