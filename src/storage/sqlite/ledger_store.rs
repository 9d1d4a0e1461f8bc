//! SQLite LedgerStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Func, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use crate::calendar::{format_timestamp, DayWindow};
use crate::storage::schema::{PointTransactions, UserPoints};
use crate::storage::{
    BalanceRow, LedgerStore, QuotaGuard, Result, StorageError, TransactionRecord,
    TransferBalances,
};

/// SQLite implementation of LedgerStore.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Create a new SQLite ledger store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Start a write transaction.
    ///
    /// BEGIN IMMEDIATE takes the write lock upfront, so two units racing on the
    /// same balance serialize instead of failing to upgrade a shared lock.
    async fn begin_immediate(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(())
    }

    /// Commit on success, roll back on failure.
    async fn finish<T>(conn: &mut SqliteConnection, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn upsert_delta(
        conn: &mut SqliteConnection,
        guild_id: &str,
        user_id: &str,
        type_key: &str,
        delta: i64,
    ) -> Result<i64> {
        let query = Query::insert()
            .into_table(UserPoints::Table)
            .columns([
                UserPoints::GuildId,
                UserPoints::UserId,
                UserPoints::TypeKey,
                UserPoints::Balance,
            ])
            .values_panic([guild_id.into(), user_id.into(), type_key.into(), delta.into()])
            .on_conflict(
                OnConflict::columns([UserPoints::GuildId, UserPoints::UserId, UserPoints::TypeKey])
                    .value(UserPoints::Balance, Expr::col(UserPoints::Balance).add(delta))
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;

        Self::select_balance(conn, guild_id, user_id, type_key).await
    }

    async fn select_balance(
        conn: &mut SqliteConnection,
        guild_id: &str,
        user_id: &str,
        type_key: &str,
    ) -> Result<i64> {
        let query = Query::select()
            .column(UserPoints::Balance)
            .from(UserPoints::Table)
            .and_where(Expr::col(UserPoints::GuildId).eq(guild_id))
            .and_where(Expr::col(UserPoints::UserId).eq(user_id))
            .and_where(Expr::col(UserPoints::TypeKey).eq(type_key))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;

        Ok(row.map(|r| r.get::<i64, _>("balance")).unwrap_or(0))
    }

    async fn insert_transaction(conn: &mut SqliteConnection, record: &TransactionRecord) -> Result<()> {
        let query = Query::insert()
            .into_table(PointTransactions::Table)
            .columns([
                PointTransactions::Id,
                PointTransactions::GuildId,
                PointTransactions::TypeKey,
                PointTransactions::GiverUserId,
                PointTransactions::ReceiverUserId,
                PointTransactions::Amount,
                PointTransactions::Message,
                PointTransactions::CreatedAt,
            ])
            .values_panic([
                record.id.to_string().into(),
                record.guild_id.as_str().into(),
                record.type_key.as_str().into(),
                record.giver_user_id.as_str().into(),
                record.receiver_user_id.as_str().into(),
                record.amount.into(),
                record.message.as_str().into(),
                format_timestamp(record.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query)
            .execute(&mut *conn)
            .await
            .map_err(|e| duplicate_or_database(record.id, e))?;

        Ok(())
    }

    async fn count_in_window(
        conn: &mut SqliteConnection,
        guild_id: &str,
        type_key: &str,
        giver_user_id: &str,
        window: DayWindow,
    ) -> Result<i64> {
        let query = Query::select()
            .expr(Func::count(Expr::col(PointTransactions::Id)))
            .from(PointTransactions::Table)
            .and_where(Expr::col(PointTransactions::GuildId).eq(guild_id))
            .and_where(Expr::col(PointTransactions::TypeKey).eq(type_key))
            .and_where(Expr::col(PointTransactions::GiverUserId).eq(giver_user_id))
            .and_where(Expr::col(PointTransactions::CreatedAt).gte(format_timestamp(window.start)))
            .and_where(Expr::col(PointTransactions::CreatedAt).lt(format_timestamp(window.end)))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&mut *conn).await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn grant_within(
        conn: &mut SqliteConnection,
        record: &TransactionRecord,
        quota: Option<QuotaGuard>,
    ) -> Result<i64> {
        if let Some(quota) = quota {
            let current = Self::count_in_window(
                conn,
                &record.guild_id,
                &record.type_key,
                &record.giver_user_id,
                quota.window,
            )
            .await?;
            if current >= quota.limit {
                return Err(StorageError::QuotaExhausted {
                    limit: quota.limit,
                    current,
                });
            }
        }

        Self::insert_transaction(conn, record).await?;
        Self::upsert_delta(
            conn,
            &record.guild_id,
            &record.receiver_user_id,
            &record.type_key,
            record.amount,
        )
        .await
    }

    async fn transfer_within(
        conn: &mut SqliteConnection,
        record: &TransactionRecord,
    ) -> Result<TransferBalances> {
        let balance =
            Self::select_balance(conn, &record.guild_id, &record.giver_user_id, &record.type_key)
                .await?;
        if balance < record.amount {
            return Err(StorageError::InsufficientBalance {
                balance,
                required: record.amount,
            });
        }

        let giver_balance = Self::upsert_delta(
            conn,
            &record.guild_id,
            &record.giver_user_id,
            &record.type_key,
            -record.amount,
        )
        .await?;
        let receiver_balance = Self::upsert_delta(
            conn,
            &record.guild_id,
            &record.receiver_user_id,
            &record.type_key,
            record.amount,
        )
        .await?;
        Self::insert_transaction(conn, record).await?;

        Ok(TransferBalances {
            giver_balance,
            receiver_balance,
        })
    }
}

fn duplicate_or_database(id: Uuid, err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::DuplicateId(id),
        _ => StorageError::Database(err),
    }
}

fn balance_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Vec<BalanceRow> {
    rows.iter()
        .map(|r| BalanceRow {
            guild_id: r.get("guild_id"),
            user_id: r.get("user_id"),
            type_key: r.get("type_key"),
            balance: r.get("balance"),
        })
        .collect()
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn apply_delta(
        &self,
        guild_id: &str,
        user_id: &str,
        type_key: &str,
        delta: i64,
    ) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::begin_immediate(&mut conn).await?;

        let result = Self::upsert_delta(&mut conn, guild_id, user_id, type_key, delta).await;

        Self::finish(&mut conn, result).await
    }

    async fn get_balance(&self, guild_id: &str, user_id: &str, type_key: &str) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::select_balance(&mut conn, guild_id, user_id, type_key).await
    }

    async fn list_balances(&self, guild_id: &str, user_id: &str) -> Result<Vec<BalanceRow>> {
        let query = Query::select()
            .columns([
                UserPoints::GuildId,
                UserPoints::UserId,
                UserPoints::TypeKey,
                UserPoints::Balance,
            ])
            .from(UserPoints::Table)
            .and_where(Expr::col(UserPoints::GuildId).eq(guild_id))
            .and_where(Expr::col(UserPoints::UserId).eq(user_id))
            .order_by(UserPoints::TypeKey, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        Ok(balance_rows(rows))
    }

    async fn top_by_type(
        &self,
        guild_id: &str,
        type_key: &str,
        limit: u32,
    ) -> Result<Vec<BalanceRow>> {
        let query = Query::select()
            .columns([
                UserPoints::GuildId,
                UserPoints::UserId,
                UserPoints::TypeKey,
                UserPoints::Balance,
            ])
            .from(UserPoints::Table)
            .and_where(Expr::col(UserPoints::GuildId).eq(guild_id))
            .and_where(Expr::col(UserPoints::TypeKey).eq(type_key))
            .order_by(UserPoints::Balance, Order::Desc)
            .order_by(UserPoints::UserId, Order::Asc)
            .limit(u64::from(limit))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        Ok(balance_rows(rows))
    }

    async fn append_transaction(&self, record: &TransactionRecord) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_transaction(&mut conn, record).await
    }

    async fn count_transactions_in_window(
        &self,
        guild_id: &str,
        type_key: &str,
        giver_user_id: &str,
        window: DayWindow,
    ) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::count_in_window(&mut conn, guild_id, type_key, giver_user_id, window).await
    }

    async fn record_grant(
        &self,
        record: &TransactionRecord,
        quota: Option<QuotaGuard>,
    ) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::begin_immediate(&mut conn).await?;

        let result = Self::grant_within(&mut conn, record, quota).await;

        Self::finish(&mut conn, result).await
    }

    async fn record_transfer(&self, record: &TransactionRecord) -> Result<TransferBalances> {
        let mut conn = self.pool.acquire().await?;
        Self::begin_immediate(&mut conn).await?;

        let result = Self::transfer_within(&mut conn, record).await;

        Self::finish(&mut conn, result).await
    }
}
