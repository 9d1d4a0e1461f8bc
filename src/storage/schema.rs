//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Point types table schema.
#[derive(Iden)]
pub enum PointTypes {
    Table,
    #[iden = "key"]
    Key,
    #[iden = "name"]
    Name,
    #[iden = "daily_limit_count"]
    DailyLimitCount,
    #[iden = "is_enabled"]
    IsEnabled,
}

/// Balances table schema.
#[derive(Iden)]
pub enum UserPoints {
    Table,
    #[iden = "guild_id"]
    GuildId,
    #[iden = "user_id"]
    UserId,
    #[iden = "type_key"]
    TypeKey,
    #[iden = "balance"]
    Balance,
}

/// Transaction log schema.
#[derive(Iden)]
pub enum PointTransactions {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "guild_id"]
    GuildId,
    #[iden = "type_key"]
    TypeKey,
    #[iden = "giver_user_id"]
    GiverUserId,
    #[iden = "receiver_user_id"]
    ReceiverUserId,
    #[iden = "amount"]
    Amount,
    #[iden = "message"]
    Message,
    #[iden = "created_at"]
    CreatedAt,
}

/// SQL for creating the point types table.
pub const CREATE_POINT_TYPES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS point_types (
    key TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    daily_limit_count INTEGER NOT NULL,
    is_enabled INTEGER NOT NULL
)
"#;

/// SQL for creating the balances table.
pub const CREATE_USER_POINTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_points (
    guild_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    type_key TEXT NOT NULL,
    balance INTEGER NOT NULL,
    PRIMARY KEY (guild_id, user_id, type_key)
)
"#;

/// SQL for creating the transaction log.
pub const CREATE_POINT_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS point_transactions (
    id TEXT PRIMARY KEY,
    guild_id TEXT NOT NULL,
    type_key TEXT NOT NULL,
    giver_user_id TEXT NOT NULL,
    receiver_user_id TEXT NOT NULL,
    amount INTEGER NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

/// Index backing the daily quota count.
pub const CREATE_QUOTA_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_point_transactions_quota
    ON point_transactions(guild_id, type_key, giver_user_id, created_at)
"#;

/// Index backing leaderboards.
pub const CREATE_LEADERBOARD_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_user_points_leaderboard
    ON user_points(guild_id, type_key, balance DESC, user_id)
"#;

/// All schema statements, in creation order.
pub const SCHEMA: &[&str] = &[
    CREATE_POINT_TYPES_TABLE,
    CREATE_USER_POINTS_TABLE,
    CREATE_POINT_TRANSACTIONS_TABLE,
    CREATE_QUOTA_INDEX,
    CREATE_LEADERBOARD_INDEX,
];
