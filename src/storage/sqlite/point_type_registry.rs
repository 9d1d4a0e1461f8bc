//! SQLite PointTypeRegistry implementation.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use crate::storage::schema::PointTypes;
use crate::storage::{PointType, PointTypeRegistry, Result};

/// SQLite-backed point-type registry.
pub struct SqlitePointTypeRegistry {
    pool: SqlitePool,
}

impl SqlitePointTypeRegistry {
    /// Create a new SQLite point-type registry.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert `point_type` unless its key is already present.
    ///
    /// Returns true when a row was inserted. Existing rows keep whatever an
    /// administrator last set.
    pub async fn insert_if_absent(&self, point_type: &PointType) -> Result<bool> {
        let query = Query::insert()
            .into_table(PointTypes::Table)
            .columns([
                PointTypes::Key,
                PointTypes::Name,
                PointTypes::DailyLimitCount,
                PointTypes::IsEnabled,
            ])
            .values_panic(row_values(point_type))
            .on_conflict(OnConflict::column(PointTypes::Key).do_nothing().to_owned())
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_values(point_type: &PointType) -> [sea_query::SimpleExpr; 4] {
    [
        point_type.key.as_str().into(),
        point_type.display_name.as_str().into(),
        point_type.daily_gift_quota.into(),
        i64::from(point_type.enabled).into(),
    ]
}

fn point_type_from_row(row: &sqlx::sqlite::SqliteRow) -> PointType {
    PointType {
        key: row.get("key"),
        display_name: row.get("name"),
        daily_gift_quota: row.get("daily_limit_count"),
        enabled: row.get::<i64, _>("is_enabled") != 0,
    }
}

#[async_trait]
impl PointTypeRegistry for SqlitePointTypeRegistry {
    async fn lookup(&self, key: &str) -> Result<Option<PointType>> {
        let query = Query::select()
            .columns([
                PointTypes::Key,
                PointTypes::Name,
                PointTypes::DailyLimitCount,
                PointTypes::IsEnabled,
            ])
            .from(PointTypes::Table)
            .and_where(Expr::col(PointTypes::Key).eq(key))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        Ok(row.as_ref().map(point_type_from_row))
    }

    async fn upsert(&self, point_type: &PointType) -> Result<()> {
        let query = Query::insert()
            .into_table(PointTypes::Table)
            .columns([
                PointTypes::Key,
                PointTypes::Name,
                PointTypes::DailyLimitCount,
                PointTypes::IsEnabled,
            ])
            .values_panic(row_values(point_type))
            .on_conflict(
                OnConflict::column(PointTypes::Key)
                    .update_columns([
                        PointTypes::Name,
                        PointTypes::DailyLimitCount,
                        PointTypes::IsEnabled,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<PointType>> {
        let query = Query::select()
            .columns([
                PointTypes::Key,
                PointTypes::Name,
                PointTypes::DailyLimitCount,
                PointTypes::IsEnabled,
            ])
            .from(PointTypes::Table)
            .order_by(PointTypes::Key, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(point_type_from_row).collect())
    }
}
