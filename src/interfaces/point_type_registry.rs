//! Point-type registry interface.

use async_trait::async_trait;

use super::ledger_store::Result;

/// A named currency with its own enablement flag and daily gift quota.
///
/// `daily_gift_quota == 0` marks a type that can only be granted by the
/// system; every give of it is quota-exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointType {
    pub key: String,
    pub display_name: String,
    pub daily_gift_quota: i64,
    pub enabled: bool,
}

impl PointType {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, daily_gift_quota: i64) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            daily_gift_quota,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Read-mostly table of point types.
///
/// The ledger only calls `lookup`; `upsert` and `list` exist for
/// administrative seeding.
#[async_trait]
pub trait PointTypeRegistry: Send + Sync {
    /// Find a point type by key.
    async fn lookup(&self, key: &str) -> Result<Option<PointType>>;

    /// Insert or replace a point type.
    async fn upsert(&self, point_type: &PointType) -> Result<()>;

    /// All point types, ordered by key.
    async fn list(&self) -> Result<Vec<PointType>>;
}
