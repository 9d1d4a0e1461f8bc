//! Storage implementations.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::config::StorageConfig;

pub mod mock;
pub mod schema;
pub mod sqlite;

pub use crate::interfaces::{
    BalanceRow, LedgerStore, PointType, PointTypeRegistry, QuotaGuard, Result, StorageError,
    TransactionRecord, TransferBalances,
};
pub use sqlite::{SqliteLedgerStore, SqlitePointTypeRegistry};

/// Key of the seeded gift type.
pub const GIFT_TYPE_KEY: &str = "mero";

/// Point types created on first initialization.
///
/// `mero` is the user-to-user gift type; `stream` has a zero quota and is
/// only ever granted by the reward scheduler or moved by tips.
pub fn seed_point_types() -> Vec<PointType> {
    vec![
        PointType::new(GIFT_TYPE_KEY, "Mero Points", 10),
        PointType::new(crate::config::DEFAULT_REWARD_TYPE_KEY, "Stream Points", 0),
    ]
}

/// Opened ledger storage: the shared pool and both stores over it.
#[derive(Clone)]
pub struct Storage {
    pub pool: SqlitePool,
    pub ledger: Arc<SqliteLedgerStore>,
    pub registry: Arc<SqlitePointTypeRegistry>,
}

/// Connect a pool for `config`, creating the database file if needed.
pub async fn connect(config: &StorageConfig) -> Result<SqlitePool> {
    if config.is_in_memory() {
        // Every in-memory connection is its own database; keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        return Ok(pool);
    }

    if let Some(parent) = std::path::Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create tables and indices. Safe to run on every start.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in schema::SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Insert the default point types that are not present yet.
pub async fn seed(registry: &SqlitePointTypeRegistry) -> Result<()> {
    for point_type in seed_point_types() {
        if registry.insert_if_absent(&point_type).await? {
            debug!(key = %point_type.key, "Seeded point type");
        }
    }
    Ok(())
}

/// Initialize storage based on configuration.
///
/// Connects, applies the schema, seeds the default point types and returns
/// the stores sharing one pool.
pub async fn init_storage(config: &StorageConfig) -> Result<Storage> {
    info!("Storage: sqlite at {}", config.path);

    let pool = connect(config).await?;
    migrate(&pool).await?;

    let registry = Arc::new(SqlitePointTypeRegistry::new(pool.clone()));
    seed(&registry).await?;

    let ledger = Arc::new(SqliteLedgerStore::new(pool.clone()));

    Ok(Storage {
        pool,
        ledger,
        registry,
    })
}
