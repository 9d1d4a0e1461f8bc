//! pointledger-rewards: passive reward daemon
//!
//! Opens the ledger database and grants presence rewards on a fixed tick,
//! reading the presence snapshot from a JSON file that the chat integration
//! keeps up to date.
//!
//! ## Configuration
//! - First argument: optional YAML config path
//! - POINTLEDGER_CONFIG: YAML config path
//! - POINTLEDGER__REWARDS__ENABLED etc.: per-field overrides
//! - POINTLEDGER_LOG: tracing filter (default: info)

use std::sync::Arc;

use tracing::{info, warn};

use pointledger::config::Config;
use pointledger::services::{JsonFilePresenceSource, RewardScheduler};
use pointledger::storage::init_storage;
use pointledger::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    let storage = init_storage(&config.storage).await?;
    let presence = Arc::new(JsonFilePresenceSource::new(&config.rewards.presence_path));

    let scheduler = RewardScheduler::new(
        config.rewards.clone(),
        config.ledger.reward_type_key.clone(),
        storage.ledger.clone(),
        presence,
    );

    if !scheduler.start() {
        warn!("Reward scheduler not started; set rewards.enabled to run it");
        storage.pool.close().await;
        return Ok(());
    }

    info!(
        database = %config.storage.path,
        presence = %config.rewards.presence_path,
        "pointledger-rewards started"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    scheduler.shutdown().await;
    storage.pool.close().await;

    Ok(())
}
