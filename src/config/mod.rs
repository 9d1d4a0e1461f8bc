//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod ledger;
mod rewards;
mod storage;

pub use ledger::{
    LedgerConfig, DEFAULT_LEADERBOARD_LIMIT, DEFAULT_MAX_GIVE_AMOUNT, DEFAULT_MAX_LEADERBOARD_LIMIT,
    DEFAULT_MAX_MESSAGE_CHARS, DEFAULT_MAX_TIP_AMOUNT, DEFAULT_REWARD_TYPE_KEY,
    DEFAULT_UTC_OFFSET_MINUTES,
};
pub use rewards::RewardsConfig;
pub use storage::{StorageConfig, IN_MEMORY_PATH};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "pointledger.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "POINTLEDGER_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "POINTLEDGER";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "POINTLEDGER_LOG";

use serde::Deserialize;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("UTC offset out of range: {0} minutes")]
    InvalidUtcOffset(i32),

    #[error("Reward tick interval must be at least one second")]
    InvalidTickInterval,

    #[error("Reward amounts must be positive: broadcaster={broadcaster}, participant={participant}")]
    InvalidRewardAmount { broadcaster: i64, participant: i64 },
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Ledger rules.
    pub ledger: LedgerConfig,
    /// Passive reward scheduler.
    pub rewards: RewardsConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `pointledger.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the ledger cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.utc_offset().is_none() {
            return Err(ConfigError::InvalidUtcOffset(self.ledger.utc_offset_minutes));
        }
        if self.rewards.tick_secs == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        if self.rewards.broadcaster_amount <= 0 || self.rewards.participant_amount <= 0 {
            return Err(ConfigError::InvalidRewardAmount {
                broadcaster: self.rewards.broadcaster_amount,
                participant: self.rewards.participant_amount,
            });
        }
        Ok(())
    }

    /// Create config for testing: in-memory storage, defaults elsewhere.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig::in_memory(),
            ..Self::default()
        }
    }
}
