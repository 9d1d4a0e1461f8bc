//! Storage configuration types.

use serde::Deserialize;

/// Path value that selects an in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. `:memory:` opens a private in-memory database.
    pub path: String,
    /// Maximum pooled connections (forced to 1 for in-memory databases).
    pub max_connections: u32,
}

impl StorageConfig {
    /// Config for an in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: IN_MEMORY_PATH.to_string(),
            max_connections: 1,
        }
    }

    /// Whether this config selects an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "data/pointledger.sqlite".to_string(),
            max_connections: 5,
        }
    }
}
