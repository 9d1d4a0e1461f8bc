//! Passive reward scheduler configuration.

use std::time::Duration;

use serde::Deserialize;

/// Passive reward scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// Run the scheduler at all. Default: false.
    pub enabled: bool,
    /// Seconds between ticks. Default: 60.
    pub tick_secs: u64,
    /// Points per tick for an active broadcaster. Default: 2.
    pub broadcaster_amount: i64,
    /// Points per tick for a passive participant. Default: 1.
    pub participant_amount: i64,
    /// Minimum humans in a group for it to earn anything. Default: 2.
    pub min_participants: usize,
    /// Skip groups with nobody broadcasting. Default: true.
    pub require_broadcaster: bool,
    /// JSON presence snapshot read by the standalone binary each tick.
    pub presence_path: String,
}

impl RewardsConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tick_secs: 60,
            broadcaster_amount: 2,
            participant_amount: 1,
            min_participants: 2,
            require_broadcaster: true,
            presence_path: "data/presence.json".to_string(),
        }
    }
}
