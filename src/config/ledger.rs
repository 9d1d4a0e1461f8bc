//! Ledger rule configuration.
//!
//! Bounds for give/tip inputs, the reporting offset used for daily quota
//! windows, and the point type reserved for system rewards.

use chrono::FixedOffset;
use serde::Deserialize;

/// Default reporting offset: UTC+09:00.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

/// Default maximum points per give.
pub const DEFAULT_MAX_GIVE_AMOUNT: i64 = 100;

/// Default maximum message length, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 200;

/// Default maximum points per tip.
pub const DEFAULT_MAX_TIP_AMOUNT: i64 = 1000;

/// Default leaderboard size when none is requested.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Largest leaderboard a caller may request.
pub const DEFAULT_MAX_LEADERBOARD_LIMIT: u32 = 50;

/// Point type used for passive rewards and tips.
pub const DEFAULT_REWARD_TYPE_KEY: &str = "stream";

/// Ledger rule configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Reporting timezone as minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// Upper bound for a single give.
    pub max_give_amount: i64,
    /// Upper bound for give/tip messages, in characters.
    pub max_message_chars: usize,
    /// Upper bound for a single tip.
    pub max_tip_amount: i64,
    /// Leaderboard size when the caller does not specify one.
    pub default_leaderboard_limit: u32,
    /// Largest accepted leaderboard size.
    pub max_leaderboard_limit: u32,
    /// Point type for passive rewards and tips.
    pub reward_type_key: String,
}

impl LedgerConfig {
    /// Reporting offset, or `None` if outside a day either way.
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            max_give_amount: DEFAULT_MAX_GIVE_AMOUNT,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            max_tip_amount: DEFAULT_MAX_TIP_AMOUNT,
            default_leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            max_leaderboard_limit: DEFAULT_MAX_LEADERBOARD_LIMIT,
            reward_type_key: DEFAULT_REWARD_TYPE_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_config_default() {
        let config = LedgerConfig::default();
        assert_eq!(config.max_give_amount, 100);
        assert_eq!(config.max_message_chars, 200);
        assert_eq!(config.max_tip_amount, 1000);
        assert_eq!(config.default_leaderboard_limit, 10);
        assert_eq!(config.max_leaderboard_limit, 50);
        assert_eq!(config.reward_type_key, "stream");
    }

    #[test]
    fn test_default_offset_is_jst() {
        let offset = LedgerConfig::default().utc_offset().unwrap();
        assert_eq!(offset.local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_out_of_range_offset() {
        let config = LedgerConfig {
            utc_offset_minutes: 24 * 60,
            ..Default::default()
        };
        assert!(config.utc_offset().is_none());
    }
}
