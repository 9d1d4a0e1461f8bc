//! Point transfers: quota-limited gifts and balance-backed tips.
//!
//! A gift mints points for the receiver; the giver's balance is untouched
//! and the only limit is the per-type daily gift quota. A tip moves points
//! from giver to receiver and is limited by the giver's balance.
//!
//! Both run a validation pipeline where the first failed rule wins and no
//! state changes until every rule has passed. The final check (quota or
//! balance) is repeated inside the storage unit that writes, so concurrent
//! calls cannot slip past it.

use std::sync::Arc;

use chrono::FixedOffset;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::calendar::{day_window, Clock, SystemClock};
use crate::config::{ConfigError, LedgerConfig};
use crate::interfaces::{LedgerStore, PointType, PointTypeRegistry, QuotaGuard, TransactionRecord};

use super::error::{LedgerError, Result};

/// Message stored for a tip without a note.
pub const TIP_MESSAGE_PREFIX: &str = "TIP";

/// Inputs for a gift.
#[derive(Debug, Clone)]
pub struct GiveParams {
    pub guild_id: String,
    pub type_key: String,
    pub giver_user_id: String,
    pub giver_is_bot: bool,
    pub receiver_user_id: String,
    pub receiver_is_bot: bool,
    pub amount: i64,
    pub message: String,
}

/// Outcome of a successful gift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GiveReceipt {
    /// Receiver's balance after the gift.
    pub new_balance: i64,
    pub transaction_id: Uuid,
}

/// Facts about where the two parties are, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipEligibility {
    /// Both parties are in the same live session.
    pub same_session: bool,
    /// The receiver is currently broadcasting.
    pub receiver_broadcasting: bool,
}

/// Inputs for a tip.
#[derive(Debug, Clone)]
pub struct TipParams {
    pub guild_id: String,
    pub giver_user_id: String,
    pub giver_is_bot: bool,
    pub receiver_user_id: String,
    pub receiver_is_bot: bool,
    pub amount: i64,
    pub message: Option<String>,
    pub eligibility: TipEligibility,
}

/// Outcome of a successful tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipReceipt {
    pub giver_balance: i64,
    pub receiver_balance: i64,
    pub transaction_id: Uuid,
}

/// Validates and executes gifts and tips.
pub struct PointsService {
    store: Arc<dyn LedgerStore>,
    registry: Arc<dyn PointTypeRegistry>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    offset: FixedOffset,
}

impl PointsService {
    /// Create a service using the wall clock.
    ///
    /// Fails if the configured reporting offset is out of range.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        registry: Arc<dyn PointTypeRegistry>,
        config: LedgerConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let offset = config
            .utc_offset()
            .ok_or(ConfigError::InvalidUtcOffset(config.utc_offset_minutes))?;

        Ok(Self {
            store,
            registry,
            clock: Arc::new(SystemClock),
            config,
            offset,
        })
    }

    /// Replace the clock (tests pin "now" with this).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Give points to another member.
    ///
    /// Rules, in order: no self-send, amount range, message length, no bot
    /// receiver, no bot giver, point type exists and is enabled, daily quota
    /// for the giver in the current reporting day.
    pub async fn give(&self, params: GiveParams) -> Result<GiveReceipt> {
        let guild_id = params.guild_id.clone();
        let result = self.execute_give(params).await;
        if let Err(e) = &result {
            log_rejection("give", &guild_id, e);
        }
        result
    }

    async fn execute_give(&self, params: GiveParams) -> Result<GiveReceipt> {
        if params.giver_user_id == params.receiver_user_id {
            return Err(LedgerError::SelfSendNotAllowed);
        }
        self.check_amount(params.amount, self.config.max_give_amount)?;
        self.check_message(&params.message, 1)?;

        if params.receiver_is_bot || params.giver_is_bot {
            return Err(LedgerError::BotTargetNotAllowed);
        }

        let point_type = self.enabled_point_type(&params.type_key).await?;

        let now = self.clock.now();
        let quota = QuotaGuard {
            limit: point_type.daily_gift_quota,
            window: day_window(now, self.offset),
        };

        let current = self
            .store
            .count_transactions_in_window(
                &params.guild_id,
                &params.type_key,
                &params.giver_user_id,
                quota.window,
            )
            .await
            .map_err(|e| internal("count gifts", e))?;
        if current >= quota.limit {
            return Err(LedgerError::DailyLimitExceeded {
                limit: quota.limit,
                current,
            });
        }

        let record = TransactionRecord {
            id: Uuid::new_v4(),
            guild_id: params.guild_id,
            type_key: params.type_key,
            giver_user_id: params.giver_user_id,
            receiver_user_id: params.receiver_user_id,
            amount: params.amount,
            message: params.message,
            created_at: now,
        };

        let new_balance = self
            .store
            .record_grant(&record, Some(quota))
            .await
            .map_err(|e| internal("record gift", e))?;

        info!(
            tx_id = %record.id,
            guild_id = %record.guild_id,
            type_key = %record.type_key,
            amount = record.amount,
            "Gift recorded"
        );

        Ok(GiveReceipt {
            new_balance,
            transaction_id: record.id,
        })
    }

    /// Tip points from the giver's own balance.
    ///
    /// Rules, in order: no self-send, amount range, message length, no bots,
    /// reward point type exists and is enabled, giver can cover the amount,
    /// both parties share a session, receiver is broadcasting. The balance
    /// check is repeated inside the debit/credit unit.
    pub async fn tip(&self, params: TipParams) -> Result<TipReceipt> {
        let guild_id = params.guild_id.clone();
        let result = self.execute_tip(params).await;
        if let Err(e) = &result {
            log_rejection("tip", &guild_id, e);
        }
        result
    }

    async fn execute_tip(&self, params: TipParams) -> Result<TipReceipt> {
        if params.giver_user_id == params.receiver_user_id {
            return Err(LedgerError::SelfSendNotAllowed);
        }
        self.check_amount(params.amount, self.config.max_tip_amount)?;
        if let Some(message) = &params.message {
            self.check_message(message, 0)?;
        }

        if params.receiver_is_bot || params.giver_is_bot {
            return Err(LedgerError::BotTargetNotAllowed);
        }

        let type_key = self.config.reward_type_key.clone();
        self.enabled_point_type(&type_key).await?;

        let balance = self
            .store
            .get_balance(&params.guild_id, &params.giver_user_id, &type_key)
            .await
            .map_err(|e| internal("read tip balance", e))?;
        if balance < params.amount {
            return Err(LedgerError::InsufficientBalance {
                balance,
                required: params.amount,
            });
        }

        if !params.eligibility.same_session {
            return Err(LedgerError::NotInSameSession);
        }
        if !params.eligibility.receiver_broadcasting {
            return Err(LedgerError::ReceiverNotBroadcasting);
        }

        let message = match params.message.as_deref() {
            Some(note) if !note.is_empty() => format!("{}: {}", TIP_MESSAGE_PREFIX, note),
            _ => TIP_MESSAGE_PREFIX.to_string(),
        };

        let record = TransactionRecord {
            id: Uuid::new_v4(),
            guild_id: params.guild_id,
            type_key,
            giver_user_id: params.giver_user_id,
            receiver_user_id: params.receiver_user_id,
            amount: params.amount,
            message,
            created_at: self.clock.now(),
        };

        let balances = self
            .store
            .record_transfer(&record)
            .await
            .map_err(|e| internal("record tip", e))?;

        info!(
            tx_id = %record.id,
            guild_id = %record.guild_id,
            amount = record.amount,
            "Tip recorded"
        );

        Ok(TipReceipt {
            giver_balance: balances.giver_balance,
            receiver_balance: balances.receiver_balance,
            transaction_id: record.id,
        })
    }

    fn check_amount(&self, amount: i64, max: i64) -> Result<()> {
        if !(1..=max).contains(&amount) {
            return Err(LedgerError::InvalidAmount { amount, max });
        }
        Ok(())
    }

    fn check_message(&self, message: &str, min: usize) -> Result<()> {
        let max = self.config.max_message_chars;
        let length = message.chars().count();
        if length < min || length > max {
            return Err(LedgerError::InvalidMessage { length, min, max });
        }
        Ok(())
    }

    async fn enabled_point_type(&self, type_key: &str) -> Result<PointType> {
        let point_type = self
            .registry
            .lookup(type_key)
            .await
            .map_err(|e| internal("look up point type", e))?
            .ok_or_else(|| LedgerError::PointTypeNotFound(type_key.to_string()))?;

        if !point_type.enabled {
            return Err(LedgerError::PointTypeDisabled(type_key.to_string()));
        }
        Ok(point_type)
    }
}

/// Internal faults are logged where they are converted.
fn log_rejection(operation: &str, guild_id: &str, err: &LedgerError) {
    if !err.is_internal() {
        debug!(operation, guild_id = %guild_id, reason = %err, "Transfer rejected");
    }
}

/// Convert a storage error, logging it first when it is a real fault.
fn internal(operation: &str, err: crate::interfaces::StorageError) -> LedgerError {
    let err = LedgerError::from(err);
    if let LedgerError::Internal(source) = &err {
        error!(operation, error = %source, "Ledger storage failure");
    } else if let LedgerError::DuplicateId(id) = &err {
        error!(operation, tx_id = %id, "Transaction id collision");
    }
    err
}
