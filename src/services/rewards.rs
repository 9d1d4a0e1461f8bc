//! Passive reward scheduler.
//!
//! On a fixed tick, grants points to members of monitored groups based on a
//! presence snapshot supplied from outside: broadcasters earn one amount,
//! participants another. Grants go through the same atomic grant path as
//! gifts, with a reserved system sender and a fixed reason code.
//!
//! The scheduler owns its lifecycle. `start` spawns the tick task and
//! `stop` signals it through a watch channel; a tick already in progress
//! completes, but no new tick begins.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::calendar::{Clock, SystemClock};
use crate::config::RewardsConfig;
use crate::interfaces::{LedgerStore, TransactionRecord};

/// Sender recorded on scheduler grants.
pub const SYSTEM_SENDER_ID: &str = "SYSTEM";
/// Reason recorded for broadcaster grants.
pub const STREAMING_REWARD: &str = "STREAMING_REWARD";
/// Reason recorded for participant grants.
pub const VIEWING_REWARD: &str = "VIEWING_REWARD";

/// Who is present in one monitored group, already filtered to humans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GroupPresence {
    pub guild_id: String,
    pub group_id: String,
    /// Members actively broadcasting.
    pub broadcasters: BTreeSet<String>,
    /// Members present but not broadcasting.
    pub participants: BTreeSet<String>,
}

impl GroupPresence {
    /// Distinct members across both roles.
    pub fn member_count(&self) -> usize {
        self.broadcasters.union(&self.participants).count()
    }
}

/// Errors reading a presence snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("Failed to read presence snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid presence snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Supplies the presence snapshot for each tick.
#[async_trait]
pub trait PresenceSource: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<GroupPresence>, PresenceError>;
}

/// Presence snapshot kept in a JSON file, rewritten by whatever tracks
/// sessions. The file holds an array of groups; a missing file means nobody
/// is present.
pub struct JsonFilePresenceSource {
    path: PathBuf,
}

impl JsonFilePresenceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PresenceSource for JsonFilePresenceSource {
    async fn snapshot(&self) -> Result<Vec<GroupPresence>, PresenceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Counts from one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub groups_seen: usize,
    pub groups_skipped: usize,
    pub grants: usize,
    pub failures: usize,
}

/// State shared between the scheduler handle and its tick task.
struct TickRunner {
    config: RewardsConfig,
    reward_type_key: String,
    store: Arc<dyn LedgerStore>,
    presence: Arc<dyn PresenceSource>,
    clock: Arc<dyn Clock>,
}

impl TickRunner {
    async fn run_tick(&self) -> TickReport {
        match self.presence.snapshot().await {
            Ok(groups) => self.process(&groups).await,
            Err(e) => {
                warn!(error = %e, "Skipping reward tick: presence unavailable");
                TickReport::default()
            }
        }
    }

    async fn process(&self, groups: &[GroupPresence]) -> TickReport {
        let mut report = TickReport::default();
        let mut granted: HashSet<(&str, &str, &str)> = HashSet::new();

        for group in groups {
            report.groups_seen += 1;

            if !self.qualifies(group) {
                report.groups_skipped += 1;
                continue;
            }

            let broadcasters = group
                .broadcasters
                .iter()
                .map(|user| (user, self.config.broadcaster_amount, STREAMING_REWARD));
            let participants = group
                .participants
                .iter()
                .map(|user| (user, self.config.participant_amount, VIEWING_REWARD));

            // Broadcasters come first, so a member listed in both roles is
            // paid as a broadcaster.
            for (user_id, amount, reason) in broadcasters.chain(participants) {
                let key = (
                    group.guild_id.as_str(),
                    group.group_id.as_str(),
                    user_id.as_str(),
                );
                if !granted.insert(key) {
                    continue;
                }

                match self.grant(&group.guild_id, user_id, amount, reason).await {
                    Ok(balance) => {
                        report.grants += 1;
                        debug!(
                            guild_id = %group.guild_id,
                            group_id = %group.group_id,
                            user_id = %user_id,
                            amount,
                            balance,
                            reason,
                            "Reward granted"
                        );
                    }
                    Err(e) => {
                        report.failures += 1;
                        error!(
                            guild_id = %group.guild_id,
                            group_id = %group.group_id,
                            user_id = %user_id,
                            error = %e,
                            "Reward grant failed"
                        );
                    }
                }
            }
        }

        report
    }

    fn qualifies(&self, group: &GroupPresence) -> bool {
        if group.member_count() < self.config.min_participants {
            return false;
        }
        !(self.config.require_broadcaster && group.broadcasters.is_empty())
    }

    async fn grant(
        &self,
        guild_id: &str,
        user_id: &str,
        amount: i64,
        reason: &str,
    ) -> crate::interfaces::Result<i64> {
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            guild_id: guild_id.to_string(),
            type_key: self.reward_type_key.clone(),
            giver_user_id: SYSTEM_SENDER_ID.to_string(),
            receiver_user_id: user_id.to_string(),
            amount,
            message: reason.to_string(),
            created_at: self.clock.now(),
        };
        self.store.record_grant(&record, None).await
    }
}

struct RunningTask {
    cancel: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Periodic passive reward grants.
pub struct RewardScheduler {
    runner: Arc<TickRunner>,
    task: Mutex<Option<RunningTask>>,
}

impl RewardScheduler {
    pub fn new(
        config: RewardsConfig,
        reward_type_key: impl Into<String>,
        store: Arc<dyn LedgerStore>,
        presence: Arc<dyn PresenceSource>,
    ) -> Self {
        Self {
            runner: Arc::new(TickRunner {
                config,
                reward_type_key: reward_type_key.into(),
                store,
                presence,
                clock: Arc::new(SystemClock),
            }),
            task: Mutex::new(None),
        }
    }

    /// Replace the clock used for grant timestamps.
    ///
    /// Must be called before `start`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        if let Some(runner) = Arc::get_mut(&mut self.runner) {
            runner.clock = clock;
        }
        self
    }

    /// Begin ticking.
    ///
    /// Returns false without doing anything when disabled in configuration
    /// or already running. The first tick fires one interval after start.
    pub fn start(&self) -> bool {
        let config = &self.runner.config;
        if !config.enabled {
            info!("Reward scheduler disabled");
            return false;
        }

        let mut slot = self.task_slot();
        if slot.as_ref().is_some_and(|task| !task.join.is_finished()) {
            return false;
        }

        let period = config.tick_interval();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let join = tokio::spawn(tick_loop(self.runner.clone(), period, cancel_rx));

        info!(
            tick_secs = config.tick_secs,
            broadcaster_amount = config.broadcaster_amount,
            participant_amount = config.participant_amount,
            min_participants = config.min_participants,
            "Reward scheduler started"
        );

        *slot = Some(RunningTask {
            cancel: cancel_tx,
            join,
        });
        true
    }

    /// Signal the tick task to stop. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(task) = self.task_slot().take() {
            let _ = task.cancel.send(true);
        }
    }

    /// Stop and wait for an in-flight tick to finish.
    pub async fn shutdown(&self) {
        let task = self.task_slot().take();
        if let Some(task) = task {
            let _ = task.cancel.send(true);
            if let Err(e) = task.join.await {
                error!(error = %e, "Reward scheduler task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_slot()
            .as_ref()
            .is_some_and(|task| !task.join.is_finished())
    }

    /// Grant rewards for one snapshot.
    ///
    /// This is the tick body; callers that track presence themselves can
    /// drive it directly. Failures for one member are logged and counted,
    /// and processing continues with the rest.
    pub async fn process_tick(&self, groups: &[GroupPresence]) -> TickReport {
        self.runner.process(groups).await
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<RunningTask>> {
        match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

async fn tick_loop(runner: Arc<TickRunner>, period: Duration, mut cancel: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.changed() => {
                info!("Reward scheduler stopped");
                break;
            }
            _ = ticker.tick() => {
                let report = runner.run_tick().await;
                if report.groups_seen > 0 {
                    info!(
                        groups = report.groups_seen,
                        skipped = report.groups_skipped,
                        grants = report.grants,
                        failures = report.failures,
                        "Reward tick complete"
                    );
                }
            }
        }
    }
}
