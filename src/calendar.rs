//! Calendar-day windows in a fixed reporting offset.
//!
//! Daily quotas are counted per local calendar day, not per UTC day. A
//! [`DayWindow`] is the half-open UTC range `[start, end)` covering one local
//! day in the configured [`FixedOffset`].

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, SecondsFormat, Utc};

/// Half-open UTC interval covering one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    /// First instant of the local day (inclusive).
    pub start: DateTime<Utc>,
    /// First instant of the following local day (exclusive).
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Whether `instant` falls inside `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Compute the local-day window containing `instant`.
pub fn day_window(instant: DateTime<Utc>, offset: FixedOffset) -> DayWindow {
    let local_midnight = instant
        .with_timezone(&offset)
        .date_naive()
        .and_time(NaiveTime::MIN);
    // A fixed offset has exactly one UTC instant per local wall time.
    let start = (local_midnight - Duration::seconds(offset.local_minus_utc() as i64)).and_utc();

    DayWindow {
        start,
        end: start + Duration::days(1),
    }
}

/// Canonical text form for stored timestamps.
///
/// Fixed width with millisecond precision and a `Z` suffix, so lexical order
/// matches chronological order inside SQL comparisons.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Source of "now" for the ledger.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
