use crate::config::ScheduleConfig;
use crate::product::StoreId;
use crate::state::IngestState;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Snapshot of one store's ingestion health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHealth {
    pub store: StoreId,
    pub state: IngestState,

    /// Outcome of the most recent finished cycle, if any
    pub last_outcome: Option<IngestState>,

    pub consecutive_failures: u32,

    /// True once consecutive failures reach the configured threshold
    pub degraded: bool,

    pub last_error: Option<String>,
    pub next_run_at: DateTime<Utc>,
}

/// Tracks the schedule of a single store
///
/// Each store worker owns exactly one of these; nothing in it is shared
/// with other stores.
#[derive(Debug, Clone)]
pub struct StoreSchedule {
    pub store: StoreId,
    pub state: IngestState,
    pub last_outcome: Option<IngestState>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_started_at: Option<DateTime<Utc>>,
    pub next_run_at: DateTime<Utc>,
}

impl StoreSchedule {
    /// Creates an idle schedule whose first run is due at `first_run_at`
    pub fn new(store: StoreId, first_run_at: DateTime<Utc>) -> Self {
        Self {
            store,
            state: IngestState::Idle,
            last_outcome: None,
            consecutive_failures: 0,
            last_error: None,
            last_started_at: None,
            next_run_at: first_run_at,
        }
    }

    /// Time remaining until the next scheduled run (zero when overdue)
    pub fn time_until_due(&self, now: DateTime<Utc>) -> Duration {
        (self.next_run_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Moves `Idle -> Running`
    ///
    /// Returns false (and changes nothing) if a cycle is already running.
    pub fn begin_cycle(&mut self, now: DateTime<Utc>) -> bool {
        if !self.transition(IngestState::Running) {
            return false;
        }
        self.last_started_at = Some(now);
        true
    }

    /// Records a successful cycle and schedules the next regular run
    pub fn record_success(&mut self, now: DateTime<Utc>, config: &ScheduleConfig) {
        if !self.transition(IngestState::Succeeded) {
            return;
        }
        self.consecutive_failures = 0;
        self.last_error = None;
        self.next_run_at = now + chrono_duration(config.interval());
        self.finish();
    }

    /// Records a failed cycle and schedules a retry with backoff
    pub fn record_failure(&mut self, now: DateTime<Utc>, error: String, config: &ScheduleConfig) {
        if !self.transition(IngestState::Failed) {
            return;
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error);
        let delay = backoff_delay(
            self.consecutive_failures,
            config.retry_base(),
            config.retry_max(),
        );
        self.next_run_at = now + chrono_duration(delay);
        self.finish();
    }

    /// Returns a running cycle to idle without recording an outcome
    ///
    /// Used when a manual trigger cancels the cycle in flight.
    pub fn record_cancelled(&mut self) {
        self.transition(IngestState::Idle);
    }

    /// Returns true when consecutive failures reach `threshold`
    pub fn is_degraded(&self, threshold: u32) -> bool {
        self.consecutive_failures >= threshold
    }

    /// Takes a health snapshot
    pub fn health(&self, degraded_after: u32) -> StoreHealth {
        StoreHealth {
            store: self.store,
            state: self.state,
            last_outcome: self.last_outcome,
            consecutive_failures: self.consecutive_failures,
            degraded: self.is_degraded(degraded_after),
            last_error: self.last_error.clone(),
            next_run_at: self.next_run_at,
        }
    }

    fn transition(&mut self, next: IngestState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    fn finish(&mut self) {
        self.last_outcome = Some(self.state);
        self.transition(IngestState::Idle);
    }
}

/// Retry delay after `failures` consecutive failures
///
/// Doubles from `base` with every failure and never exceeds `max`.
pub fn backoff_delay(failures: u32, base: Duration, max: Duration) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(365))
}
