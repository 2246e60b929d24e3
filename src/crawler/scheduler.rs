//! Per-store ingestion scheduling
//!
//! This module handles:
//! - One worker task per enabled store, each owning its `StoreSchedule`
//! - Timer-driven cycles with backoff after failures
//! - Manual triggers that supersede a cycle in flight
//! - Periodic compaction of long-stale catalog rows
//! - Cooperative shutdown of every task

use crate::config::ScheduleConfig;
use crate::crawler::adapter::SourceAdapter;
use crate::crawler::coordinator::{run_ingest_cycle, CycleSettings};
use crate::product::StoreId;
use crate::state::{StoreHealth, StoreSchedule};
use crate::storage::{CatalogStore, CycleStatus};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Builds and starts the ingestion workers
pub struct Scheduler {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    catalog: Arc<dyn CatalogStore>,
    schedule: ScheduleConfig,
    settings: CycleSettings,
    compaction: Option<Compaction>,
}

#[derive(Debug, Clone, Copy)]
struct Compaction {
    interval: Duration,
    staleness_window: Duration,
}

/// Shared state of one store's worker
struct StoreWorker {
    schedule: RwLock<StoreSchedule>,
    trigger: Notify,

    /// Token of the cycle in flight, if any
    current: Mutex<Option<CancellationToken>>,
}

struct SchedulerInner {
    workers: BTreeMap<StoreId, Arc<StoreWorker>>,
    degraded_after: u32,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Cloneable handle to running ingestion workers
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `adapters` - One adapter per store to schedule
    /// * `catalog` - The catalog cycles write into
    /// * `schedule` - Interval, retry and degradation settings
    /// * `settings` - Per-cycle timeout and config hash
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        catalog: Arc<dyn CatalogStore>,
        schedule: ScheduleConfig,
        settings: CycleSettings,
    ) -> Self {
        Self {
            adapters,
            catalog,
            schedule,
            settings,
            compaction: None,
        }
    }

    /// Also runs a compaction pass every `interval`, deleting products
    /// last seen more than `staleness_window` ago
    pub fn with_compaction(mut self, interval: Duration, staleness_window: Duration) -> Self {
        self.compaction = Some(Compaction {
            interval,
            staleness_window,
        });
        self
    }

    /// Spawns every worker on the current runtime
    pub fn start(self) -> SchedulerHandle {
        let now = Utc::now();
        let first_run_at = if self.schedule.run_on_startup {
            now
        } else {
            now + chrono::Duration::from_std(self.schedule.interval())
                .unwrap_or_else(|_| chrono::Duration::zero())
        };

        let shutdown = CancellationToken::new();
        let schedule = Arc::new(self.schedule);
        let settings = Arc::new(self.settings);
        let mut workers = BTreeMap::new();
        let mut tasks = Vec::new();

        for adapter in self.adapters {
            let store = adapter.store_id();
            let worker = Arc::new(StoreWorker {
                schedule: RwLock::new(StoreSchedule::new(store, first_run_at)),
                trigger: Notify::new(),
                current: Mutex::new(None),
            });
            workers.insert(store, worker.clone());

            tasks.push(tokio::spawn(run_worker(
                worker,
                adapter,
                self.catalog.clone(),
                schedule.clone(),
                settings.clone(),
                shutdown.clone(),
            )));
        }

        if let Some(compaction) = self.compaction {
            tasks.push(tokio::spawn(run_compaction(
                self.catalog.clone(),
                compaction,
                shutdown.clone(),
            )));
        }

        tracing::info!("Scheduler started for {} store(s)", workers.len());

        SchedulerHandle {
            inner: Arc::new(SchedulerInner {
                workers,
                degraded_after: schedule.degraded_after_failures,
                shutdown,
                tasks: Mutex::new(tasks),
            }),
        }
    }
}

impl SchedulerHandle {
    /// Requests an immediate cycle for `store`
    ///
    /// A cycle already in flight for the store is cancelled and replaced.
    ///
    /// # Returns
    ///
    /// false if the store has no worker
    pub fn trigger(&self, store: StoreId) -> bool {
        let Some(worker) = self.inner.workers.get(&store) else {
            return false;
        };

        if let Ok(current) = worker.current.lock() {
            if let Some(token) = current.as_ref() {
                tracing::info!(store = %store, "Cancelling running cycle for manual refresh");
                token.cancel();
            }
        }
        worker.trigger.notify_one();
        true
    }

    /// Health of every scheduled store, in id order
    pub async fn health(&self) -> Vec<StoreHealth> {
        let mut health = Vec::with_capacity(self.inner.workers.len());
        for worker in self.inner.workers.values() {
            health.push(worker.schedule.read().await.health(self.inner.degraded_after));
        }
        health
    }

    /// Stores whose consecutive failures reached the degradation threshold
    pub async fn degraded_stores(&self) -> Vec<StoreId> {
        self.health()
            .await
            .into_iter()
            .filter(|h| h.degraded)
            .map(|h| h.store)
            .collect()
    }

    /// Cancels every task and waits for them to finish
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let tasks = match self.inner.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => Vec::new(),
        };
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                tracing::warn!("Scheduler task ended abnormally: {}", e);
            }
        }
        tracing::info!("Scheduler stopped");
    }

    /// Handle over fixed schedules with no tasks behind them
    #[cfg(test)]
    pub(crate) fn detached(schedules: Vec<StoreSchedule>, degraded_after: u32) -> Self {
        let workers = schedules
            .into_iter()
            .map(|schedule| {
                (
                    schedule.store,
                    Arc::new(StoreWorker {
                        schedule: RwLock::new(schedule),
                        trigger: Notify::new(),
                        current: Mutex::new(None),
                    }),
                )
            })
            .collect();

        Self {
            inner: Arc::new(SchedulerInner {
                workers,
                degraded_after,
                shutdown: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }
}

async fn run_worker(
    worker: Arc<StoreWorker>,
    adapter: Arc<dyn SourceAdapter>,
    catalog: Arc<dyn CatalogStore>,
    schedule: Arc<ScheduleConfig>,
    settings: Arc<CycleSettings>,
    shutdown: CancellationToken,
) {
    let store = adapter.store_id();

    loop {
        let wait = worker.schedule.read().await.time_until_due(Utc::now());

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = worker.trigger.notified() => {
                tracing::info!(store = %store, "Manual refresh requested");
            }
            _ = tokio::time::sleep(wait) => {}
        }

        if !worker.schedule.write().await.begin_cycle(Utc::now()) {
            continue;
        }

        let token = shutdown.child_token();
        set_current(&worker, Some(token.clone()));
        let result = run_ingest_cycle(adapter.as_ref(), catalog.as_ref(), &settings, &token).await;
        set_current(&worker, None);

        let now = Utc::now();
        let mut state = worker.schedule.write().await;
        match result {
            Ok(outcome) => match outcome.status {
                CycleStatus::Succeeded => state.record_success(now, &schedule),
                CycleStatus::Cancelled => state.record_cancelled(),
                _ => state.record_failure(
                    now,
                    outcome
                        .error
                        .unwrap_or_else(|| "cycle failed".to_string()),
                    &schedule,
                ),
            },
            Err(e) => {
                tracing::error!(store = %store, "Catalog error during cycle: {}", e);
                state.record_failure(now, e.to_string(), &schedule);
            }
        }

        if state.is_degraded(schedule.degraded_after_failures) {
            tracing::warn!(
                store = %store,
                "Store degraded after {} consecutive failures",
                state.consecutive_failures
            );
        }
        tracing::debug!(store = %store, state = %state.state, "Next run at {}", state.next_run_at);
    }

    tracing::debug!(store = %store, "Worker stopped");
}

fn set_current(worker: &StoreWorker, token: Option<CancellationToken>) {
    if let Ok(mut current) = worker.current.lock() {
        *current = token;
    }
}

async fn run_compaction(
    catalog: Arc<dyn CatalogStore>,
    compaction: Compaction,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(compaction.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let window = chrono::Duration::from_std(compaction.staleness_window)
        .unwrap_or_else(|_| chrono::Duration::zero());

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                match catalog.compact(Utc::now() - window) {
                    Ok(0) => {}
                    Ok(deleted) => tracing::info!("Compaction removed {} expired product(s)", deleted),
                    Err(e) => tracing::warn!("Compaction failed: {}", e),
                }
            }
        }
    }
}
