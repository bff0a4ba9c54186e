//! Drives the alert monitor on a fixed cadence.
//!
//! Ticks follow the wall clock, not cycle duration. A tick that arrives while
//! a cycle is still running is dropped, not queued. Each cycle runs in its
//! own task so an error or a panic inside it never ends the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{Mutex, OwnedMutexGuard, RwLock},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use super::alert_monitor::{AlertMonitor, CycleResult};

#[derive(Debug)]
pub enum TickOutcome {
    Completed(CycleResult),
    Failed(String),
    /// Another cycle held the guard.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastCycle {
    pub started_at: i64,
    pub duration_ms: u64,
    pub result: Option<CycleResult>,
    pub error: Option<String>,
}

pub struct Scheduler {
    monitor: Arc<AlertMonitor>,
    interval: Duration,
    running: Arc<Mutex<()>>,
    last: Arc<RwLock<Option<LastCycle>>>,
}

impl Scheduler {
    pub fn new(monitor: Arc<AlertMonitor>, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            running: Arc::new(Mutex::new(())),
            last: Arc::new(RwLock::new(None)),
        }
    }

    pub fn monitor(&self) -> &Arc<AlertMonitor> {
        &self.monitor
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    pub async fn last_cycle(&self) -> Option<LastCycle> {
        self.last.read().await.clone()
    }

    /// Runs a cycle now unless one is already in flight.
    pub async fn run_now(&self) -> TickOutcome {
        match self.start_cycle() {
            Some(handle) => handle
                .await
                .unwrap_or_else(|e| TickOutcome::Failed(e.to_string())),
            None => TickOutcome::Skipped,
        }
    }

    fn start_cycle(&self) -> Option<JoinHandle<TickOutcome>> {
        let permit = self.running.clone().try_lock_owned().ok()?;
        let monitor = self.monitor.clone();
        let last = self.last.clone();

        Some(tokio::spawn(run_guarded(monitor, last, permit)))
    }
}

async fn run_guarded(
    monitor: Arc<AlertMonitor>,
    last: Arc<RwLock<Option<LastCycle>>>,
    _permit: OwnedMutexGuard<()>,
) -> TickOutcome {
    let started = Instant::now();
    let started_at = Utc::now().timestamp();

    tracing::debug!("running price alert check");

    let joined = tokio::spawn(async move { monitor.run_cycle().await }).await;

    let outcome = match joined {
        Ok(Ok(result)) => {
            tracing::info!(
                examined = result.examined,
                triggered = result.triggered,
                notify_failed = result.notification_failures.len(),
                skipped_no_price = result.skipped_no_price,
                "checked alerts"
            );
            TickOutcome::Completed(result)
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "skipping alert check");
            TickOutcome::Failed(e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "alert check task died");
            TickOutcome::Failed(e.to_string())
        }
    };

    let (result, error) = match &outcome {
        TickOutcome::Completed(r) => (Some(r.clone()), None),
        TickOutcome::Failed(e) => (None, Some(e.clone())),
        TickOutcome::Skipped => (None, None),
    };

    *last.write().await = Some(LastCycle {
        started_at,
        duration_ms: started.elapsed().as_millis() as u64,
        result,
        error,
    });

    outcome
}

/// Starts the monitoring loop for the lifetime of the process.
pub fn spawn_price_alert_monitor(scheduler: Arc<Scheduler>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(scheduler.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(every = ?scheduler.interval, "price alert scheduler started");

        loop {
            interval.tick().await;

            if scheduler.start_cycle().is_none() {
                tracing::warn!("previous alert check still running, skipping tick");
            }
        }
    })
}
