//! Capture-side ingestion loop and the periodic sweep loop
//!
//! Both loops reach the tracker through [`Monitor`], a cloneable handle over
//! one mutex, so every mutation and every render snapshot sees all shared
//! state as of a single instant.

use chrono::NaiveDateTime;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;

use crate::error::HistoryError;
use crate::history::timestamp;
use crate::models::domain::Sighting;
use crate::models::dto::RenderSnapshot;
use crate::tracker::{SightingOutcome, Tracker};

pub type Shared<T> = Arc<Mutex<T>>;

#[derive(Clone)]
pub struct Monitor {
    tracker: Shared<Tracker>,
}

impl Monitor {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(tracker)),
        }
    }

    pub fn on_sighting(&self, ip: &str, mac: &str, now: NaiveDateTime) -> SightingOutcome {
        self.tracker.lock().on_sighting(ip, mac, now)
    }

    /// Ingest a decoded sighting stamped with the current time.
    pub fn ingest(&self, sighting: &Sighting) -> SightingOutcome {
        self.on_sighting(&sighting.source_ip, &sighting.source_mac, timestamp::now())
    }

    /// One sweep tick: recompute activity and snapshot under the same lock.
    pub fn sweep(&self, now: NaiveDateTime) -> RenderSnapshot {
        let mut tracker = self.tracker.lock();
        tracker.sweep(now);
        tracker.snapshot()
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        self.tracker.lock().snapshot()
    }

    pub fn note(&self, message: impl AsRef<str>) {
        self.tracker.lock().note(timestamp::now(), message);
    }

    /// Log why we are stopping and make one best-effort save.
    pub fn shutdown(&self, reason: &str) -> Result<(), HistoryError> {
        self.tracker.lock().shutdown(timestamp::now(), reason)
    }

    /// Read-only access to the tracker while holding the lock.
    pub fn with_tracker<R>(&self, f: impl FnOnce(&Tracker) -> R) -> R {
        f(&*self.tracker.lock())
    }
}

/// Feed sightings to the tracker until every sender is dropped.
///
/// Returns the number of sightings handled.
pub fn run_ingestion(rx: Receiver<Sighting>, monitor: Monitor) -> u64 {
    let mut handled = 0;
    for sighting in rx.iter() {
        let outcome = monitor.ingest(&sighting);
        tracing::trace!("[MONITOR] {:?} -> {:?}", sighting, outcome);
        handled += 1;
    }
    tracing::info!("[MONITOR] Capture channel closed after {} sightings", handled);
    handled
}

/// Sweep every `period` until `running` clears, handing each snapshot to `render`.
///
/// Ticks that fall behind are skipped rather than bunched up. The sweep runs
/// on the blocking pool since ingestion may be holding the lock through a save.
pub async fn run_sweep_loop<F>(
    monitor: Monitor,
    period: Duration,
    running: Arc<AtomicBool>,
    mut render: F,
) where
    F: FnMut(&RenderSnapshot) + Send,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!("[MONITOR] Sweep loop started (period: {:?})", period);

    loop {
        interval.tick().await;
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let handle = monitor.clone();
        match tokio::task::spawn_blocking(move || handle.sweep(timestamp::now())).await {
            Ok(snapshot) => render(&snapshot),
            Err(e) => tracing::error!("[MONITOR] Sweep task failed: {}", e),
        }
    }

    tracing::info!("[MONITOR] Sweep loop stopped");
}

/// Await `task` for at most `grace`. `None` means it is still running.
pub async fn join_within<T>(
    task: &mut JoinHandle<T>,
    grace: Duration,
) -> Option<Result<T, JoinError>> {
    tokio::time::timeout(grace, task).await.ok()
}
