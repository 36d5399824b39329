//! Shared health state for the /health endpoint.
//! Updated by the /run handler around each pipeline run.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU16, AtomicU64, Ordering};

use serde::Serialize;

/// Run counters. Written by the trigger handler, read by the API.
#[derive(Default)]
pub struct HealthState {
    /// True while a run is in progress.
    pub running: AtomicBool,
    pub runs_started: AtomicU64,
    /// Runs that ended with a 400 or never produced a report.
    pub runs_failed: AtomicU64,
    /// Status code of the last finished run (0 = none yet).
    pub last_status: AtomicU16,
    /// Unix seconds when the last run finished (0 = none yet).
    pub last_finished_at: AtomicI64,
}

#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub running: bool,
    pub runs_started: u64,
    pub runs_failed: u64,
    pub last_status: Option<u16>,
    pub last_finished_at: Option<i64>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_started(&self) {
        self.running.store(true, Ordering::Relaxed);
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn run_finished(&self, status_code: u16, finished_at: i64) {
        if status_code != 200 {
            self.runs_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.last_status.store(status_code, Ordering::Relaxed);
        self.last_finished_at.store(finished_at, Ordering::Relaxed);
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let last_status = self.last_status.load(Ordering::Relaxed);
        let last_finished_at = self.last_finished_at.load(Ordering::Relaxed);
        HealthSnapshot {
            status: "ok",
            running: self.running.load(Ordering::Relaxed),
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            last_status: (last_status != 0).then_some(last_status),
            last_finished_at: (last_finished_at != 0).then_some(last_finished_at),
        }
    }
}
