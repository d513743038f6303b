//! In-memory metric sink shared by every virtual user of a run.

use reqload_domain::CheckRecorder;
use reqload_types::CheckRecord;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Pass/fail tally for one check name within one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTally {
    /// Group path, `""` for root, `::a::b` for nested groups.
    pub group: String,
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

/// Raw samples of a finished run, ready to be summarized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectorSnapshot {
    pub http_reqs: u64,
    pub http_req_durations: Vec<f64>,
    pub http_req_failed: u64,
    pub http_req_ok: u64,

    /// In first-seen order.
    pub checks: Vec<CheckTally>,

    pub iteration_durations: Vec<f64>,
    pub iterations_completed: u64,
    pub iterations_errored: u64,
    pub iterations_interrupted: u64,

    pub vus: Vec<f64>,
    pub vus_max: u32,
}

impl CollectorSnapshot {
    pub fn check_totals(&self) -> (u64, u64) {
        self.checks
            .iter()
            .fold((0, 0), |(p, f), c| (p + c.passes, f + c.fails))
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    inner: Mutex<CollectorSnapshot>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CollectorSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One HTTP call. `failed` covers transport errors and unexpected statuses.
    pub fn record_request(&self, duration_ms: f64, failed: bool) {
        let mut s = self.lock();
        s.http_reqs += 1;
        s.http_req_durations.push(duration_ms);
        if failed {
            s.http_req_failed += 1;
        } else {
            s.http_req_ok += 1;
        }
    }

    /// One iteration that ran to its end, successfully or not.
    pub fn record_iteration(&self, duration_ms: f64, errored: bool) {
        let mut s = self.lock();
        s.iteration_durations.push(duration_ms);
        s.iterations_completed += 1;
        if errored {
            s.iterations_errored += 1;
        }
    }

    pub fn record_interrupted(&self, count: u64) {
        self.lock().iterations_interrupted += count;
    }

    pub fn sample_vus(&self, active: u32) {
        self.lock().vus.push(f64::from(active));
    }

    pub fn set_vus_max(&self, vus: u32) {
        self.lock().vus_max = vus;
    }

    pub fn snapshot(&self) -> CollectorSnapshot {
        self.lock().clone()
    }
}

impl CheckRecorder for MetricsCollector {
    fn record(&self, check: CheckRecord) {
        let mut s = self.lock();
        let found = s
            .checks
            .iter()
            .position(|t| t.group == check.group && t.name == check.name);
        let index = match found {
            Some(i) => i,
            None => {
                s.checks.push(CheckTally {
                    group: check.group,
                    name: check.name,
                    passes: 0,
                    fails: 0,
                });
                s.checks.len() - 1
            }
        };
        let tally = &mut s.checks[index];
        if check.passed {
            tally.passes += 1;
        } else {
            tally.fails += 1;
        }
    }
}
