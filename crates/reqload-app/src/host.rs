//! Local executor: `vus` workers sharing an iteration budget under a deadline.
//!
//! Workers claim iterations one at a time from a shared counter and stop
//! claiming once the budget is spent or `duration` has elapsed. Iterations
//! already running at that point get `graceful_stop` to finish; anything still
//! running afterwards is aborted and counted as interrupted.

use crate::collector::MetricsCollector;
use crate::scenario::Scenario;
use reqload_adapters::HttpClient;
use reqload_config::LoadOptions;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostOptions {
    pub vus: u32,
    pub iterations: u64,
    pub duration: Duration,
    pub graceful_stop: Duration,
}

impl From<&LoadOptions> for HostOptions {
    fn from(o: &LoadOptions) -> Self {
        Self {
            vus: o.vus,
            iterations: o.iterations,
            duration: o.duration,
            graceful_stop: o.graceful_stop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostReport {
    pub elapsed: Duration,
    pub interrupted: u64,
}

#[derive(Debug, Default)]
struct Shared {
    remaining: AtomicU64,
    in_flight: AtomicU64,
    active_vus: AtomicU32,
}

impl Shared {
    fn claim(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Roughly 30 years, used when `at + d` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn instant_after(at: Instant, d: Duration) -> Instant {
    at.checked_add(d)
        .or_else(|| at.checked_add(FAR_FUTURE))
        .unwrap_or(at)
}

pub struct LocalHost {
    options: HostOptions,
}

impl LocalHost {
    pub fn new(options: HostOptions) -> Self {
        Self { options }
    }

    pub async fn run<S, C>(
        &self,
        scenario: Arc<S>,
        client: Arc<C>,
        collector: Arc<MetricsCollector>,
    ) -> HostReport
    where
        S: Scenario + 'static,
        C: HttpClient + 'static,
    {
        let HostOptions {
            vus,
            iterations,
            duration,
            graceful_stop,
        } = self.options;

        info!(vus, iterations, ?duration, ?graceful_stop, "starting run");

        let started = Instant::now();
        let deadline = instant_after(started, duration);
        let hard_stop = instant_after(deadline, graceful_stop);

        let shared = Arc::new(Shared {
            remaining: AtomicU64::new(iterations),
            ..Shared::default()
        });
        collector.set_vus_max(vus);

        let mut workers = JoinSet::new();
        for vu in 1..=vus {
            let scenario = scenario.clone();
            let client = client.clone();
            let collector = collector.clone();
            let shared = shared.clone();
            workers.spawn(async move {
                let active = shared.active_vus.fetch_add(1, Ordering::AcqRel) + 1;
                collector.sample_vus(active);

                while Instant::now() < deadline && shared.claim() {
                    shared.in_flight.fetch_add(1, Ordering::AcqRel);
                    let iteration_started = Instant::now();

                    let result = scenario.run(&*client, &*collector).await;

                    let elapsed_ms = iteration_started.elapsed().as_secs_f64() * 1000.0;
                    collector.record_iteration(elapsed_ms, result.is_err());
                    shared.in_flight.fetch_sub(1, Ordering::AcqRel);

                    if let Err(err) = result {
                        debug!(vu, error = %err, "iteration aborted");
                    }
                }

                let active = shared.active_vus.fetch_sub(1, Ordering::AcqRel) - 1;
                collector.sample_vus(active);
            });
        }

        let drained = tokio::time::timeout_at(hard_stop, async {
            while workers.join_next().await.is_some() {}
        })
        .await;

        let mut interrupted = 0;
        if drained.is_err() {
            workers.abort_all();
            while workers.join_next().await.is_some() {}
            interrupted = shared.in_flight.load(Ordering::Acquire);
            warn!(
                interrupted,
                ?graceful_stop,
                "iterations still running after graceful stop were interrupted"
            );
            collector.record_interrupted(interrupted);
        }

        let elapsed = started.elapsed();
        info!(elapsed_ms = elapsed.as_millis() as u64, "run finished");
        HostReport {
            elapsed,
            interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioError;
    use async_trait::async_trait;
    use reqload_adapters::TransportError;
    use reqload_domain::CheckRecorder;
    use reqload_types::{CheckRecord, Request, Response};

    struct NoopClient;

    #[async_trait]
    impl HttpClient for NoopClient {
        async fn send(&self, _request: &Request) -> Result<Response, TransportError> {
            Ok(Response::new(200, Vec::new()))
        }
    }

    /// Sleeps for `work` and records one passing check per iteration.
    struct Sleepy {
        work: Duration,
        fail: bool,
    }

    #[async_trait]
    impl Scenario for Sleepy {
        async fn run(
            &self,
            client: &dyn HttpClient,
            checks: &dyn CheckRecorder,
        ) -> Result<(), ScenarioError> {
            tokio::time::sleep(self.work).await;
            if self.fail {
                return Err(ScenarioError::Transport {
                    phase: "create",
                    source: TransportError::Timeout {
                        url: "http://api.test".into(),
                    },
                });
            }
            let _ = client.send(&Request::new(reqload_types::HttpMethod::Get, "/")).await;
            checks.record(CheckRecord::new("ok", true));
            Ok(())
        }
    }

    async fn run_host(options: HostOptions, scenario: Sleepy) -> (HostReport, Arc<MetricsCollector>) {
        let collector = Arc::new(MetricsCollector::new());
        let report = LocalHost::new(options)
            .run(Arc::new(scenario), Arc::new(NoopClient), collector.clone())
            .await;
        (report, collector)
    }

    fn options(vus: u32, iterations: u64, duration_secs: u64, graceful_secs: u64) -> HostOptions {
        HostOptions {
            vus,
            iterations,
            duration: Duration::from_secs(duration_secs),
            graceful_stop: Duration::from_secs(graceful_secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn iteration_budget_is_never_exceeded() {
        let scenario = Sleepy {
            work: Duration::from_millis(10),
            fail: false,
        };
        let (report, collector) = run_host(options(4, 10, 60, 30), scenario).await;

        let snap = collector.snapshot();
        assert_eq!(snap.iterations_completed, 10);
        assert_eq!(snap.checks[0].passes, 10);
        assert_eq!(report.interrupted, 0);
        assert_eq!(snap.vus_max, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn vus_gauge_follows_users_starting_and_stopping() {
        let scenario = Sleepy {
            work: Duration::from_millis(10),
            fail: false,
        };
        let (_, collector) = run_host(options(4, 8, 60, 30), scenario).await;

        let vus = collector.snapshot().vus;
        assert_eq!(vus.len(), 8);
        assert_eq!(vus.iter().cloned().fold(f64::MIN, f64::max), 4.0);
        assert_eq!(vus.last(), Some(&0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_deadlines_do_not_panic() {
        let scenario = Sleepy {
            work: Duration::from_millis(10),
            fail: false,
        };
        let opts = HostOptions {
            vus: 2,
            iterations: 4,
            duration: Duration::MAX,
            graceful_stop: Duration::MAX,
        };
        let (report, collector) = run_host(opts, scenario).await;

        assert_eq!(collector.snapshot().iterations_completed, 4);
        assert_eq!(report.interrupted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn no_iteration_starts_after_the_duration() {
        // 3 VUs, 1s per iteration, 5s duration: each VU starts iterations at
        // t=0..4 and finishes the last one at t=5.
        let scenario = Sleepy {
            work: Duration::from_secs(1),
            fail: false,
        };
        let (report, collector) = run_host(options(3, 1_000, 5, 30), scenario).await;

        assert_eq!(collector.snapshot().iterations_completed, 15);
        assert_eq!(report.interrupted, 0);
        assert!(report.elapsed <= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn iterations_outliving_graceful_stop_are_interrupted() {
        let scenario = Sleepy {
            work: Duration::from_secs(100),
            fail: false,
        };
        let (report, collector) = run_host(options(2, 10, 1, 2), scenario).await;

        let snap = collector.snapshot();
        assert_eq!(report.interrupted, 2);
        assert_eq!(snap.iterations_interrupted, 2);
        assert_eq!(snap.iterations_completed, 0);
        assert!(report.elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_iterations_are_counted_as_errored() {
        let scenario = Sleepy {
            work: Duration::from_millis(5),
            fail: true,
        };
        let (_, collector) = run_host(options(2, 6, 60, 30), scenario).await;

        let snap = collector.snapshot();
        assert_eq!(snap.iterations_completed, 6);
        assert_eq!(snap.iterations_errored, 6);
        assert!(snap.checks.is_empty());
    }
}
