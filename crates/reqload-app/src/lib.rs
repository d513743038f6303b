//! Application layer for reqload.
//!
//! The app layer coordinates adapters and domain logic.
//! It does not parse CLI flags and it does not do filesystem I/O.

mod collector;
mod host;
mod metered;
mod scenario;
mod summary;

pub use collector::{CheckTally, CollectorSnapshot, MetricsCollector};
pub use host::{HostOptions, HostReport, LocalHost};
pub use metered::MeteredClient;
pub use scenario::{
    CREATE_JOB, CREATE_STATUS, POST_GROUP, PUT_GROUP, Scenario, ScenarioError, UPDATE_JOB,
    UPDATE_STATUS, USER_NAME, UserLifecycleScenario,
};
pub use summary::{
    OutputTarget, SummaryOutput, SummaryRequest, SummaryUseCase, handle_summary,
};

use reqload_adapters::HttpClient;
use reqload_config::RunConfig;
use reqload_types::{RunMeta, SummaryData, ToolInfo};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RunLoadOutcome {
    pub summary: SummaryData,

    /// True if any threshold was crossed.
    pub failed: bool,

    /// Human-readable reasons (for CI logs).
    pub reasons: Vec<String>,
}

/// Runs the user-lifecycle scenario on the local host and summarizes it.
pub struct RunLoadUseCase<H: HttpClient, C: Clock> {
    client: Arc<H>,
    clock: C,
    tool: ToolInfo,
}

impl<H: HttpClient + 'static, C: Clock> RunLoadUseCase<H, C> {
    pub fn new(client: H, clock: C, tool: ToolInfo) -> Self {
        Self {
            client: Arc::new(client),
            clock,
            tool,
        }
    }

    pub async fn execute(&self, config: &RunConfig) -> anyhow::Result<RunLoadOutcome> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = self.clock.now_rfc3339();

        let collector = Arc::new(MetricsCollector::new());
        let client = Arc::new(MeteredClient::new(self.client.clone(), collector.clone()));
        let scenario = Arc::new(UserLifecycleScenario::new(
            config.base_url.clone(),
            config.scenario.think_time,
        ));

        tracing::info!(run_id = %run_id, base_url = %config.base_url, "run started");

        let report = LocalHost::new(HostOptions::from(&config.options))
            .run(scenario, client, collector.clone())
            .await;

        let ended_at = self.clock.now_rfc3339();

        let summary = SummaryUseCase::execute(SummaryRequest {
            snapshot: collector.snapshot(),
            run: RunMeta {
                id: run_id,
                started_at,
                ended_at,
                elapsed_ms: report.elapsed.as_millis() as u64,
            },
            options: config.options_snapshot(),
            thresholds: config.options.thresholds.clone(),
            tool: self.tool.clone(),
        });

        let failed = summary.thresholds_crossed();
        let reasons = summary.verdict.reasons.clone();
        for reason in &reasons {
            tracing::warn!("threshold crossed: {reason}");
        }

        Ok(RunLoadOutcome {
            summary,
            failed,
            reasons,
        })
    }
}
