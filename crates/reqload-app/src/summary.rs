//! Turn a collector snapshot into a `SummaryData` document, and the document
//! into its output artifacts.

use crate::collector::{CheckTally, CollectorSnapshot};
use anyhow::Context;
use reqload_config::SummarySettings;
use reqload_domain::{
    evaluate_thresholds, summarize_counter, summarize_gauge, summarize_rate, summarize_trend,
};
use reqload_render::{TextSummaryOptions, render_html, text_summary};
use reqload_types::{
    CheckSummary, GroupSummary, MetricName, MetricSummary, MetricValues, OptionsSnapshot,
    RunMeta, RunState, SUMMARY_SCHEMA_V1, SummaryData, ThresholdExpr, ToolInfo,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub snapshot: CollectorSnapshot,
    pub run: RunMeta,
    pub options: OptionsSnapshot,
    pub thresholds: BTreeMap<MetricName, Vec<ThresholdExpr>>,
    pub tool: ToolInfo,
}

pub struct SummaryUseCase;

impl SummaryUseCase {
    /// Aggregate the snapshot and evaluate thresholds.
    ///
    /// Metrics that recorded nothing are left out of `metrics`; thresholds on
    /// them come out as `no_data`.
    pub fn execute(req: SummaryRequest) -> SummaryData {
        let snap = &req.snapshot;
        let elapsed_ms = req.run.elapsed_ms;
        let (check_passes, check_fails) = snap.check_totals();

        let mut values: BTreeMap<MetricName, MetricValues> = BTreeMap::new();
        let mut put = |metric: MetricName, v: Option<MetricValues>| {
            if let Some(v) = v {
                values.insert(metric, v);
            }
        };

        put(
            MetricName::Checks,
            summarize_rate(check_passes, check_fails)
                .ok()
                .map(MetricValues::Rate),
        );
        put(
            MetricName::HttpReqDuration,
            summarize_trend(&snap.http_req_durations)
                .ok()
                .map(MetricValues::Trend),
        );
        put(
            MetricName::HttpReqFailed,
            summarize_rate(snap.http_req_failed, snap.http_req_ok)
                .ok()
                .map(MetricValues::Rate),
        );
        put(
            MetricName::HttpReqs,
            summarize_counter(snap.http_reqs, elapsed_ms)
                .ok()
                .map(MetricValues::Counter),
        );
        put(
            MetricName::IterationDuration,
            summarize_trend(&snap.iteration_durations)
                .ok()
                .map(MetricValues::Trend),
        );
        put(
            MetricName::Iterations,
            summarize_counter(snap.iterations_completed, elapsed_ms)
                .ok()
                .map(MetricValues::Counter),
        );
        put(
            MetricName::Vus,
            summarize_gauge(&snap.vus).ok().map(MetricValues::Gauge),
        );
        put(
            MetricName::VusMax,
            (snap.vus_max > 0)
                .then(|| summarize_gauge(&[f64::from(snap.vus_max)]).ok())
                .flatten()
                .map(MetricValues::Gauge),
        );

        let mut trend_samples = BTreeMap::new();
        trend_samples.insert(MetricName::HttpReqDuration, snap.http_req_durations.clone());
        trend_samples.insert(
            MetricName::IterationDuration,
            snap.iteration_durations.clone(),
        );

        let evaluation = evaluate_thresholds(&values, &trend_samples, &req.thresholds);
        let mut outcomes = evaluation.outcomes;

        let metrics = values
            .into_iter()
            .map(|(metric, values)| {
                let thresholds = outcomes.remove(&metric).unwrap_or_default();
                (metric, MetricSummary { values, thresholds })
            })
            .collect();

        SummaryData {
            schema: SUMMARY_SCHEMA_V1.to_string(),
            tool: req.tool,
            run: req.run,
            options: req.options,
            metrics,
            root_group: build_groups(&snap.checks),
            state: RunState {
                iterations_completed: snap.iterations_completed,
                iterations_errored: snap.iterations_errored,
                iterations_interrupted: snap.iterations_interrupted,
            },
            verdict: evaluation.verdict,
        }
    }
}

/// Rebuild the group tree from flat `::a::b` paths, keeping first-seen order.
fn build_groups(tallies: &[CheckTally]) -> GroupSummary {
    let mut root = GroupSummary::default();
    for tally in tallies {
        let mut node = &mut root;
        for segment in tally.group.split("::").filter(|s| !s.is_empty()) {
            let path = format!("{}::{segment}", node.path);
            let index = match node.groups.iter().position(|g| g.name == segment) {
                Some(i) => i,
                None => {
                    node.groups.push(GroupSummary {
                        name: segment.to_string(),
                        path,
                        ..GroupSummary::default()
                    });
                    node.groups.len() - 1
                }
            };
            node = &mut node.groups[index];
        }
        node.checks.push(CheckSummary {
            name: tally.name.clone(),
            path: format!("{}::{}", tally.group, tally.name),
            passes: tally.passes,
            fails: tally.fails,
        });
    }
    root
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// One rendered artifact and where it should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutput {
    pub target: OutputTarget,
    pub contents: String,
}

/// Render the summary hook outputs: the HTML report, the console text and,
/// when configured, the JSON export. Pure; the caller does the writing.
pub fn handle_summary(
    data: &SummaryData,
    settings: &SummarySettings,
) -> anyhow::Result<Vec<SummaryOutput>> {
    let mut outputs = Vec::with_capacity(3);

    outputs.push(SummaryOutput {
        target: OutputTarget::File(settings.report_path.clone()),
        contents: render_html(data).context("render HTML report")?,
    });

    outputs.push(SummaryOutput {
        target: OutputTarget::Stdout,
        contents: text_summary(
            data,
            &TextSummaryOptions {
                indent: settings.indent.clone(),
                enable_colors: settings.enable_colors,
            },
        ),
    });

    if let Some(path) = &settings.export_path {
        let mut json = serde_json::to_string_pretty(data).context("serialize summary")?;
        json.push('\n');
        outputs.push(SummaryOutput {
            target: OutputTarget::File(path.clone()),
            contents: json,
        });
    }

    Ok(outputs)
}
