use crate::format::{
    format_check_pct, format_duration_ms, format_metric_number, format_number, format_pct,
    metric_cells,
};
use crate::RenderError;
use handlebars::Handlebars;
use reqload_types::{
    GroupSummary, MetricName, MetricValues, RunState, SummaryData, ThresholdStatus, VerdictStatus,
};
use serde::Serialize;

const REPORT_TEMPLATE: &str = include_str!("report.html.hbs");

#[derive(Serialize)]
struct ReportView<'a> {
    run_id: &'a str,
    base_url: &'a str,
    started_at: &'a str,
    ended_at: &'a str,
    elapsed: String,
    vus: u32,
    iterations: u64,
    duration: String,
    verdict_class: &'static str,
    verdict_label: &'static str,
    reasons: &'a [String],
    requests: u64,
    failed_requests: u64,
    checks_passed: u64,
    checks_failed: u64,
    metrics: Vec<MetricRow>,
    thresholds: Vec<ThresholdRow>,
    groups: Vec<GroupView>,
    state: &'a RunState,
    tool_name: &'a str,
    tool_version: &'a str,
}

#[derive(Serialize)]
struct Cell {
    label: String,
    value: String,
}

#[derive(Serialize)]
struct MetricRow {
    name: &'static str,
    cells: Vec<Cell>,
}

#[derive(Serialize)]
struct ThresholdRow {
    metric: &'static str,
    expression: String,
    actual: String,
    status: &'static str,
    status_label: &'static str,
}

#[derive(Serialize)]
struct CheckRow {
    name: String,
    passes: u64,
    fails: u64,
    rate: String,
    class: &'static str,
}

#[derive(Serialize)]
struct GroupView {
    title: String,
    checks: Vec<CheckRow>,
}

/// Render the self-contained HTML report.
pub fn render_html(data: &SummaryData) -> Result<String, RenderError> {
    let mut hb = Handlebars::new();
    hb.register_template_string("report", REPORT_TEMPLATE)
        .map_err(|e| RenderError::Template(Box::new(e)))?;

    let (verdict_class, verdict_label) = match data.verdict.status {
        VerdictStatus::Pass => ("pass", "PASSED"),
        VerdictStatus::Fail => ("fail", "THRESHOLDS CROSSED"),
    };

    let (checks_passed, checks_failed) = rate_counts(data, MetricName::Checks);
    let (failed_requests, _) = rate_counts(data, MetricName::HttpReqFailed);
    let requests = match data.metrics.get(&MetricName::HttpReqs).map(|m| &m.values) {
        Some(MetricValues::Counter(c)) => c.count,
        _ => 0,
    };

    let metrics = data
        .metrics
        .iter()
        .map(|(metric, summary)| MetricRow {
            name: metric.key(),
            cells: metric_cells(*metric, &summary.values)
                .into_iter()
                .map(|(label, value)| Cell { label, value })
                .collect(),
        })
        .collect();

    let thresholds = data
        .metrics
        .iter()
        .flat_map(|(metric, summary)| {
            summary.thresholds.iter().map(move |t| ThresholdRow {
                metric: metric.key(),
                expression: t.expression.clone(),
                actual: t
                    .actual
                    .map(|a| format_threshold_actual(*metric, &summary.values, a))
                    .unwrap_or_else(|| "-".to_string()),
                status: match t.status {
                    ThresholdStatus::Pass => "pass",
                    ThresholdStatus::Fail => "fail",
                    ThresholdStatus::NoData => "no_data",
                },
                status_label: match t.status {
                    ThresholdStatus::Pass => "✓ pass",
                    ThresholdStatus::Fail => "✗ fail",
                    ThresholdStatus::NoData => "no data",
                },
            })
        })
        .collect();

    let mut groups = Vec::new();
    flatten_groups(&data.root_group, &mut groups);

    let view = ReportView {
        run_id: &data.run.id,
        base_url: &data.options.base_url,
        started_at: &data.run.started_at,
        ended_at: &data.run.ended_at,
        elapsed: format_duration_ms(data.run.elapsed_ms as f64),
        vus: data.options.vus,
        iterations: data.options.iterations,
        duration: format_duration_ms(data.options.duration_ms as f64),
        verdict_class,
        verdict_label,
        reasons: &data.verdict.reasons,
        requests,
        failed_requests,
        checks_passed,
        checks_failed,
        metrics,
        thresholds,
        groups,
        state: &data.state,
        tool_name: &data.tool.name,
        tool_version: &data.tool.version,
    };

    hb.render("report", &view)
        .map_err(|e| RenderError::Render(Box::new(e)))
}

fn rate_counts(data: &SummaryData, metric: MetricName) -> (u64, u64) {
    match data.metrics.get(&metric).map(|m| &m.values) {
        Some(MetricValues::Rate(r)) => (r.trues, r.falses),
        _ => (0, 0),
    }
}

fn format_threshold_actual(metric: MetricName, values: &MetricValues, actual: f64) -> String {
    match values {
        MetricValues::Rate(_) => format_pct(actual),
        MetricValues::Trend(_) => format_metric_number(metric, actual),
        _ => format_number(actual),
    }
}

/// Depth-first list of groups that own checks, titled by their path.
fn flatten_groups(group: &GroupSummary, out: &mut Vec<GroupView>) {
    if !group.checks.is_empty() {
        let title = if group.path.is_empty() {
            "(root)".to_string()
        } else {
            group.path.trim_start_matches("::").replace("::", " / ")
        };
        out.push(GroupView {
            title,
            checks: group
                .checks
                .iter()
                .map(|c| CheckRow {
                    name: c.name.clone(),
                    passes: c.passes,
                    fails: c.fails,
                    rate: format_check_pct(c.passes, c.fails),
                    class: if c.fails == 0 { "pass" } else { "fail" },
                })
                .collect(),
        });
    }
    for child in &group.groups {
        flatten_groups(child, out);
    }
}
