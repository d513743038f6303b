use crate::stats::percentile_sorted;
use reqload_types::{
    Aggregation, MetricName, MetricValues, ThresholdExpr, ThresholdOutcome, ThresholdStatus,
    Verdict, VerdictCounts, VerdictStatus,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdEvaluation {
    pub outcomes: BTreeMap<MetricName, Vec<ThresholdOutcome>>,
    pub verdict: Verdict,
}

/// The aggregated value a threshold compares against.
///
/// `samples` are the raw trend samples (any order); they are only consulted
/// for percentiles other than p(90) and p(95). Returns `None` when the
/// aggregation does not apply to the metric's kind.
pub fn threshold_actual(expr: &ThresholdExpr, values: &MetricValues, samples: &[f64]) -> Option<f64> {
    match (expr.aggregation, values) {
        (Aggregation::Avg, MetricValues::Trend(t)) => Some(t.avg),
        (Aggregation::Min, MetricValues::Trend(t)) => Some(t.min),
        (Aggregation::Max, MetricValues::Trend(t)) => Some(t.max),
        (Aggregation::Med, MetricValues::Trend(t)) => Some(t.med),
        (Aggregation::Percentile(p), MetricValues::Trend(t)) => {
            if p == 90.0 {
                Some(t.p90)
            } else if p == 95.0 {
                Some(t.p95)
            } else if samples.is_empty() {
                None
            } else {
                let mut sorted = samples.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                Some(percentile_sorted(&sorted, p))
            }
        }
        (Aggregation::Rate, MetricValues::Rate(r)) => Some(r.rate),
        (Aggregation::Rate, MetricValues::Counter(c)) => Some(c.rate),
        (Aggregation::Count, MetricValues::Counter(c)) => Some(c.count as f64),
        (Aggregation::Value, MetricValues::Gauge(g)) => Some(g.value),
        _ => None,
    }
}

/// Evaluate every threshold against the aggregated metrics.
///
/// A metric missing from `metrics` recorded no samples; its thresholds are
/// reported as `no_data` and do not fail the run.
pub fn evaluate_thresholds(
    metrics: &BTreeMap<MetricName, MetricValues>,
    trend_samples: &BTreeMap<MetricName, Vec<f64>>,
    thresholds: &BTreeMap<MetricName, Vec<ThresholdExpr>>,
) -> ThresholdEvaluation {
    let mut outcomes: BTreeMap<MetricName, Vec<ThresholdOutcome>> = BTreeMap::new();
    let mut reasons: Vec<String> = Vec::new();
    let mut counts = VerdictCounts::default();

    for (metric, exprs) in thresholds {
        let values = metrics.get(metric);
        let samples = trend_samples.get(metric).map(Vec::as_slice).unwrap_or(&[]);

        for expr in exprs {
            let actual = values.and_then(|v| threshold_actual(expr, v, samples));
            let status = match actual {
                None => ThresholdStatus::NoData,
                Some(a) if expr.is_satisfied_by(a) => ThresholdStatus::Pass,
                Some(_) => ThresholdStatus::Fail,
            };

            match status {
                ThresholdStatus::Pass => counts.pass += 1,
                ThresholdStatus::NoData => counts.no_data += 1,
                ThresholdStatus::Fail => {
                    counts.fail += 1;
                    reasons.push(format!(
                        "{metric}: {expr} crossed (actual {actual})",
                        actual = format_actual(actual.unwrap_or_default())
                    ));
                }
            }

            outcomes.entry(*metric).or_default().push(ThresholdOutcome {
                expression: expr.to_string(),
                status,
                actual,
            });
        }
    }

    let status = if counts.fail > 0 {
        VerdictStatus::Fail
    } else {
        VerdictStatus::Pass
    };

    ThresholdEvaluation {
        outcomes,
        verdict: Verdict {
            status,
            counts,
            reasons,
        },
    }
}

fn format_actual(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.4}")
    }
}
