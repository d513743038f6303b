//! Condensed console summary, modelled on the classic load-test end-of-run block.

use crate::format::{format_check_pct, format_duration_ms, format_pct, metric_cells};
use console::Style;
use reqload_types::{
    GroupSummary, MetricName, MetricSummary, MetricValues, SummaryData, ThresholdStatus,
};
use std::fmt::Write;

const MIN_NAME_WIDTH: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSummaryOptions {
    /// Prefix for every line.
    pub indent: String,
    pub enable_colors: bool,
}

impl Default for TextSummaryOptions {
    fn default() -> Self {
        Self {
            indent: " ".to_string(),
            enable_colors: true,
        }
    }
}

struct Palette {
    pass: Style,
    fail: Style,
    value: Style,
    dim: Style,
    bold: Style,
}

impl Palette {
    fn new(enabled: bool) -> Self {
        Self {
            pass: Style::new().green().force_styling(enabled),
            fail: Style::new().red().force_styling(enabled),
            value: Style::new().cyan().force_styling(enabled),
            dim: Style::new().dim().force_styling(enabled),
            bold: Style::new().bold().force_styling(enabled),
        }
    }

    fn mark(&self, passed: bool) -> String {
        if passed {
            self.pass.apply_to("✓").to_string()
        } else {
            self.fail.apply_to("✗").to_string()
        }
    }
}

pub fn text_summary(data: &SummaryData, opts: &TextSummaryOptions) -> String {
    let p = Palette::new(opts.enable_colors);
    let indent = opts.indent.as_str();
    let mut out = String::new();

    let _ = writeln!(out);
    write_group(&mut out, &p, indent, &data.root_group, 0);

    let width = data
        .metrics
        .keys()
        .map(|m| m.key().len() + 3)
        .max()
        .unwrap_or(0)
        .max(MIN_NAME_WIDTH);

    let _ = writeln!(out, "{indent}");
    for (metric, summary) in &data.metrics {
        write_metric(&mut out, &p, indent, width, *metric, summary);
    }

    let _ = writeln!(out, "{indent}");
    let _ = writeln!(
        out,
        "{indent}{} {} complete and {} errored and {} interrupted iterations in {}",
        p.bold.apply_to("run:"),
        data.state
            .iterations_completed
            .saturating_sub(data.state.iterations_errored),
        data.state.iterations_errored,
        data.state.iterations_interrupted,
        format_duration_ms(data.run.elapsed_ms as f64),
    );

    let crossed: Vec<&str> = data
        .metrics
        .iter()
        .filter(|(_, s)| s.thresholds.iter().any(|t| t.status == ThresholdStatus::Fail))
        .map(|(m, _)| m.key())
        .collect();
    if crossed.is_empty() {
        let _ = writeln!(
            out,
            "{indent}{} {}",
            p.bold.apply_to("thresholds:"),
            p.pass.apply_to("all passed")
        );
    } else {
        let names = crossed
            .iter()
            .map(|n| format!("'{n}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "{indent}{} {}",
            p.bold.apply_to("thresholds:"),
            p.fail
                .apply_to(format!("thresholds on metrics {names} have been crossed"))
        );
    }

    out
}

fn write_group(out: &mut String, p: &Palette, indent: &str, group: &GroupSummary, depth: usize) {
    let pad = "  ".repeat(depth);

    if depth > 0 {
        let _ = writeln!(out, "{indent}{pad}█ {}", group.name);
        let _ = writeln!(out, "{indent}");
    }

    let check_pad = if depth > 0 { format!("{pad}  ") } else { pad };
    for check in &group.checks {
        let ok = check.fails == 0;
        let _ = writeln!(out, "{indent}{check_pad}{} {}", p.mark(ok), check.name);
        if !ok {
            let _ = writeln!(
                out,
                "{indent}{check_pad} {} {} {} {} / {} {}",
                p.dim.apply_to("↳"),
                format_check_pct(check.passes, check.fails),
                p.pass.apply_to("✓"),
                check.passes,
                p.fail.apply_to("✗"),
                check.fails,
            );
        }
    }

    for (i, child) in group.groups.iter().enumerate() {
        if i > 0 || !group.checks.is_empty() {
            let _ = writeln!(out, "{indent}");
        }
        write_group(out, p, indent, child, depth + 1);
    }
}

fn write_metric(
    out: &mut String,
    p: &Palette,
    indent: &str,
    width: usize,
    metric: MetricName,
    summary: &MetricSummary,
) {
    let name = metric.key();
    let dots = ".".repeat(width.saturating_sub(name.len()));

    let mark = if summary.thresholds.is_empty() {
        "  ".to_string()
    } else {
        let ok = summary
            .thresholds
            .iter()
            .all(|t| t.status != ThresholdStatus::Fail);
        format!("{} ", p.mark(ok))
    };

    let values = match &summary.values {
        MetricValues::Rate(r) => format!(
            "{} {} {} {} {}",
            p.value.apply_to(format_pct(r.rate)),
            p.pass.apply_to("✓"),
            p.value.apply_to(r.trues),
            p.fail.apply_to("✗"),
            p.value.apply_to(r.falses),
        ),
        MetricValues::Counter(c) => format!(
            "{} {}",
            p.value.apply_to(c.count),
            p.value.apply_to(format!("{:.6}/s", c.rate)),
        ),
        other => metric_cells(metric, other)
            .into_iter()
            .map(|(label, value)| format!("{label}={}", p.value.apply_to(value)))
            .collect::<Vec<_>>()
            .join(" "),
    };

    let _ = writeln!(out, "{indent}{mark}{name}{}: {values}", p.dim.apply_to(dots));

    for t in &summary.thresholds {
        let shown = match t.status {
            ThresholdStatus::Pass => p.pass.apply_to(format!("{{ {} }}", t.expression)),
            ThresholdStatus::Fail => p.fail.apply_to(format!("{{ {} }}", t.expression)),
            ThresholdStatus::NoData => p.dim.apply_to(format!("{{ {} }} no data", t.expression)),
        };
        let _ = writeln!(out, "{indent}    {shown}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_summary;

    fn plain() -> TextSummaryOptions {
        TextSummaryOptions {
            indent: " ".to_string(),
            enable_colors: false,
        }
    }

    #[test]
    fn plain_text_has_no_escape_sequences() {
        let text = text_summary(&sample_summary(), &plain());
        assert!(!text.contains('\u{1b}'), "unexpected ANSI escape in:\n{text}");
    }

    #[test]
    fn colored_text_has_escape_sequences() {
        let text = text_summary(&sample_summary(), &TextSummaryOptions::default());
        assert!(text.contains("\u{1b}["));
    }

    #[test]
    fn every_line_carries_the_indent() {
        let opts = TextSummaryOptions {
            indent: ">>".to_string(),
            enable_colors: false,
        };
        let text = text_summary(&sample_summary(), &opts);
        for line in text.lines().skip(1) {
            assert!(line.starts_with(">>"), "line without indent: {line:?}");
        }
    }

    #[test]
    fn groups_and_checks_are_listed() {
        let text = text_summary(&sample_summary(), &plain());
        assert!(text.contains("█ postScenario"));
        assert!(text.contains("✓ Correct Status code is 201"));
        assert!(text.contains("✗ Response body field 'job' same with 'zion resident'"));
        assert!(text.contains("↳ 90% ✓ 9 / ✗ 1"));
    }

    #[test]
    fn metric_table_uses_dotted_names() {
        let text = text_summary(&sample_summary(), &plain());
        assert!(text.contains("✓ http_req_duration......"));
        assert!(text.contains("avg=250.00ms"));
        assert!(text.contains("{ avg<2000 }"));
        assert!(text.contains("thresholds: all passed"));
    }

    #[test]
    fn crossed_thresholds_are_named() {
        let mut data = sample_summary();
        if let Some(m) = data.metrics.get_mut(&MetricName::HttpReqFailed) {
            m.thresholds[0].status = ThresholdStatus::Fail;
        }
        let text = text_summary(&data, &plain());
        assert!(text.contains("✗ http_req_failed"));
        assert!(text.contains("thresholds on metrics 'http_req_failed' have been crossed"));
    }

    #[test]
    fn nearly_passing_check_is_not_shown_as_100_percent() {
        let mut data = sample_summary();
        data.root_group.checks.push(reqload_types::CheckSummary {
            name: "mostly fine".into(),
            path: "::mostly fine".into(),
            passes: 199,
            fails: 1,
        });
        let text = text_summary(&data, &plain());
        assert!(text.contains("↳ 99% ✓ 199 / ✗ 1"), "{text}");
        assert!(!text.contains("↳ 100%"));
    }
}
