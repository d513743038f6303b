use reqload_types::{MetricName, MetricValues};

/// Milliseconds as a short human duration (`812.40µs`, `312.40ms`, `2.31s`, `1m4.00s`).
pub fn format_duration_ms(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.2}µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{ms:.2}ms")
    } else if ms < 60_000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        let minutes = (ms / 60_000.0).floor();
        format!(
            "{}m{:.2}s",
            minutes as u64,
            (ms - minutes * 60_000.0) / 1000.0
        )
    }
}

pub fn format_pct(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Whole-percent pass rate of a check, rounded down so a failing check never
/// reads as 100%.
pub fn format_check_pct(passes: u64, fails: u64) -> String {
    let total = passes + fails;
    let pct = if total == 0 { 0 } else { passes * 100 / total };
    format!("{pct}%")
}

pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

/// A trend/gauge value, formatted as a duration for time metrics.
pub fn format_metric_number(metric: MetricName, v: f64) -> String {
    if metric.is_time() {
        format_duration_ms(v)
    } else {
        format_number(v)
    }
}

/// `label=value` cells describing one metric, in display order.
pub fn metric_cells(metric: MetricName, values: &MetricValues) -> Vec<(String, String)> {
    match values {
        MetricValues::Counter(c) => vec![
            ("count".to_string(), c.count.to_string()),
            ("rate".to_string(), format!("{:.6}/s", c.rate)),
        ],
        MetricValues::Gauge(g) => vec![
            ("value".to_string(), format_number(g.value)),
            ("min".to_string(), format_number(g.min)),
            ("max".to_string(), format_number(g.max)),
        ],
        MetricValues::Rate(r) => vec![
            ("rate".to_string(), format_pct(r.rate)),
            ("✓".to_string(), r.trues.to_string()),
            ("✗".to_string(), r.falses.to_string()),
        ],
        MetricValues::Trend(t) => vec![
            ("avg".to_string(), format_metric_number(metric, t.avg)),
            ("min".to_string(), format_metric_number(metric, t.min)),
            ("med".to_string(), format_metric_number(metric, t.med)),
            ("max".to_string(), format_metric_number(metric, t.max)),
            ("p(90)".to_string(), format_metric_number(metric, t.p90)),
            ("p(95)".to_string(), format_metric_number(metric, t.p95)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_pick_a_unit() {
        assert_eq!(format_duration_ms(0.5), "500.00µs");
        assert_eq!(format_duration_ms(312.4), "312.40ms");
        assert_eq!(format_duration_ms(2310.0), "2.31s");
        assert_eq!(format_duration_ms(64_000.0), "1m4.00s");
    }

    #[test]
    fn numbers_drop_zero_fraction() {
        assert_eq!(format_number(1000.0), "1000");
        assert_eq!(format_number(0.5), "0.50");
        assert_eq!(format_pct(0.0123), "1.23%");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn durations_always_carry_a_unit(ms in 0.0f64..1.0e9) {
                let s = format_duration_ms(ms);
                prop_assert!(
                    s.ends_with("µs") || s.ends_with("ms") || s.ends_with('s'),
                    "no unit in {s}"
                );
            }

            #[test]
            fn percentages_round_trip_to_two_places(rate in 0.0f64..=1.0) {
                let s = format_pct(rate);
                prop_assert!(s.ends_with('%'));
                let n: f64 = s.trim_end_matches('%').parse().unwrap();
                prop_assert!((n - rate * 100.0).abs() <= 0.005 + 1e-9);
            }

            #[test]
            fn check_pct_is_100_only_without_failures(passes in 0u64..100_000, fails in 0u64..100) {
                let s = format_check_pct(passes, fails);
                prop_assert_eq!(s == "100%", fails == 0 && passes > 0);
            }
        }
    }
}
