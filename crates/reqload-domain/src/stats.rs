use crate::DomainError;
use reqload_types::{CounterStats, GaugeStats, RateStats, TrendStats};

/// Summarize trend samples (milliseconds for time metrics).
///
/// Percentiles interpolate linearly between the closest ranks.
pub fn summarize_trend(values: &[f64]) -> Result<TrendStats, DomainError> {
    if values.is_empty() {
        return Err(DomainError::NoSamples);
    }
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let sum: f64 = v.iter().sum();
    Ok(TrendStats {
        avg: sum / v.len() as f64,
        min: v[0],
        med: percentile_sorted(&v, 50.0),
        max: v[v.len() - 1],
        p90: percentile_sorted(&v, 90.0),
        p95: percentile_sorted(&v, 95.0),
        count: v.len() as u64,
    })
}

/// Percentile `p` (0..=100) of an ascending, non-empty slice.
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - rank.floor();
    (sorted[lo] + (sorted[hi] - sorted[lo]) * frac).clamp(sorted[lo], sorted[hi])
}

pub fn summarize_rate(trues: u64, falses: u64) -> Result<RateStats, DomainError> {
    let total = trues + falses;
    if total == 0 {
        return Err(DomainError::NoSamples);
    }
    Ok(RateStats {
        rate: trues as f64 / total as f64,
        trues,
        falses,
    })
}

/// Counter total plus its per-second rate over `elapsed_ms` of run time.
pub fn summarize_counter(count: u64, elapsed_ms: u64) -> Result<CounterStats, DomainError> {
    if count == 0 {
        return Err(DomainError::NoSamples);
    }
    let secs = elapsed_ms as f64 / 1000.0;
    let rate = if secs <= 0.0 { 0.0 } else { count as f64 / secs };
    Ok(CounterStats { count, rate })
}

/// Gauge summary from every value it took; `value` is the last one.
pub fn summarize_gauge(values: &[f64]) -> Result<GaugeStats, DomainError> {
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return Err(DomainError::NoSamples);
    };
    let (min, max) = values
        .iter()
        .fold((*first, *first), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    Ok(GaugeStats {
        value: *last,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trend_of_known_values() {
        let s = summarize_trend(&[40.0, 10.0, 30.0, 20.0]).unwrap();
        assert_eq!(s.min, 10.0);
        assert_eq!(s.max, 40.0);
        assert_eq!(s.avg, 25.0);
        assert_eq!(s.med, 25.0);
        assert_eq!(s.count, 4);
        // rank 0.9 * 3 = 2.7 -> 30 + 0.7 * 10
        assert!((s.p90 - 37.0).abs() < 1e-9);
    }

    #[test]
    fn single_sample_trend_is_flat() {
        let s = summarize_trend(&[123.0]).unwrap();
        assert_eq!((s.min, s.med, s.max, s.p95), (123.0, 123.0, 123.0, 123.0));
    }

    #[test]
    fn empty_inputs_have_no_samples() {
        assert_eq!(summarize_trend(&[]), Err(DomainError::NoSamples));
        assert_eq!(summarize_rate(0, 0), Err(DomainError::NoSamples));
        assert_eq!(summarize_counter(0, 1000), Err(DomainError::NoSamples));
        assert_eq!(summarize_gauge(&[]), Err(DomainError::NoSamples));
    }

    #[test]
    fn rate_is_fraction_of_trues() {
        let r = summarize_rate(1, 99).unwrap();
        assert!((r.rate - 0.01).abs() < 1e-12);
    }

    #[test]
    fn counter_rate_is_per_second() {
        let c = summarize_counter(3500, 30_000).unwrap();
        assert!((c.rate - 116.666_666).abs() < 1e-3);
        assert_eq!(summarize_counter(5, 0).unwrap().rate, 0.0);
    }

    #[test]
    fn gauge_tracks_last_min_max() {
        let g = summarize_gauge(&[1.0, 1000.0, 12.0, 0.0]).unwrap();
        assert_eq!(g.value, 0.0);
        assert_eq!(g.min, 0.0);
        assert_eq!(g.max, 1000.0);
    }

    proptest! {
        #[test]
        fn prop_trend_ordering(values in prop::collection::vec(0.0f64..1e6, 1..200)) {
            let s = summarize_trend(&values).unwrap();
            prop_assert!(s.min <= s.med);
            prop_assert!(s.med <= s.p90);
            prop_assert!(s.p90 <= s.p95);
            prop_assert!(s.p95 <= s.max);
            prop_assert!(s.min <= s.avg + 1e-6 && s.avg <= s.max + 1e-6);
            prop_assert_eq!(s.count, values.len() as u64);
        }

        #[test]
        fn prop_percentile_hits_extremes(values in prop::collection::vec(-1e6f64..1e6, 1..100)) {
            let mut sorted = values.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            prop_assert_eq!(percentile_sorted(&sorted, 0.0), sorted[0]);
            prop_assert_eq!(percentile_sorted(&sorted, 100.0), sorted[sorted.len() - 1]);
        }
    }
}
