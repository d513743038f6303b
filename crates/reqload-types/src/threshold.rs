//! Threshold expressions such as `avg < 2000`, `rate < 0.01` or `p(95) <= 500`.

use crate::MetricKind;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Aggregation {
    Avg,
    Min,
    Max,
    Med,
    Count,
    Rate,
    Value,

    /// Percentile in `[0, 100]`.
    Percentile(f64),
}

impl Aggregation {
    /// Whether this aggregation can be computed for a metric of the given kind.
    pub fn applies_to(self, kind: MetricKind) -> bool {
        match self {
            Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::Med
            | Aggregation::Percentile(_) => kind == MetricKind::Trend,
            Aggregation::Count => kind == MetricKind::Counter,
            Aggregation::Rate => matches!(kind, MetricKind::Rate | MetricKind::Counter),
            Aggregation::Value => kind == MetricKind::Gauge,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Count => f.write_str("count"),
            Aggregation::Rate => f.write_str("rate"),
            Aggregation::Value => f.write_str("value"),
            Aggregation::Percentile(p) => write!(f, "p({p})"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    pub fn holds(self, actual: f64, limit: f64) -> bool {
        match self {
            Comparison::Lt => actual < limit,
            Comparison::Le => actual <= limit,
            Comparison::Gt => actual > limit,
            Comparison::Ge => actual >= limit,
            Comparison::Eq => actual == limit,
            Comparison::Ne => actual != limit,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }
}

/// A parsed threshold: `<aggregation> <comparison> <value>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdExpr {
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub value: f64,
}

impl ThresholdExpr {
    /// True when the aggregated `actual` value satisfies the threshold.
    pub fn is_satisfied_by(&self, actual: f64) -> bool {
        self.comparison.holds(actual, self.value)
    }
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.aggregation,
            self.comparison.as_str(),
            self.value
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdParseError {
    #[error("threshold expression is empty")]
    Empty,

    #[error("missing comparison operator in `{0}`")]
    MissingOperator(String),

    #[error("unknown aggregation `{0}` (expected avg|min|max|med|count|rate|value|p(N))")]
    UnknownAggregation(String),

    #[error("invalid percentile `{0}` (expected p(N) with 0 <= N <= 100)")]
    InvalidPercentile(String),

    #[error("invalid threshold value `{0}`")]
    InvalidValue(String),
}

impl FromStr for ThresholdExpr {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let src = s.trim();
        if src.is_empty() {
            return Err(ThresholdParseError::Empty);
        }

        let op_start = src
            .find(['<', '>', '=', '!'])
            .ok_or_else(|| ThresholdParseError::MissingOperator(src.to_string()))?;
        let (lhs, rest) = src.split_at(op_start);

        // Longest operators first; `===` is accepted as an alias of `==`.
        let (comparison, op_len) = if rest.starts_with("===") {
            (Comparison::Eq, 3)
        } else if rest.starts_with("<=") {
            (Comparison::Le, 2)
        } else if rest.starts_with(">=") {
            (Comparison::Ge, 2)
        } else if rest.starts_with("==") {
            (Comparison::Eq, 2)
        } else if rest.starts_with("!=") {
            (Comparison::Ne, 2)
        } else if rest.starts_with('<') {
            (Comparison::Lt, 1)
        } else if rest.starts_with('>') {
            (Comparison::Gt, 1)
        } else {
            return Err(ThresholdParseError::MissingOperator(src.to_string()));
        };

        let aggregation = parse_aggregation(lhs.trim())?;

        let rhs = rest[op_len..].trim();
        let value: f64 = rhs
            .parse()
            .map_err(|_| ThresholdParseError::InvalidValue(rhs.to_string()))?;
        if !value.is_finite() {
            return Err(ThresholdParseError::InvalidValue(rhs.to_string()));
        }

        Ok(ThresholdExpr {
            aggregation,
            comparison,
            value,
        })
    }
}

fn parse_aggregation(s: &str) -> Result<Aggregation, ThresholdParseError> {
    match s {
        "avg" => return Ok(Aggregation::Avg),
        "min" => return Ok(Aggregation::Min),
        "max" => return Ok(Aggregation::Max),
        "med" => return Ok(Aggregation::Med),
        "count" => return Ok(Aggregation::Count),
        "rate" => return Ok(Aggregation::Rate),
        "value" => return Ok(Aggregation::Value),
        _ => {}
    }

    let inner = s
        .strip_prefix("p(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| ThresholdParseError::UnknownAggregation(s.to_string()))?;
    let p: f64 = inner
        .trim()
        .parse()
        .map_err(|_| ThresholdParseError::InvalidPercentile(s.to_string()))?;
    if !(0.0..=100.0).contains(&p) {
        return Err(ThresholdParseError::InvalidPercentile(s.to_string()));
    }
    Ok(Aggregation::Percentile(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_thresholds() {
        let avg: ThresholdExpr = "avg < 2000".parse().unwrap();
        assert_eq!(avg.aggregation, Aggregation::Avg);
        assert_eq!(avg.comparison, Comparison::Lt);
        assert_eq!(avg.value, 2000.0);

        let rate: ThresholdExpr = "rate<0.01".parse().unwrap();
        assert_eq!(rate.aggregation, Aggregation::Rate);
        assert_eq!(rate.value, 0.01);
    }

    #[test]
    fn parses_percentiles_and_two_char_operators() {
        let p: ThresholdExpr = "p(95) <= 500".parse().unwrap();
        assert_eq!(p.aggregation, Aggregation::Percentile(95.0));
        assert_eq!(p.comparison, Comparison::Le);

        let p: ThresholdExpr = "p(99.9)>=1".parse().unwrap();
        assert_eq!(p.aggregation, Aggregation::Percentile(99.9));
        assert_eq!(p.comparison, Comparison::Ge);

        let eq: ThresholdExpr = "count === 10".parse().unwrap();
        assert_eq!(eq.comparison, Comparison::Eq);

        let ne: ThresholdExpr = "value != 0".parse().unwrap();
        assert_eq!(ne.comparison, Comparison::Ne);
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert_eq!("".parse::<ThresholdExpr>(), Err(ThresholdParseError::Empty));
        assert!(matches!(
            "avg 2000".parse::<ThresholdExpr>(),
            Err(ThresholdParseError::MissingOperator(_))
        ));
        assert!(matches!(
            "mean < 2000".parse::<ThresholdExpr>(),
            Err(ThresholdParseError::UnknownAggregation(_))
        ));
        assert!(matches!(
            "p(101) < 2".parse::<ThresholdExpr>(),
            Err(ThresholdParseError::InvalidPercentile(_))
        ));
        assert!(matches!(
            "avg < fast".parse::<ThresholdExpr>(),
            Err(ThresholdParseError::InvalidValue(_))
        ));
    }

    #[test]
    fn display_is_compact_and_reparses() {
        let expr: ThresholdExpr = "p(90)   <   250".parse().unwrap();
        assert_eq!(expr.to_string(), "p(90)<250");
        assert_eq!(expr.to_string().parse::<ThresholdExpr>().unwrap(), expr);
    }

    #[test]
    fn aggregation_applicability_follows_metric_kind() {
        assert!(Aggregation::Avg.applies_to(MetricKind::Trend));
        assert!(!Aggregation::Avg.applies_to(MetricKind::Rate));
        assert!(Aggregation::Rate.applies_to(MetricKind::Rate));
        assert!(Aggregation::Rate.applies_to(MetricKind::Counter));
        assert!(Aggregation::Value.applies_to(MetricKind::Gauge));
        assert!(!Aggregation::Count.applies_to(MetricKind::Trend));
    }

    #[test]
    fn satisfied_matches_comparison() {
        let expr: ThresholdExpr = "avg < 2000".parse().unwrap();
        assert!(expr.is_satisfied_by(1999.9));
        assert!(!expr.is_satisfied_by(2000.0));
    }
}
