//! Configuration loading and merging for reqload.
//!
//! Precedence: built-in defaults < config file < CLI overrides.
//! The result is an immutable [`RunConfig`] with parsed durations and thresholds.

use reqload_types::{
    ConfigFile, MetricName, OptionsConfig, OptionsSnapshot, ScenarioConfig, SummaryConfig,
    ThresholdExpr, ThresholdParseError,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "reqload.toml";
pub const DEFAULT_BASE_URL: &str = "https://reqres.in";
pub const DEFAULT_VUS: u32 = 1000;
pub const DEFAULT_ITERATIONS: u64 = 3500;
pub const DEFAULT_DURATION: &str = "30s";
pub const DEFAULT_GRACEFUL_STOP: &str = "30s";
pub const DEFAULT_THINK_TIME: &str = "2s";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "60s";
pub const DEFAULT_REPORT: &str = "report.html";
pub const DEFAULT_INDENT: &str = " ";

/// Upper bound for every configured duration.
pub const MAX_DURATION: &str = "365days";
const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("parse toml {path}: {source}")]
    ParseToml {
        path: String,
        source: toml::de::Error,
    },

    #[error("parse json {path}: {source}")]
    ParseJson {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid duration for {field}: {value}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        source: humantime::DurationError,
    },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field} of {value} exceeds the maximum of {max}")]
    DurationTooLong {
        field: &'static str,
        value: String,
        max: &'static str,
    },

    #[error("invalid base url {value}: {source}")]
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },

    #[error("base url must use http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("unknown metric in threshold: {0}")]
    UnknownMetric(String),

    #[error("invalid threshold for {metric}: {source}")]
    InvalidThreshold {
        metric: MetricName,
        source: ThresholdParseError,
    },

    #[error("threshold `{expression}` does not apply to {metric} ({kind:?} metric)")]
    AggregationNotApplicable {
        metric: MetricName,
        expression: String,
        kind: reqload_types::MetricKind,
    },

    #[error("vus must be at least 1")]
    ZeroVus,

    #[error("iterations ({iterations}) can't be less than vus ({vus})")]
    IterationsBelowVus { iterations: u64, vus: u32 },
}

/// Load-shape options: how many virtual users, how much work, how long.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub vus: u32,
    pub iterations: u64,
    pub duration: Duration,
    pub graceful_stop: Duration,
    pub thresholds: BTreeMap<MetricName, Vec<ThresholdExpr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSettings {
    pub think_time: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummarySettings {
    pub report_path: PathBuf,
    pub export_path: Option<PathBuf>,
    pub indent: String,
    pub enable_colors: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub base_url: String,
    pub options: LoadOptions,
    pub scenario: ScenarioSettings,
    pub summary: SummarySettings,
}

impl RunConfig {
    /// The options as recorded in the summary document.
    pub fn options_snapshot(&self) -> OptionsSnapshot {
        OptionsSnapshot {
            base_url: self.base_url.clone(),
            vus: self.options.vus,
            iterations: self.options.iterations,
            duration_ms: self.options.duration.as_millis() as u64,
            thresholds: thresholds_to_strings(&self.options.thresholds),
        }
    }

    /// Round-trip back into the file schema (used by `reqload config`).
    pub fn to_config_file(&self) -> ConfigFile {
        ConfigFile {
            base_url: Some(self.base_url.clone()),
            options: OptionsConfig {
                vus: Some(self.options.vus),
                iterations: Some(self.options.iterations),
                duration: Some(format_duration(self.options.duration)),
                graceful_stop: Some(format_duration(self.options.graceful_stop)),
                thresholds: Some(thresholds_to_strings(&self.options.thresholds)),
            },
            scenario: ScenarioConfig {
                think_time: Some(format_duration(self.scenario.think_time)),
                request_timeout: Some(format_duration(self.scenario.request_timeout)),
            },
            summary: SummaryConfig {
                report: Some(self.summary.report_path.display().to_string()),
                export: self
                    .summary
                    .export_path
                    .as_ref()
                    .map(|p| p.display().to_string()),
                indent: Some(self.summary.indent.clone()),
                enable_colors: Some(self.summary.enable_colors),
            },
        }
    }
}

/// CLI-level overrides. `None` leaves the file/default value in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub vus: Option<u32>,
    pub iterations: Option<u64>,
    pub duration: Option<String>,

    /// `(metric, expression)` pairs. Any override for a metric replaces that
    /// metric's thresholds from the file.
    pub thresholds: Vec<(String, String)>,

    pub report: Option<PathBuf>,
    pub export: Option<PathBuf>,
    pub no_color: bool,
}

/// Parse a config file. `.json` files are read as JSON, everything else as TOML.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let shown = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: shown.clone(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&text).map_err(|source| ConfigError::ParseJson {
            path: shown,
            source,
        })
    } else {
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: shown,
            source,
        })
    }
}

/// Thresholds applied when the config file does not name any.
pub fn default_thresholds() -> BTreeMap<MetricName, Vec<String>> {
    let mut t = BTreeMap::new();
    t.insert(MetricName::HttpReqDuration, vec!["avg < 2000".to_string()]);
    t.insert(MetricName::HttpReqFailed, vec!["rate < 0.01".to_string()]);
    t
}

pub fn resolve(file: &ConfigFile, overrides: &Overrides) -> Result<RunConfig, ConfigError> {
    let base_url = overrides
        .base_url
        .clone()
        .or_else(|| file.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = validate_base_url(&base_url)?;

    let vus = overrides.vus.or(file.options.vus).unwrap_or(DEFAULT_VUS);
    if vus == 0 {
        return Err(ConfigError::ZeroVus);
    }
    let iterations = overrides
        .iterations
        .or(file.options.iterations)
        .unwrap_or(DEFAULT_ITERATIONS);
    if iterations < u64::from(vus) {
        return Err(ConfigError::IterationsBelowVus { iterations, vus });
    }

    let duration = parse_positive_duration(
        "duration",
        overrides
            .duration
            .as_deref()
            .or(file.options.duration.as_deref())
            .unwrap_or(DEFAULT_DURATION),
    )?;
    let graceful_stop = parse_duration(
        "graceful_stop",
        file.options
            .graceful_stop
            .as_deref()
            .unwrap_or(DEFAULT_GRACEFUL_STOP),
    )?;

    let mut raw_thresholds = file
        .options
        .thresholds
        .clone()
        .unwrap_or_else(default_thresholds);
    let mut overridden: Vec<MetricName> = Vec::new();
    for (metric, expr) in &overrides.thresholds {
        let metric: MetricName = metric
            .parse()
            .map_err(|_| ConfigError::UnknownMetric(metric.clone()))?;
        if !overridden.contains(&metric) {
            raw_thresholds.remove(&metric);
            overridden.push(metric);
        }
        raw_thresholds.entry(metric).or_default().push(expr.clone());
    }
    let thresholds = parse_thresholds(&raw_thresholds)?;

    let think_time = parse_duration(
        "think_time",
        file.scenario
            .think_time
            .as_deref()
            .unwrap_or(DEFAULT_THINK_TIME),
    )?;
    let request_timeout = parse_positive_duration(
        "request_timeout",
        file.scenario
            .request_timeout
            .as_deref()
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
    )?;

    let report_path = overrides
        .report
        .clone()
        .or_else(|| file.summary.report.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT));
    let export_path = overrides
        .export
        .clone()
        .or_else(|| file.summary.export.as_ref().map(PathBuf::from));
    let indent = file
        .summary
        .indent
        .clone()
        .unwrap_or_else(|| DEFAULT_INDENT.to_string());
    let enable_colors = !overrides.no_color && file.summary.enable_colors.unwrap_or(true);

    Ok(RunConfig {
        base_url,
        options: LoadOptions {
            vus,
            iterations,
            duration,
            graceful_stop,
            thresholds,
        },
        scenario: ScenarioSettings {
            think_time,
            request_timeout,
        },
        summary: SummarySettings {
            report_path,
            export_path,
            indent,
            enable_colors,
        },
    })
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        source,
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

fn parse_thresholds(
    raw: &BTreeMap<MetricName, Vec<String>>,
) -> Result<BTreeMap<MetricName, Vec<ThresholdExpr>>, ConfigError> {
    let mut out = BTreeMap::new();
    for (metric, exprs) in raw {
        let mut parsed = Vec::with_capacity(exprs.len());
        for src in exprs {
            let expr: ThresholdExpr =
                src.parse()
                    .map_err(|source| ConfigError::InvalidThreshold {
                        metric: *metric,
                        source,
                    })?;
            if !expr.aggregation.applies_to(metric.kind()) {
                return Err(ConfigError::AggregationNotApplicable {
                    metric: *metric,
                    expression: src.clone(),
                    kind: metric.kind(),
                });
            }
            parsed.push(expr);
        }
        out.insert(*metric, parsed);
    }
    Ok(out)
}

fn thresholds_to_strings(
    thresholds: &BTreeMap<MetricName, Vec<ThresholdExpr>>,
) -> BTreeMap<MetricName, Vec<String>> {
    thresholds
        .iter()
        .map(|(m, exprs)| (*m, exprs.iter().map(ToString::to_string).collect()))
        .collect()
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let d = humantime::parse_duration(value).map_err(|source| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
        source,
    })?;
    if d > Duration::from_secs(MAX_DURATION_SECS) {
        return Err(ConfigError::DurationTooLong {
            field,
            value: value.to_string(),
            max: MAX_DURATION,
        });
    }
    Ok(d)
}

fn parse_positive_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let d = parse_duration(field, value)?;
    if d.is_zero() {
        return Err(ConfigError::ZeroDuration { field });
    }
    Ok(d)
}

fn format_duration(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}
