//! Shared types for reqload.
//!
//! Design goal: versioned, explicit, boring.
//! These structs describe the requests a scenario sends, the checks it records,
//! the config file it is driven by, and the summary document a run produces.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

mod threshold;

pub use threshold::{Aggregation, Comparison, ThresholdExpr, ThresholdParseError};

pub const SUMMARY_SCHEMA_V1: &str = "reqload.summary.v1";

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

// ----------------------------
// Request / response
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outgoing HTTP call. Built fresh per call and never mutated after send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Serialize `payload` as the body and set `Content-Type: application/json`.
    pub fn json<T: Serialize>(
        method: HttpMethod,
        url: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(payload)?;
        Ok(Self::new(method, url)
            .with_header("Content-Type", CONTENT_TYPE_JSON)
            .with_body(body))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body interpreted as UTF-8 lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// 2xx and 3xx count as expected statuses for `http_req_failed`.
    pub fn is_expected_status(&self) -> bool {
        (200..=399).contains(&self.status)
    }
}

/// JSON body sent by the user create/update calls.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UserPayload {
    pub name: String,
    pub job: String,
}

// ----------------------------
// Checks
// ----------------------------

/// One named boolean assertion, as handed to a check recorder.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CheckRecord {
    /// Group path, `""` for the root group and `::name` for nested groups.
    #[serde(default)]
    pub group: String,
    pub name: String,
    pub passed: bool,
}

impl CheckRecord {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            group: String::new(),
            name: name.into(),
            passed,
        }
    }
}

// ----------------------------
// Metrics
// ----------------------------

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Checks,
    HttpReqDuration,
    HttpReqFailed,
    HttpReqs,
    IterationDuration,
    Iterations,
    Vus,
    VusMax,
}

impl MetricName {
    pub const ALL: [MetricName; 8] = [
        MetricName::Checks,
        MetricName::HttpReqDuration,
        MetricName::HttpReqFailed,
        MetricName::HttpReqs,
        MetricName::IterationDuration,
        MetricName::Iterations,
        MetricName::Vus,
        MetricName::VusMax,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MetricName::Checks => "checks",
            MetricName::HttpReqDuration => "http_req_duration",
            MetricName::HttpReqFailed => "http_req_failed",
            MetricName::HttpReqs => "http_reqs",
            MetricName::IterationDuration => "iteration_duration",
            MetricName::Iterations => "iterations",
            MetricName::Vus => "vus",
            MetricName::VusMax => "vus_max",
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            MetricName::Checks | MetricName::HttpReqFailed => MetricKind::Rate,
            MetricName::HttpReqDuration | MetricName::IterationDuration => MetricKind::Trend,
            MetricName::HttpReqs | MetricName::Iterations => MetricKind::Counter,
            MetricName::Vus | MetricName::VusMax => MetricKind::Gauge,
        }
    }

    /// Trend metrics measured in milliseconds render as durations.
    pub fn is_time(self) -> bool {
        matches!(
            self,
            MetricName::HttpReqDuration | MetricName::IterationDuration
        )
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for MetricName {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricName::ALL
            .into_iter()
            .find(|m| m.key() == s.trim())
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Rate,
    Trend,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TrendStats {
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
    pub count: u64,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RateStats {
    /// trues / (trues + falses)
    pub rate: f64,
    pub trues: u64,
    pub falses: u64,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CounterStats {
    pub count: u64,

    /// count per second of test run time.
    pub rate: f64,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GaugeStats {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MetricValues {
    Counter(CounterStats),
    Gauge(GaugeStats),
    Rate(RateStats),
    Trend(TrendStats),
}

impl MetricValues {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValues::Counter(_) => MetricKind::Counter,
            MetricValues::Gauge(_) => MetricKind::Gauge,
            MetricValues::Rate(_) => MetricKind::Rate,
            MetricValues::Trend(_) => MetricKind::Trend,
        }
    }
}

// ----------------------------
// Summary document
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStatus {
    Pass,
    Fail,

    /// The metric recorded no samples, so the expression was not evaluated.
    NoData,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ThresholdOutcome {
    /// Normalised expression, e.g. `avg<2000`.
    pub expression: String,
    pub status: ThresholdStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MetricSummary {
    pub values: MetricValues,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thresholds: Vec<ThresholdOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub path: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    /// Fraction of passing evaluations, 0.0 when never evaluated.
    pub fn pass_rate(&self) -> f64 {
        let total = self.passes + self.fails;
        if total == 0 {
            0.0
        } else {
            self.passes as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct GroupSummary {
    pub name: String,
    pub path: String,

    #[serde(default)]
    pub checks: Vec<CheckSummary>,

    #[serde(default)]
    pub groups: Vec<GroupSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunMeta {
    pub id: String,
    pub started_at: String,
    pub ended_at: String,
    pub elapsed_ms: u64,
}

/// The options a run was executed with, as recorded in the summary.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OptionsSnapshot {
    pub base_url: String,
    pub vus: u32,
    pub iterations: u64,
    pub duration_ms: u64,

    #[serde(default)]
    pub thresholds: BTreeMap<MetricName, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct RunState {
    pub iterations_completed: u64,
    pub iterations_errored: u64,
    pub iterations_interrupted: u64,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct VerdictCounts {
    pub pass: u32,
    pub fail: u32,
    pub no_data: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub counts: VerdictCounts,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SummaryData {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunMeta,
    pub options: OptionsSnapshot,
    pub metrics: BTreeMap<MetricName, MetricSummary>,
    pub root_group: GroupSummary,
    pub state: RunState,
    pub verdict: Verdict,
}

impl SummaryData {
    pub fn thresholds_crossed(&self) -> bool {
        self.verdict.status == VerdictStatus::Fail
    }
}

// ----------------------------
// Optional config file schema
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub options: OptionsConfig,

    #[serde(default)]
    pub scenario: ScenarioConfig,

    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OptionsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vus: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,

    /// Duration string parseable by humantime, e.g. "30s".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// How long in-flight iterations may run past `duration`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graceful_stop: Option<String>,

    /// Metric name to threshold expressions, e.g. `http_req_duration = ["avg < 2000"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<BTreeMap<MetricName, Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Pause between the create and update phases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SummaryConfig {
    /// HTML report path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,

    /// Optional JSON export of the summary document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_colors: Option<bool>,
}
