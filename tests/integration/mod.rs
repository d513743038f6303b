//! End-to-end tests that run the whole pipeline in-process.
//!
//! Config file -> resolve -> run against a local echo API -> summary
//! artifacts written to disk.

use reqload_adapters::ReqwestHttpClient;
use reqload_app::{OutputTarget, RunLoadUseCase, SystemClock, handle_summary};
use reqload_config::{Overrides, load_config_file, resolve};
use reqload_types::{MetricName, MetricValues, SummaryData, ToolInfo, VerdictStatus};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

struct Echo(u16);

impl Respond for Echo {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(self.0).set_body_raw(request.body.clone(), "application/json")
    }
}

async fn echo_api(put_status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(Echo(201))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/users/2"))
        .respond_with(Echo(put_status))
        .mount(&server)
        .await;
    server
}

fn write_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
    let config = dir.join("reqload.toml");
    let report = dir.join("out").join("report.html");
    let export = dir.join("out").join("summary.json");
    fs::write(
        &config,
        format!(
            r#"base_url = "{base_url}"

[options]
vus = 3
iterations = 6
duration = "20s"

[options.thresholds]
http_req_duration = ["avg < 2000", "p(95) < 5000"]
http_req_failed = ["rate < 0.01"]

[scenario]
think_time = "5ms"
request_timeout = "2s"

[summary]
report = {report:?}
export = {export:?}
"#
        ),
    )
    .expect("write config");
    config
}

fn tool() -> ToolInfo {
    ToolInfo {
        name: "reqload".to_string(),
        version: "0.0.0".to_string(),
    }
}

async fn run(config_path: &Path, overrides: &Overrides) -> (SummaryData, bool) {
    let file = load_config_file(config_path).expect("load config");
    let config = resolve(&file, overrides).expect("resolve config");
    let client = ReqwestHttpClient::new(config.scenario.request_timeout).expect("http client");

    let outcome = RunLoadUseCase::new(client, SystemClock, tool())
        .execute(&config)
        .await
        .expect("run completes");

    let outputs = handle_summary(&outcome.summary, &config.summary).expect("render summary");
    for output in outputs {
        if let OutputTarget::File(path) = &output.target {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create output dir");
            }
            fs::write(path, &output.contents).expect("write artifact");
        }
    }
    (outcome.summary, outcome.failed)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn healthy_run_writes_report_and_export() {
    let server = echo_api(200).await;
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path(), &server.uri());

    let (summary, failed) = run(&config, &Overrides::default()).await;

    assert!(!failed, "{:?}", summary.verdict.reasons);
    assert_eq!(summary.state.iterations_completed, 6);
    assert_eq!(summary.state.iterations_errored, 0);
    assert_eq!(summary.verdict.counts.pass, 3);

    match &summary.metrics[&MetricName::HttpReqs].values {
        MetricValues::Counter(c) => assert_eq!(c.count, 12),
        other => panic!("unexpected values: {other:?}"),
    }
    match &summary.metrics[&MetricName::Checks].values {
        MetricValues::Rate(r) => {
            assert_eq!(r.trues, 36);
            assert_eq!(r.falses, 0);
        }
        other => panic!("unexpected values: {other:?}"),
    }

    let html = fs::read_to_string(dir.path().join("out/report.html")).expect("report");
    assert!(html.contains("PASSED"));
    assert!(html.contains("postScenario"));

    let exported: SummaryData = serde_json::from_str(
        &fs::read_to_string(dir.path().join("out/summary.json")).expect("export"),
    )
    .expect("export parses back");
    assert_eq!(exported.run.id, summary.run.id);
    assert_eq!(exported.verdict, summary.verdict);

    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_updates_cross_the_failure_rate() {
    let server = echo_api(500).await;
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path(), &server.uri());

    let (summary, failed) = run(&config, &Overrides::default()).await;

    assert!(failed);
    assert_eq!(summary.verdict.status, VerdictStatus::Fail);
    assert_eq!(summary.verdict.counts.fail, 1);
    assert!(
        summary.verdict.reasons[0].starts_with("http_req_failed: rate<0.01 crossed"),
        "{:?}",
        summary.verdict.reasons
    );

    let put = summary
        .root_group
        .groups
        .iter()
        .find(|g| g.name == "putScenario")
        .expect("put group");
    let status = put
        .checks
        .iter()
        .find(|c| c.name == "Correct Status code is 200")
        .expect("status check");
    assert_eq!((status.passes, status.fails), (0, 6));

    let html = fs::read_to_string(dir.path().join("out/report.html")).expect("report");
    assert!(html.contains("THRESHOLDS CROSSED"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overrides_take_precedence_over_the_file() {
    let server = echo_api(500).await;
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path(), "http://127.0.0.1:9");

    let overrides = Overrides {
        base_url: Some(server.uri()),
        iterations: Some(3),
        thresholds: vec![("http_req_failed".to_string(), "rate<0.6".to_string())],
        ..Overrides::default()
    };
    let (summary, failed) = run(&config, &overrides).await;

    assert!(!failed, "{:?}", summary.verdict.reasons);
    assert_eq!(summary.options.iterations, 3);
    assert_eq!(
        summary.options.thresholds[&MetricName::HttpReqFailed],
        vec!["rate<0.6".to_string()]
    );
}
