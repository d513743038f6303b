//! Named boolean assertions over HTTP responses.
//!
//! Every helper records exactly one check and returns whether it passed.
//! A failing check never aborts the caller.

use crate::lookup::lookup_field;
use reqload_types::{CheckRecord, Response};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

/// Sink for check results. Provided by whoever hosts the scenario.
pub trait CheckRecorder: Send + Sync {
    fn record(&self, check: CheckRecord);
}

/// Records checks into `parent` under a named group (`::name`).
pub struct Group<'a, R: ?Sized> {
    parent: &'a R,
    name: String,
}

impl<'a, R: CheckRecorder + ?Sized> Group<'a, R> {
    pub fn new(parent: &'a R, name: impl Into<String>) -> Self {
        Self {
            parent,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<R: CheckRecorder + ?Sized> CheckRecorder for Group<'_, R> {
    fn record(&self, mut check: CheckRecord) {
        check.group = format!("::{}{}", self.name, check.group);
        self.parent.record(check);
    }
}

/// Keeps every record in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<CheckRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CheckRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Result of the most recent check with this name, if any.
    pub fn last(&self, name: &str) -> Option<bool> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|c| c.name == name)
            .map(|c| c.passed)
    }
}

impl CheckRecorder for MemoryRecorder {
    fn record(&self, check: CheckRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(check);
    }
}

pub fn status_check_label(expected: u16) -> String {
    format!("Correct Status code is {expected}")
}

pub fn body_check_label(field: &str, expected: &Value) -> String {
    let shown = match expected {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    format!("Response body field '{field}' same with '{shown}'")
}

/// Check that the response status equals `expected`.
pub fn assert_response_code<R: CheckRecorder + ?Sized>(
    checks: &R,
    response: &Response,
    expected: u16,
) -> bool {
    let passed = response.status == expected;
    checks.record(CheckRecord::new(status_check_label(expected), passed));
    passed
}

/// Check that the JSON body's top-level `field` equals `expected`.
///
/// A body that is not JSON, or that lacks the field, records a failed check.
pub fn assert_response_body<R: CheckRecorder + ?Sized>(
    checks: &R,
    response: &Response,
    field: &str,
    expected: impl Into<Value>,
) -> bool {
    let expected = expected.into();
    let passed = lookup_field(&response.body, field).matches(&expected);
    checks.record(CheckRecord::new(body_check_label(field, &expected), passed));
    passed
}

/// Body check for the create-user response.
pub fn assert_response_body_post<R: CheckRecorder + ?Sized>(
    checks: &R,
    response: &Response,
    field: &str,
    expected: impl Into<Value>,
) -> bool {
    assert_response_body(checks, response, field, expected)
}

/// Body check for the update-user response.
pub fn assert_response_body_put<R: CheckRecorder + ?Sized>(
    checks: &R,
    response: &Response,
    field: &str,
    expected: impl Into<Value>,
) -> bool {
    assert_response_body(checks, response, field, expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> Response {
        Response::new(201, r#"{"name":"Dummy","job":"leader","id":"7","createdAt":"now"}"#)
    }

    #[test]
    fn status_check_passes_and_fails() {
        let rec = MemoryRecorder::new();
        assert!(assert_response_code(&rec, &created(), 201));
        assert!(!assert_response_code(&rec, &created(), 200));

        let records = rec.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Correct Status code is 201");
        assert!(records[0].passed);
        assert_eq!(records[1].name, "Correct Status code is 200");
        assert!(!records[1].passed);
    }

    #[test]
    fn body_check_matches_echoed_field() {
        let rec = MemoryRecorder::new();
        assert!(assert_response_body_post(&rec, &created(), "name", "Dummy"));
        assert!(!assert_response_body_post(&rec, &created(), "name", "Wrong"));

        assert_eq!(
            rec.last("Response body field 'name' same with 'Dummy'"),
            Some(true)
        );
        assert_eq!(
            rec.last("Response body field 'name' same with 'Wrong'"),
            Some(false)
        );
    }

    #[test]
    fn non_json_body_records_a_failure_without_panicking() {
        let rec = MemoryRecorder::new();
        let res = Response::new(200, "upstream connect error");
        assert!(!assert_response_body_put(&rec, &res, "job", "zion resident"));
        assert_eq!(rec.records().len(), 1);
        assert!(!rec.records()[0].passed);
    }

    #[test]
    fn missing_field_records_a_failure() {
        let rec = MemoryRecorder::new();
        let res = Response::new(200, r#"{"name":"Dummy"}"#);
        assert!(!assert_response_body_put(&rec, &res, "job", "zion resident"));
        assert_eq!(rec.records().len(), 1);
    }

    #[test]
    fn each_helper_records_exactly_one_check() {
        let rec = MemoryRecorder::new();
        let res = created();
        assert_response_code(&rec, &res, 201);
        assert_response_body_post(&rec, &res, "name", "Dummy");
        assert_response_body_post(&rec, &res, "job", "leader");
        assert_eq!(rec.records().len(), 3);
        assert!(rec.records().iter().all(|c| c.passed));
    }

    #[test]
    fn groups_prefix_the_path() {
        let rec = MemoryRecorder::new();
        {
            let outer = Group::new(&rec, "putScenario");
            let inner = Group::new(&outer, "retry");
            assert_response_code(&outer, &Response::new(200, ""), 200);
            assert_response_code(&inner, &Response::new(200, ""), 200);
        }
        let records = rec.records();
        assert_eq!(records[0].group, "::putScenario");
        assert_eq!(records[1].group, "::putScenario::retry");
    }

    #[test]
    fn label_embeds_non_string_values_as_json() {
        assert_eq!(
            body_check_label("id", &Value::from(2)),
            "Response body field 'id' same with '2'"
        );
    }
}
