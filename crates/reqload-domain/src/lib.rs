//! Domain logic for reqload.
//!
//! This crate is intentionally I/O-free: it does checks, math and policy.

mod checks;
mod lookup;
mod stats;
mod threshold;

pub use checks::{
    CheckRecorder, Group, MemoryRecorder, assert_response_body, assert_response_body_post,
    assert_response_body_put, assert_response_code, body_check_label, status_check_label,
};
pub use lookup::{FieldLookup, lookup_field};
pub use stats::{summarize_counter, summarize_gauge, summarize_rate, summarize_trend};
pub use threshold::{ThresholdEvaluation, evaluate_thresholds, threshold_actual};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("no samples to summarize")]
    NoSamples,
}
