//! Workspace-level tests for reqload.
//!
//! This crate only hosts the BDD suite (`tests/cucumber.rs`, driven by
//! `features/*.feature`) and the in-process end-to-end tests in
//! `tests/integration/`.
//!
//! The tool itself lives in the member crates:
//! - `reqload-types`: shared types, threshold expressions and the summary document
//! - `reqload-domain`: checks, statistics and threshold evaluation (no I/O)
//! - `reqload-adapters`: the HTTP client seam
//! - `reqload-config`: config file loading and resolution
//! - `reqload-render`: text and HTML summaries
//! - `reqload-app`: scenario, local host and summary use cases
//! - `reqload` (reqload-cli): the binary
