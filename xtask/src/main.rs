use anyhow::Context;
use clap::{Parser, Subcommand};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};

const SUMMARY_SCHEMA: &str = "reqload.summary.v1.schema.json";
const CONFIG_SCHEMA: &str = "reqload.config.v1.schema.json";

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Repo automation for reqload")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// (Re)generate JSON Schemas for the summary document and config file.
    Schema {
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },

    /// Validate an exported summary (`--summary-export`) against the schema.
    CheckSummary {
        input: PathBuf,
    },

    /// fmt, clippy, test, schema.
    Ci,

    /// Run mutation testing via cargo-mutants (must be installed).
    Mutants {
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    match Cli::parse().cmd {
        Command::Schema { out_dir } => cmd_schema(&out_dir),
        Command::CheckSummary { input } => cmd_check_summary(&input),
        Command::Ci => cmd_ci(),
        Command::Mutants { args } => cmd_mutants(args),
    }
}

fn cmd_schema(out_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("create dir {}", out_dir.display()))?;
    write_json(
        &out_dir.join(SUMMARY_SCHEMA),
        &schema_for!(reqload_types::SummaryData),
    )?;
    write_json(
        &out_dir.join(CONFIG_SCHEMA),
        &schema_for!(reqload_types::ConfigFile),
    )?;
    println!("wrote schemas to {}", out_dir.display());
    Ok(())
}

fn cmd_check_summary(input: &Path) -> anyhow::Result<()> {
    let text =
        fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
    let instance: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parse json {}", input.display()))?;

    let schema = serde_json::to_value(schema_for!(reqload_types::SummaryData))?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("invalid summary schema: {e}"))?;

    let errors: Vec<String> = validator
        .iter_errors(&instance)
        .map(|e| format!("{}: {e}", e.instance_path))
        .collect();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("  {e}");
        }
        anyhow::bail!("{} does not match {SUMMARY_SCHEMA}", input.display());
    }

    // The schema cannot express the tag, so check it by hand.
    let tag = instance.get("schema").and_then(|v| v.as_str());
    if tag != Some(reqload_types::SUMMARY_SCHEMA_V1) {
        anyhow::bail!("unexpected schema tag {tag:?}");
    }

    println!("{}: ok", input.display());
    Ok(())
}

fn cmd_ci() -> anyhow::Result<()> {
    run("cargo", &["fmt", "--all", "--", "--check"])?;
    run(
        "cargo",
        &["clippy", "--all-targets", "--all-features", "--", "-D", "warnings"],
    )?;
    run("cargo", &["test", "--all"])?;
    run("cargo", &["run", "-p", "xtask", "--", "schema"])
}

fn cmd_mutants(args: Vec<String>) -> anyhow::Result<()> {
    let mut argv = vec!["mutants".to_string()];
    argv.extend(args);
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    run("cargo", &argv)
}

fn run(bin: &str, args: &[&str]) -> anyhow::Result<()> {
    let status = std::process::Command::new(bin)
        .args(args)
        .status()
        .with_context(|| format!("running {bin} {}", args.join(" ")))?;
    if !status.success() {
        anyhow::bail!("{bin} {} failed: {status}", args.join(" "));
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))
}
