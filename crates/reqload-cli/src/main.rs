use anyhow::Context;
use clap::{Parser, Subcommand};
use reqload_adapters::ReqwestHttpClient;
use reqload_app::{OutputTarget, RunLoadUseCase, SummaryOutput, SystemClock, handle_summary};
use reqload_config::{
    DEFAULT_CONFIG_FILE, DEFAULT_INDENT, DEFAULT_REPORT, Overrides, RunConfig,
    SummarySettings, load_config_file, resolve,
};
use reqload_types::{ConfigFile, SummaryData, ToolInfo};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code when the run completed but at least one threshold was crossed.
const EXIT_THRESHOLDS_CROSSED: u8 = 99;

#[derive(Debug, Parser)]
#[command(
    name = "reqload",
    version,
    about = "HTTP load scenario runner with k6-style thresholds and summaries"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the create/update user scenario and write the summary artifacts.
    Run {
        /// Config file (TOML, or JSON by extension). Defaults to ./reqload.toml if present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Target API base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Concurrent virtual users
        #[arg(long)]
        vus: Option<u32>,

        /// Total iterations shared by all virtual users
        #[arg(long)]
        iterations: Option<u64>,

        /// Maximum run time (e.g. "30s")
        #[arg(long)]
        duration: Option<String>,

        /// Threshold, e.g. http_req_duration=p(95)<500. Repeatable; replaces
        /// the configured thresholds of that metric.
        #[arg(long, value_parser = parse_key_val_string)]
        threshold: Vec<(String, String)>,

        /// HTML report path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Disable ANSI colors in the text summary
        #[arg(long, default_value_t = false)]
        no_color: bool,

        /// Also write the summary document as JSON
        #[arg(long)]
        summary_export: Option<PathBuf>,
    },

    /// Re-render the report and text summary from an exported summary (JSON).
    Summarize {
        #[arg(long)]
        input: PathBuf,

        /// HTML report path
        #[arg(long, default_value = DEFAULT_REPORT)]
        report: PathBuf,

        /// Disable ANSI colors in the text summary
        #[arg(long, default_value_t = false)]
        no_color: bool,
    },

    /// Print the resolved configuration as TOML.
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match real_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reqload=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn real_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Run {
            config,
            base_url,
            vus,
            iterations,
            duration,
            threshold,
            report,
            no_color,
            summary_export,
        } => {
            let cfg = resolve_config(
                config.as_deref(),
                &Overrides {
                    base_url,
                    vus,
                    iterations,
                    duration,
                    thresholds: threshold,
                    report,
                    export: summary_export,
                    no_color,
                },
            )?;

            let client = ReqwestHttpClient::new(cfg.scenario.request_timeout)
                .context("build http client")?;
            let usecase = RunLoadUseCase::new(client, SystemClock, tool_info());
            let outcome = usecase.execute(&cfg).await?;

            let outputs = handle_summary(&outcome.summary, &cfg.summary)?;
            emit(&outputs)?;

            if outcome.failed {
                return Ok(ExitCode::from(EXIT_THRESHOLDS_CROSSED));
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Summarize {
            input,
            report,
            no_color,
        } => {
            let data: SummaryData = read_json(&input)?;
            let settings = SummarySettings {
                report_path: report,
                export_path: None,
                indent: DEFAULT_INDENT.to_string(),
                enable_colors: !no_color,
            };
            emit(&handle_summary(&data, &settings)?)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Config { config } => {
            let cfg = resolve_config(config.as_deref(), &Overrides::default())?;
            let text =
                toml::to_string_pretty(&cfg.to_config_file()).context("serialize config")?;
            print!("{text}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "reqload".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// An explicit `--config` must exist; otherwise `./reqload.toml` is used when present.
fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<RunConfig> {
    let file = match path {
        Some(p) => load_config_file(p)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                load_config_file(default)?
            } else {
                ConfigFile::default()
            }
        }
    };
    resolve(&file, overrides).context("invalid configuration")
}

fn parse_key_val_string(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| "expected METRIC=EXPRESSION".to_string())?;
    Ok((k.trim().to_string(), v.trim().to_string()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn emit(outputs: &[SummaryOutput]) -> anyhow::Result<()> {
    for output in outputs {
        match &output.target {
            OutputTarget::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(output.contents.as_bytes())
                    .context("write summary to stdout")?;
                stdout.flush().ok();
            }
            OutputTarget::File(path) => {
                write_file(path, output.contents.as_bytes())?;
                tracing::info!(path = %path.display(), "wrote summary artifact");
            }
        }
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }
    atomic_write(path, bytes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = parent.to_path_buf();
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
