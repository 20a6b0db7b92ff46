//! Clusterflow CLI - run the cluster provisioning playbooks in order.

use anyhow::Context;
use clap::Parser;
use clusterflow::config::DeploymentConfig;
use clusterflow::deployment::{Deployment, DeploymentReport, GateState, ReadinessGate};
use clusterflow::diagnostics::CommandDiagnosticCollector;
use clusterflow::observability::{init_logging, LogFormat};
use clusterflow::plan::{build_plan, selected_entries};
use clusterflow::runner::ProcessRunner;
use clusterflow::status::{global_status_store, StatusSink};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

const OPERATOR: &str = "operator";

#[derive(Parser)]
#[command(name = "clusterflow")]
#[command(about = "Run cluster provisioning playbooks in order, stopping at the first failure")]
#[command(version)]
struct Cli {
    /// Ansible inventory file
    inventory: Option<PathBuf>,

    /// Directory holding the playbooks; commands run here
    working_dir: Option<PathBuf>,

    /// Per-stage timeout in minutes
    timeout_minutes: Option<u64>,

    /// JSON config file; command line values win over it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    /// Run only these catalogue stages, in this order
    #[arg(long = "stage", value_name = "ID")]
    stages: Vec<String>,

    /// Wait for Enter on stdin before starting
    #[arg(long)]
    wait_for_operator: bool,

    /// Forward status updates to this status service instead of keeping them in memory
    #[cfg(feature = "http-sink")]
    #[arg(long, value_name = "URL")]
    status_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match run(cli).await {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            if let Some(failed) = report.failed_stage() {
                error!(stage = %failed.stage_id, "Deployment failed");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<DeploymentReport> {
    let config = load_config(&cli)?;
    let plan = build_plan(&config).context("Invalid stage selection")?;
    let playbooks = selected_entries(&config)?;
    config
        .validate(playbooks.iter().map(|e| e.playbook))
        .context("Deployment prerequisites are missing")?;

    let sink = status_sink(&cli)?;
    let handle = Deployment::launch(
        plan,
        Arc::new(ProcessRunner::new()),
        Arc::clone(&sink),
        Arc::new(CommandDiagnosticCollector::new(&config.diagnostics_path)),
    );

    if config.auto_start && !cli.wait_for_operator {
        handle.start();
    } else {
        let gate = ReadinessGate::arm([OPERATOR], handle.trigger(), sink).await;
        println!("Deployment {} is ready. Press Enter to start.", handle.run_id());
        let confirmed = wait_for_enter().await;
        if gate.report(OPERATOR, confirmed).await != GateState::Opened {
            info!("Deployment not confirmed, shutting down");
        }
    }

    let report = handle.wait().await?;
    println!("{}", serde_json::to_string_pretty(&report.stage_summary())?);
    Ok(report)
}

fn load_config(cli: &Cli) -> anyhow::Result<DeploymentConfig> {
    let mut config = match &cli.config {
        Some(path) => DeploymentConfig::from_json_file(path)?,
        None => DeploymentConfig::default(),
    }
    .apply_env_overrides()?;

    if let Some(inventory) = &cli.inventory {
        config = config.with_inventory(inventory);
    }
    if let Some(dir) = &cli.working_dir {
        config = config.with_playbooks_dir(dir);
    }
    if let Some(minutes) = cli.timeout_minutes {
        config = config.with_timeout_minutes(minutes);
    }
    if !cli.stages.is_empty() {
        config = config.with_stages(cli.stages.iter().cloned());
    }
    Ok(config)
}

#[cfg(feature = "http-sink")]
fn status_sink(cli: &Cli) -> anyhow::Result<Arc<dyn StatusSink>> {
    match &cli.status_url {
        Some(url) => Ok(Arc::new(
            clusterflow::status::HttpStatusSink::new(url).context("Failed to build HTTP client")?,
        )),
        None => Ok(global_status_store()),
    }
}

#[cfg(not(feature = "http-sink"))]
#[allow(clippy::unnecessary_wraps)]
fn status_sink(_cli: &Cli) -> anyhow::Result<Arc<dyn StatusSink>> {
    Ok(global_status_store())
}

async fn wait_for_enter() -> bool {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    matches!(lines.next_line().await, Ok(Some(_)))
}
