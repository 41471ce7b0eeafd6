//! Binary entry point for the `wsprobe` CLI.

mod cli;

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use cli::{Cli, StressCommand};
use wsprobe::{
    ApiKey, ConfigError, HttpManagementClient, ManagementError, MySqlProbe, ProbeConfig,
    ProbeOrchestrator, Region, RunError, StressError, StressReport, logging,
};

type Orchestrator = ProbeOrchestrator<HttpManagementClient, MySqlProbe>;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to initialise management client: {0}")]
    Client(#[source] ManagementError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("failed to render regions: {0}")]
    Render(#[from] serde_json::Error),
    #[error("stress loop stopped after {completed_loops} completed loops: {failure}")]
    Stress {
        completed_loops: u64,
        #[source]
        failure: StressError,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init();

    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let orchestrator = build_orchestrator()?;
    match cli {
        Cli::Regions => {
            let regions = orchestrator.list_regions().await?;
            write_regions(io::stdout(), &regions)
        }
        Cli::Provision => {
            let outcome = orchestrator.provision_and_probe().await?;
            writeln!(io::stdout(), "{}", outcome.value).ok();
            Ok(())
        }
        Cli::Stress(command) => run_stress(&orchestrator, command).await,
    }
}

/// The API key is checked before configuration so a missing key is reported
/// without touching any file or the network.
fn build_orchestrator() -> Result<Orchestrator, CliError> {
    let api_key = ApiKey::from_env()?;
    let config = ProbeConfig::load_without_cli_args()?;
    config.validate()?;
    let client =
        HttpManagementClient::new(&config.api_base_url, api_key).map_err(CliError::Client)?;
    Ok(ProbeOrchestrator::new(client, MySqlProbe, config))
}

async fn run_stress(orchestrator: &Orchestrator, command: StressCommand) -> Result<(), CliError> {
    let report = orchestrator.stress(command.max_loops).await?;
    write_stress_summary(io::stdout(), &report);
    stress_outcome(report)
}

fn write_regions(mut target: impl Write, regions: &[Region]) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(regions)?;
    writeln!(target, "{rendered}").ok();
    Ok(())
}

fn write_stress_summary(mut target: impl Write, report: &StressReport) {
    writeln!(target, "completed loops: {}", report.completed_loops).ok();
}

fn stress_outcome(report: StressReport) -> Result<(), CliError> {
    match report.failure {
        Some(failure) => Err(CliError::Stress {
            completed_loops: report.completed_loops,
            failure,
        }),
        None => Ok(()),
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
