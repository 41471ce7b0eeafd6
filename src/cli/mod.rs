//! Command-line interface definitions for the `wsprobe` binary.
//!
//! The parser lives here so the build script can reuse it when generating the
//! manual page.

use clap::Parser;

/// Top-level CLI for the `wsprobe` binary.
#[derive(Debug, Parser)]
#[command(
    name = "wsprobe",
    version,
    about = "Provision a database workspace, probe it, and stress its suspend/resume cycle",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// List the regions offered by the management API as JSON.
    #[command(name = "regions", about = "List available regions as JSON")]
    Regions,
    /// Provision a workspace, wait until it is active, and run `select 1`.
    #[command(
        name = "provision",
        about = "Provision a workspace, run a connectivity probe, and clean up"
    )]
    Provision,
    /// Provision a workspace and repeatedly suspend, resume, and probe it.
    #[command(
        name = "stress",
        about = "Loop suspend, resume, and probe until a stage fails"
    )]
    Stress(StressCommand),
}

/// Arguments for the `wsprobe stress` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct StressCommand {
    /// Stop successfully after this many complete iterations.
    ///
    /// Without it the loop runs until a stage fails.
    #[arg(long, value_name = "N")]
    pub(crate) max_loops: Option<u64>,
}
