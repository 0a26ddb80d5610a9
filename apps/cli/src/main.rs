//! crmreport CLI: Salesforce CRM data to an AI-narrated PDF report.
//!
//! Extracts accounts, contacts, opportunities, projects and contractor
//! engagements, asks Claude for per-section analysis, and renders the result.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::{EnvFilter, fmt};

use commands::{Cli, LogFormat};

/// Tracing targets of the workspace crates. Everything else logs at `warn`.
const CRATE_TARGETS: &[&str] = &[
    "crmreport",
    "crmreport_core",
    "crmreport_salesforce",
    "crmreport_pdf",
    "crmreport_shared",
];

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, &cli.log_format);
    commands::run(cli).await
}

/// Filter used when `RUST_LOG` is unset: `-v` raises the workspace crates to
/// debug, `-vv` to trace.
fn default_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    std::iter::once("warn".to_string())
        .chain(CRATE_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Logs go to stderr so stdout carries only the run summary.
fn init_tracing(verbose: u8, format: &LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    match format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
