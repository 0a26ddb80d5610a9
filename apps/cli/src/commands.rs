//! CLI command definitions and routing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use crmreport_core::{
    ClaudeClient, ProgressReporter, ReportConfig, ReportResult, SectionKind, run_report,
};
use crmreport_salesforce::{SalesforceAuth, SalesforceClient};
use crmreport_shared::{AppConfig, init_config, load_config, resolve_claude};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// crmreport: CRM intelligence reports from Salesforce data.
#[derive(Parser)]
#[command(
    name = "crmreport",
    version,
    about = "Generate an AI-enriched CRM intelligence report (PDF) from Salesforce data.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract CRM data and write the PDF report.
    Generate {
        /// Authenticate with the `sf` CLI session instead of username/password.
        #[arg(long)]
        cli: bool,

        /// `sf` CLI org alias (defaults to the configured target org).
        #[arg(long)]
        org: Option<String>,

        /// Output path for the PDF (defaults to output_dir/report_filename).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip AI enrichment and fill sections with placeholder text.
        #[arg(long)]
        skip_ai: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config management subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default config file to ~/.crmreport/crmreport.toml.
    Init,
    /// Print the effective configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            cli,
            org,
            output,
            skip_ai,
        } => cmd_generate(cli, org, output, skip_ai).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Config file plus environment overrides.
fn effective_config() -> Result<AppConfig> {
    Ok(load_config()?.with_env_overrides()?)
}

async fn cmd_generate(
    use_cli: bool,
    org: Option<String>,
    output: Option<PathBuf>,
    skip_ai: bool,
) -> Result<()> {
    if let Some(path) = output.as_deref().filter(|p| p.is_dir()) {
        return Err(eyre!("--output must be a file path, got directory '{}'", path.display()));
    }

    let mut config = effective_config()?;
    if use_cli {
        config.salesforce.use_cli_session = true;
    }
    if let Some(org) = org {
        config.salesforce.cli_target_org = org;
    }

    // Fail on missing credentials before any network traffic.
    let auth = SalesforceAuth::from_config(&config.salesforce)?;
    info!(auth = %auth.describe(), "using Salesforce auth");

    let claude = if skip_ai {
        info!("AI enrichment skipped (--skip-ai)");
        None
    } else {
        match resolve_claude(&config) {
            Ok(settings) => Some(ClaudeClient::new(settings)?),
            Err(e) => {
                warn!(error = %e, "Claude API not configured, generating report without AI enrichment");
                None
            }
        }
    };

    let report_config = ReportConfig::from_app(&config, output);
    let reporter = CliProgress::new();

    reporter.phase("Connecting to Salesforce");
    let source = SalesforceClient::connect(&config.salesforce, &auth).await?;

    let result = run_report(&report_config, &source, claude.as_ref(), &reporter).await?;
    print_summary(&result);

    Ok(())
}

fn print_summary(result: &ReportResult) {
    let s = &result.summary;
    println!();
    println!("  Report generated successfully!");
    println!("  ID:          {}", result.report_id);
    println!("  Output:      {}", result.output_path.display());
    println!("  Pages:       {}", result.page_count);
    println!(
        "  Records:     {} accounts, {} contacts, {} opportunities, {} projects, {} engagements",
        s.total_accounts,
        s.total_contacts,
        s.total_opportunities,
        s.total_projects,
        s.total_engagements
    );
    if result.ai_skipped {
        println!("  Analysis:    skipped (placeholder text)");
    } else if !result.degraded_sections.is_empty() {
        let names: Vec<&str> = result
            .degraded_sections
            .iter()
            .map(|s| s.title())
            .collect();
        println!("  Unavailable: {}", names.join(", "));
    }
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Clear the spinner when a run fails mid-phase.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn section_started(&self, section: SectionKind, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Generating [{current}/{total}] {}", section.title()));
    }

    fn done(&self, _result: &ReportResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = effective_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::parse_from([
            "crmreport",
            "-v",
            "generate",
            "--cli",
            "--org",
            "Prod",
            "--output",
            "reports/weekly.pdf",
            "--skip-ai",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Generate {
                cli,
                org,
                output,
                skip_ai,
            } => {
                assert!(cli);
                assert_eq!(org.as_deref(), Some("Prod"));
                assert_eq!(output, Some(PathBuf::from("reports/weekly.pdf")));
                assert!(skip_ai);
            }
            Command::Config { .. } => panic!("expected generate"),
        }
    }

    #[test]
    fn parses_config_show_with_json_logs() {
        let cli = Cli::parse_from(["crmreport", "--log-format", "json", "config", "show"]);
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
