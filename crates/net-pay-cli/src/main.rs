mod commands;
mod input;
mod output;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use net_pay_core::{Diagnostics, EngineConfig, RuleSource};

use commands::compute::ComputeArgs;
use commands::context::ContextArgs;
use commands::countries::CountriesArgs;
use commands::lint::LintArgs;

/// Gross-to-net salary and employer cost calculations
#[derive(Parser)]
#[command(
    name = "netpay",
    version,
    about = "Gross-to-net salary and employer cost calculations",
    long_about = "A CLI for computing net pay, income tax, social contributions and \
                  total cost to employer from versioned national rule documents, \
                  with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Directory holding the rule documents (overrides NETPAY_RULES_DIR)
    #[arg(long, global = true)]
    rules_dir: Option<PathBuf>,

    /// Base URL serving the rule documents (overrides NETPAY_RULES_URL)
    #[arg(long, global = true, conflicts_with = "rules_dir")]
    rules_url: Option<url::Url>,

    /// Fail on tax classes that do not change the income tax
    #[arg(long, global = true)]
    strict: bool,

    /// Log to stderr. Repeat for more detail (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute net pay and employer cost for a salary
    Compute(ComputeArgs),
    /// Resolve and print the tax context for a country, year and class
    Context(ContextArgs),
    /// Report tax classes without an income-tax effect
    Lint(LintArgs),
    /// List supported countries
    Countries(CountriesArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment first, then flags.
fn engine_config(cli: &Cli) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = EngineConfig::from_env()?;
    if let Some(url) = &cli.rules_url {
        config.source = RuleSource::Http {
            base_url: url.clone(),
        };
    } else if let Some(dir) = &cli.rules_dir {
        config.source = RuleSource::Directory(dir.clone());
    }
    if cli.strict {
        config.diagnostics = Diagnostics::Strict;
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match engine_config(&cli)
    {
        Err(e) => Err(e),
        Ok(config) => {
            tracing::debug!(source = ?config.source, diagnostics = %config.diagnostics, "engine config");
            match cli.command {
                Commands::Compute(args) => commands::compute::run_compute(args, &config).await,
                Commands::Context(args) => commands::context::run_context(args, &config).await,
                Commands::Lint(args) => commands::lint::run_lint(args, &config).await,
                Commands::Countries(args) => {
                    commands::countries::run_countries(args, &config).await
                }
                Commands::Version => {
                    println!("netpay {}", env!("CARGO_PKG_VERSION"));
                    return;
                }
            }
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
