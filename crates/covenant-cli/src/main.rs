mod commands;
mod config;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use commands::analyst::AskArgs;
use commands::audit::VerifyAuditArgs;
use commands::covenants::CovenantTestArgs;
use commands::monitor::MonitorArgs;
use commands::rate::{CalculateRateArgs, RateArgs};
use commands::risk::CalculateRiskArgs;

/// Sustainability-linked loan pricing and covenant monitoring
#[derive(Parser)]
#[command(
    name = "cov",
    version,
    about = "Sustainability-linked loan pricing and covenant monitoring",
    long_about = "Prices sustainability-linked loans from monthly financial and ESG \
                  figures with decimal precision. Tests covenants, scores default risk \
                  from EBITDA volatility, and produces reproducible audit hashes."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log more (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full monthly simulation: covenants, risk, rate and audit hash
    CalculateRate(CalculateRateArgs),
    /// Score default risk from an EBITDA series
    CalculateRisk(CalculateRiskArgs),
    /// Apply the margin ratchet to pre-computed compliance flags
    Rate(RateArgs),
    /// Test the leverage covenant and the ESG emissions target
    CovenantTest(CovenantTestArgs),
    /// Recompute an audit hash and compare it with a published one
    VerifyAudit(VerifyAuditArgs),
    /// Evaluate a submission for a booked loan
    Monitor(MonitorArgs),
    /// Ask the loan analyst a question
    Ask(AskArgs),
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
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::CalculateRate(args) => commands::rate::run_calculate_rate(args),
        Commands::CalculateRisk(args) => commands::risk::run_calculate_risk(args),
        Commands::Rate(args) => commands::rate::run_rate(args),
        Commands::CovenantTest(args) => commands::covenants::run_covenant_test(args),
        Commands::VerifyAudit(args) => commands::audit::run_verify_audit(args),
        Commands::Monitor(args) => commands::monitor::run_monitor(args),
        Commands::Ask(args) => commands::analyst::run_ask(args),
        Commands::Version => {
            println!("cov {}", env!("CARGO_PKG_VERSION"));
            return;
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
