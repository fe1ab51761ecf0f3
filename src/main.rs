//! market-reports: fetch daily Indian market data, keep CSV histories, draw charts.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_reports::config::AppConfig;
use market_reports::publish::GitPublisher;
use market_reports::runner::{self, RunSummary};
use market_reports::ReportKind;

#[derive(Parser)]
#[command(name = "market-reports", version, about = "Daily market data reports")]
struct Cli {
    /// Config file (default: $MARKET_REPORTS_CONFIG, then config/reports.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single report
    Run {
        #[arg(value_enum)]
        report: ReportKind,
    },
    /// Run every report listed in run_all.reports
    RunAll,
    /// run-all, then commit and push the results
    Daily,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("market_reports=info,report=info,store=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn print_summary(summaries: &[RunSummary]) {
    for s in summaries {
        println!("{}", s.line());
    }
    let failed = summaries.iter().filter(|s| !s.succeeded()).count();
    tracing::info!(total = summaries.len(), failed, "batch finished");
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load_default()?,
    };

    match cli.command {
        Command::Run { report } => {
            print_summary(&runner::run_kinds(&[report], &cfg).await?);
        }
        Command::RunAll => {
            print_summary(&runner::run_kinds(&cfg.run_all.reports, &cfg).await?);
        }
        Command::Daily => {
            print_summary(&runner::run_kinds(&cfg.run_all.reports, &cfg).await?);
            if let Err(e) = GitPublisher::from_config(&cfg).publish().await {
                tracing::error!(error = %format!("{e:#}"), "git workflow failed");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "startup failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
