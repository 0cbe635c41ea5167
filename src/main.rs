use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use schedsync_core::Config;
use schedsync_schedule::{Clock, FixedClock, SystemClock, WeekRange};
use schedsync_sync::{SyncOrchestrator, SyncOutcome, SyncScheduler, WEEK_OFFSETS};

#[derive(Parser)]
#[command(
    name = "schedsync",
    version,
    about = "Sync your KSE weekly schedule to the team dashboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync shortly after startup and then on every interval, until Ctrl+C
    Run,
    /// Run a single sync and exit non-zero unless it succeeded
    Once,
    /// Print the week ranges a sync would request
    Weeks {
        /// Pretend today is this date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Show the config file location, its contents and validation result
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    schedsync_core::init()?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run().await,
        Command::Once => once().await,
        Command::Weeks { today } => {
            print_weeks(today);
            Ok(())
        }
        Command::Config => show_config(),
    }
}

async fn run() -> Result<()> {
    let (config, _) = Config::load_validated()?;

    let orchestrator = Arc::new(SyncOrchestrator::from_config(&config, Arc::new(SystemClock))?);
    let scheduler = SyncScheduler::from_config(orchestrator, &config.sync);
    scheduler.start();

    tracing::info!("Schedule sync running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping...");

    scheduler.stop();

    tracing::info!("Schedule sync stopped");
    Ok(())
}

async fn once() -> Result<()> {
    let (config, _) = Config::load_validated()?;
    let orchestrator = SyncOrchestrator::from_config(&config, Arc::new(SystemClock))?;

    match orchestrator.run_sync().await {
        SyncOutcome::Synced { weeks } => {
            println!("Synced {} of {} weeks", weeks, WEEK_OFFSETS.len());
            Ok(())
        }
        SyncOutcome::NotLoggedIn => anyhow::bail!(
            "Not logged in: no session under `{}`",
            config.credentials.key
        ),
        SyncOutcome::MissingToken => anyhow::bail!("Stored session has no token"),
        SyncOutcome::NoSchedules => anyhow::bail!("Failed to fetch any schedules"),
        SyncOutcome::Rejected(message) => anyhow::bail!("Dashboard rejected sync: {}", message),
        SyncOutcome::Failed(e) => anyhow::bail!("{} ({})", e.user_message(), e),
    }
}

fn print_weeks(today: Option<NaiveDate>) {
    let clock = FixedClock(today.unwrap_or_else(|| SystemClock.today()));

    println!("Today: {}", clock.0);
    for offset in WEEK_OFFSETS {
        println!("week{}: {}", offset, WeekRange::current(&clock, offset));
    }
}

fn show_config() -> Result<()> {
    let path = Config::config_path()?;
    let config = Config::load_from(&path)?;
    let validation = config.validate();

    println!("Config file: {}", path.display());
    println!("{:#?}", config);

    for error in &validation.errors {
        println!("error: {}", error);
    }
    for warning in &validation.warnings {
        println!("warning: {}", warning);
    }
    if validation.is_valid() {
        println!("Configuration is valid");
    }

    Ok(())
}
