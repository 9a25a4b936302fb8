use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use courier::db::{self, MetricsRepo};
use courier::{Config, Daemon};

/// Courier - Telegram relay for OpenAI chat models
#[derive(Parser)]
#[command(name = "courier", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print persisted per-user request totals
    Metrics,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,courier=info",
        1 => "info,courier=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Metrics => cmd_metrics(&config),
        };
    }

    tracing::info!(
        data_dir = %config.data_dir.display(),
        "starting courier relay"
    );

    let daemon = Daemon::new(config)?;
    daemon.run().await?;

    Ok(())
}

/// Print persisted per-user totals
fn cmd_metrics(config: &Config) -> anyhow::Result<()> {
    let pool = db::init(&config.db_path)?;
    let repo = MetricsRepo::new(pool);

    let all = repo.list()?;
    if all.is_empty() {
        println!("No usage recorded yet");
        return Ok(());
    }

    println!("{:>12}  {:>8}  {:>8}", "user_id", "count", "pro");
    for m in all {
        println!("{:>12}  {:>8}  {:>8}", m.user_id, m.count, m.count_pro);
    }

    Ok(())
}
