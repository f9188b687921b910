use clap::{Parser, Subcommand};
use habitrack_core::{HabitSession, HabitStore, MemoryHabitStore};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;

use commands::{ConfigCommand, HabitCommand, StatsCommand};
use config::{Backend, Config};
use db::{init_db, HabitRepository};

#[derive(Parser)]
#[command(name = "habitrack")]
#[command(version)]
#[command(about = "A daily habit tracking CLI application", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage and check in habits
    Habit(HabitCommand),

    /// Show today's progress and streaks
    Stats(StatsCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habitrack=warn,habitrack_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for config init
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;
    tracing::debug!(backend = %config.backend.value, "loaded configuration");

    match (&cli.command, config.backend.value) {
        (None, _) => {
            println!("Use --help to see available commands");
        }
        (Some(Commands::Config(cmd)), _) => {
            cmd.run(&config, cli_config_path)?;
        }
        (Some(command), Backend::Sqlite) => {
            let pool = init_db(&config.database_path.value).await?;
            execute_command(command, HabitRepository::new(pool)).await?;
        }
        (Some(command), Backend::Memory) => {
            let store = MemoryHabitStore::with_demo_habits()
                .with_latency(Duration::from_millis(config.latency_ms.value));
            execute_command(command, store).await?;
        }
    }

    Ok(())
}

/// Runs a habit-level command through a fresh session over `store`.
async fn execute_command<S: HabitStore>(
    command: &Commands,
    store: S,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = HabitSession::new(store);

    match command {
        Commands::Habit(cmd) => cmd.run(&session).await,
        Commands::Stats(cmd) => cmd.run(&session).await,
        // Needs no store; handled in run()
        Commands::Config(_) => Ok(()),
    }
}
