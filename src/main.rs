use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use fleetcrawl::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "fleetcrawl",
    version,
    about = "Leader-elected fleet of cooperating web crawler nodes",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (defaults to FLEETCRAWL_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path, overrides the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node and run all loops until Ctrl-C
    Run {
        /// Print Prometheus metrics on shutdown
        #[arg(long, default_value = "false")]
        metrics: bool,
    },

    /// Queue a crawl job
    Submit {
        /// Seed URL (absolute http or https)
        url: String,

        /// Link depth to follow from the seed (1-5)
        #[arg(short = 'd', long, default_value = "2")]
        max_depth: u32,

        /// Page budget (1-500)
        #[arg(short = 'p', long, default_value = "50")]
        max_pages: u32,

        /// Owner recorded on the job
        #[arg(short, long, default_value = "anonymous")]
        owner: String,
    },

    /// List jobs with task counts, newest first
    Jobs {
        /// Only jobs of this owner
        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Show the results of a job
    Results {
        /// Job id
        job_id: Uuid,
    },

    /// Show fleet membership and the current leader
    Nodes,

    /// Delete every node record
    ResetNodes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(db) = cli.db {
        config.database.sqlite_path = db;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate().context("Invalid configuration")?;

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Run { metrics } => {
            tracing::info!(db = %config.database.sqlite_path.display(), "Starting fleetcrawl node");
            commands::run::run(config, metrics).await?;
        }

        Commands::Submit {
            url,
            max_depth,
            max_pages,
            owner,
        } => {
            tracing::debug!(url = %url, max_depth, max_pages, owner = %owner, "Starting submit command");
            commands::jobs::submit(&config, url, max_depth, max_pages, owner)?;
        }

        Commands::Jobs { owner } => commands::jobs::list(&config, owner.as_deref())?,

        Commands::Results { job_id } => commands::jobs::results(&config, job_id)?,

        Commands::Nodes => commands::nodes::overview(&config)?,

        Commands::ResetNodes => commands::nodes::reset(&config)?,
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("fleetcrawl=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("fleetcrawl={level},warn")))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
