use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use apptrack::cli::{companies, init, list, run, stats};
use apptrack::config::Config;
use apptrack::store::SqliteStore;

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Email-driven job application tracking pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "apptrack.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Process unread messages and update the tracking tables
    Run,

    /// List tracked applications
    List {
        /// Filter by status (Received, Rejected, Reviewing, Interview, Accepted, Draft)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by company name (matched on the normalized key)
        #[arg(long)]
        company: Option<String>,
    },

    /// List tracked companies
    Companies,

    /// Create the mailbox, store, and a starter config file
    Init,

    /// Show tracking statistics
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config).unwrap_or_default();

    match cli.command {
        Commands::Run => {
            let store = SqliteStore::open(&config.store_path())?;
            run::run(&config, &store)?;
        }
        Commands::List { status, company } => {
            let store = SqliteStore::open(&config.store_path())?;
            list::run(&store, status, company)?;
        }
        Commands::Companies => {
            let store = SqliteStore::open(&config.store_path())?;
            companies::run(&store)?;
        }
        Commands::Init => {
            init::run(&config, &cli.config)?;
        }
        Commands::Stats => {
            let store = SqliteStore::open(&config.store_path())?;
            stats::run(&store)?;
        }
    }

    Ok(())
}
