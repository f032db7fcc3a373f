//! Boardsync CLI
//!
//! Mirrors a public job board into a Notion database.
//!
//! # Commands
//!
//! - `sync` - Create, update and mark stale records
//! - `plan` - Show what `sync` would do without writing
//! - `check` - Verify the token, database access and property mapping
//! - `version` - Show version information

mod commands;
mod settings;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::settings::{CliError, Settings};

/// Sync a job board into a Notion database.
#[derive(Parser)]
#[command(name = "boardsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Notion integration token
    #[arg(global = true, long, env = "NOTION_API_KEY", hide_env_values = true)]
    notion_token: Option<String>,

    /// Target Notion database id
    #[arg(global = true, long, env = "NOTION_DATABASE_ID")]
    database_id: Option<String>,

    /// Greenhouse board token
    #[arg(
        global = true,
        long,
        env = "GREENHOUSE_BOARD",
        default_value = boardsync_source::DEFAULT_BOARD
    )]
    board: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// A single JSON document
    Json,
}

/// Options shared by `sync` and `plan`.
#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    /// Skip per-posting detail requests
    #[arg(long)]
    pub listing_only: bool,

    /// Proceed when the board lists no matching postings
    #[arg(long)]
    pub allow_empty: bool,

    /// Remove the stale marker when a posting reappears
    #[arg(long)]
    pub clear_stale_on_reappear: bool,

    /// Compare every source-owned field, not only title and timestamp
    #[arg(long)]
    pub detect_all_fields: bool,

    /// Pause between writes, in milliseconds
    #[arg(long, default_value_t = 350)]
    pub write_interval_ms: u64,

    /// JSON file overriding Notion property names
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, update and mark stale records
    Sync {
        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,

        #[command(flatten)]
        args: SyncArgs,
    },

    /// Show what sync would do without writing
    Plan {
        #[command(flatten)]
        args: SyncArgs,
    },

    /// Verify the token, database access and property mapping
    Check {
        /// JSON file overriding Notion property names
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Version = cli.command {
        println!("boardsync v{}", env!("CARGO_PKG_VERSION"));
        println!("Notion API version {}", boardsync_client::NOTION_VERSION);
        return Ok(());
    }

    let settings = Settings::resolve(cli.notion_token, cli.database_id, cli.board)?;
    match cli.command {
        Commands::Sync { dry_run, args } => commands::sync::run(&settings, &args, dry_run),
        Commands::Plan { args } => commands::plan::run(&settings, &args),
        Commands::Check { schema } => commands::check::run(&settings, schema.as_deref()),
        Commands::Version => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}
