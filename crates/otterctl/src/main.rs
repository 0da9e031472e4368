//! Otter Control - CLI front end for the bundle engine
//!
//! Every command prints JSON on stdout. Logs go to stderr, filtered by
//! `OTTER_LOG` (default `warn`).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "otterctl")]
#[command(about = "Otter - over-the-air bundle updates", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and install a bundle
    Download {
        url: String,
        /// Version label stored with the bundle
        version: String,
    },

    /// Make a bundle current ("builtin" resets)
    Set { id: String },

    /// Go back to the built-in content
    Reset,

    /// Report that a bundle loaded correctly
    Success {
        id: String,
        /// Keep the previous fallback bundle on disk
        #[arg(long)]
        keep_previous: bool,
    },

    /// Report that a bundle failed to load
    Error { id: String },

    /// Delete a bundle from both storage tiers
    Delete {
        id: String,
        /// Keep the metadata record
        #[arg(long)]
        keep_record: bool,
    },

    /// Stage a bundle for the next launch (no id clears it)
    Next { id: Option<String> },

    /// Activate the staged bundle once its delay conditions are met
    ApplyNext,

    /// List downloaded bundles
    List,

    /// Show the current bundle
    Current,

    /// Show current, fallback and next bundles
    Status,

    /// Ask the update endpoint for the latest bundle
    Latest,

    /// Manage delay conditions for the staged bundle
    Delay {
        #[command(subcommand)]
        action: DelayAction,
    },
}

#[derive(Subcommand)]
enum DelayAction {
    /// Add a condition (background, kill, nativeVersion, date)
    Set { kind: String, value: Option<String> },
    /// Remove all conditions
    Clear,
    /// Show the stored conditions
    Show,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("OTTER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let engine = commands::Engine::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Download { url, version } => engine.download(&url, &version).await,
        Commands::Set { id } => engine.set(&id),
        Commands::Reset => engine.reset(),
        Commands::Success { id, keep_previous } => engine.success(&id, keep_previous),
        Commands::Error { id } => engine.error(&id),
        Commands::Delete { id, keep_record } => engine.delete(&id, keep_record),
        Commands::Next { id } => engine.next(id.as_deref()),
        Commands::ApplyNext => engine.apply_next(),
        Commands::List => engine.list(),
        Commands::Current => engine.current(),
        Commands::Status => engine.status(),
        Commands::Latest => engine.latest().await,
        Commands::Delay { action } => match action {
            DelayAction::Set { kind, value } => engine.delay_set(&kind, value),
            DelayAction::Clear => engine.delay_clear(),
            DelayAction::Show => engine.delay_show(),
        },
    }
}
