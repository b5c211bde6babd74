//! Platescan CLI - Meal photo nutrition analysis tool
//!
//! A command-line interface for analyzing meal photos, managing the daily
//! analysis quota, and maintaining the local user profile.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "platescan")]
#[command(author, version, about = "Meal photo nutrition analysis CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Override database path (or set PLATESCAN_DB_PATH env var)
    #[arg(long, env = "PLATESCAN_DB_PATH", global = true)]
    db: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more meal photos
    Analyze(commands::analyze::AnalyzeArgs),

    /// Inspect or adjust the daily analysis quota
    Quota {
        #[command(subcommand)]
        action: commands::quota::QuotaAction,
    },

    /// Show usage statistics
    Stats,

    /// Manage the stored user profile
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    // Set up database path if provided
    if let Some(db_path) = &cli.db {
        std::env::set_var("PLATESCAN_DB_PATH", db_path);
    }

    // Initialize database
    let db = platescan_core::Database::new().await?;

    // Create context for commands
    let ctx = commands::Context {
        db,
        format: cli.format,
        quiet: cli.quiet,
    };

    // Execute command
    match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(&ctx, args).await,
        Commands::Quota { action } => commands::quota::execute(&ctx, action).await,
        Commands::Stats => commands::quota::execute_stats(&ctx).await,
        Commands::Session { action } => commands::session::execute(&ctx, action).await,
    }
}
