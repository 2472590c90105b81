//! # Infrawatch CLI Module
//!
//! This module implements the CLI interface for Infrawatch.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show store status
//! - `stage` - Classify the stored snapshot
//! - `signals` - List detected signals
//! - `observe` - Ingest one metric observation
//! - `classify` - Classify a snapshot from a JSON file
//! - `init` - Initialize a new store

mod commands;

use crate::pipeline::ObservationKind;
use clap::{Parser, Subcommand};
use infrawatch_core::InfrawatchError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Infrawatch - AI Infrastructure Sustainability Monitor
///
/// Classifies economic metric snapshots into lifecycle stages and turns
/// significant metric movements into discrete operator signals.
#[derive(Parser, Debug)]
#[command(name = "infrawatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the metric store database
    #[arg(short = 'D', long, global = true, default_value = "infrawatch.db")]
    pub database: PathBuf,

    /// Path to an optional toml configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show store status
    Status,

    /// Classify the stored snapshot and show the result
    Stage {
        /// Show trigger conditions and transition risks
        #[arg(short, long)]
        detailed: bool,

        /// Append the determination to the stage history
        #[arg(short, long)]
        record: bool,
    },

    /// List detected signals, newest first
    Signals {
        /// Maximum number of signals to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only show unacknowledged signals
        #[arg(short, long)]
        unread_only: bool,
    },

    /// Ingest one metric observation and run its detector
    Observe {
        /// Metric id to store the observation under
        #[arg(short, long)]
        metric_id: String,

        /// Which detector the observation feeds
        #[arg(short, long, value_enum)]
        kind: ObservationKind,

        /// Observed value
        #[arg(short = 'v', long)]
        value: f64,

        /// Upper coverage bound (coverage observations only)
        #[arg(long)]
        value_high: Option<f64>,

        /// Sector tag (A/B/C/D/E)
        #[arg(short, long)]
        sector: Option<String>,

        /// Provider tag
        #[arg(short = 'P', long)]
        provider: Option<String>,
    },

    /// Classify a metric snapshot from a JSON file (store untouched)
    Classify {
        /// Path to the snapshot JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Initialize a new empty store
    Init {
        /// Force initialization even if the store exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), InfrawatchError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            cmd_server(&cli.database, cli.config.as_deref(), host, port).await
        }
        Some(Commands::Status) => cmd_status(&cli.database, json_mode),
        Some(Commands::Stage { detailed, record }) => {
            cmd_stage(&cli.database, cli.config.as_deref(), json_mode, detailed, record)
        }
        Some(Commands::Signals { limit, unread_only }) => {
            cmd_signals(&cli.database, json_mode, limit, unread_only)
        }
        Some(Commands::Observe {
            metric_id,
            kind,
            value,
            value_high,
            sector,
            provider,
        }) => cmd_observe(
            &cli.database,
            cli.config.as_deref(),
            json_mode,
            metric_id,
            kind,
            value,
            value_high,
            sector,
            provider,
        ),
        Some(Commands::Classify { file }) => {
            cmd_classify(cli.config.as_deref(), json_mode, &file)
        }
        Some(Commands::Init { force }) => cmd_init(&cli.database, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, json_mode)
        }
    }
}
