//! # Infrawatch - AI Infrastructure Sustainability Monitor
//!
//! The main binary for the Infrawatch monitoring stack.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for observations, signals and stage queries
//! - Scheduled stage evaluation
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                  apps/infrawatch (THE BINARY)                  │
//! │                                                                │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐   │
//! │  │   CLI       │    │   HTTP API  │    │  Evaluation Job  │   │
//! │  │  (clap)     │    │   (axum)    │    │  (tokio timer)   │   │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘   │
//! │         │                  │                    │              │
//! │         └──────────────────┼────────────────────┘              │
//! │                            ▼                                   │
//! │                 ┌───────────────────┐                          │
//! │                 │  infrawatch-core  │                          │
//! │                 │   (THE LOGIC)     │                          │
//! │                 └───────────────────┘                          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! infrawatch server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! infrawatch status
//! infrawatch stage --detailed
//! infrawatch observe -m c_spot_discount -k spot_discount -v 0.38
//! infrawatch signals --unread-only
//! ```

use clap::Parser;
use infrawatch::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — INFRAWATCH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("INFRAWATCH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "infrawatch=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Infrawatch startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗███╗   ██╗███████╗██████╗  █████╗ ██╗    ██╗
  ██║████╗  ██║██╔════╝██╔══██╗██╔══██╗██║    ██║
  ██║██╔██╗ ██║█████╗  ██████╔╝███████║██║ █╗ ██║
  ██║██║╚██╗██║██╔══╝  ██╔══██╗██╔══██║██║███╗██║
  ██║██║ ╚████║██║     ██║  ██║██║  ██║╚███╔███╔╝
  ╚═╝╚═╝  ╚═══╝╚═╝     ╚═╝  ╚═╝╚═╝  ╚═╝ ╚══╝╚══╝

  AI Infrastructure Sustainability Monitor v{}

  Deterministic • Auditable • Quiet until it matters
"#,
        env!("CARGO_PKG_VERSION")
    );
}
