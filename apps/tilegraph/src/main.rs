//! # Tilegraph
//!
//! The main binary for the tile adjacency graph builder.
//!
//! ## Usage
//!
//! ```bash
//! # Write a starter configuration
//! tilegraph init
//!
//! # Build (or reuse) the adjacency graph and edge scores
//! tilegraph run --workers 8
//!
//! # Check the cache against the current inputs
//! tilegraph inspect --json-mode
//! ```

use clap::Parser;
use tilegraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // TILEGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TILEGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tilegraph=info,tilegraph_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    eprintln!("tilegraph v{}", env!("CARGO_PKG_VERSION"));
}
