//! # Asset Ledger
//!
//! The main binary for the asset movement ledger.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for ledger operations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                apps/asset-ledger (THE BINARY)             │
//! │                                                           │
//! │   ┌─────────────┐   ┌─────────────┐   ┌──────────────┐    │
//! │   │    CLI      │   │  HTTP API   │   │    Config    │    │
//! │   │   (clap)    │   │   (axum)    │   │ (toml + env) │    │
//! │   └──────┬──────┘   └──────┬──────┘   └──────┬───────┘    │
//! │          └─────────────────┼─────────────────┘            │
//! │                            ▼                              │
//! │                  ┌───────────────────┐                    │
//! │                  │ asset-ledger-core │                    │
//! │                  │    (THE LOGIC)    │                    │
//! │                  └───────────────────┘                    │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! asset-ledger server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! asset-ledger status
//! asset-ledger register LAPTOP-1 --registered-on 2024-01-01
//! asset-ledger move LAPTOP-1 -d warehouse_to_site --to-unit UNIT-A --to-site ROOM-1 --by clerk
//! asset-ledger list --asset LAPTOP-1
//! ```

use asset_ledger::cli;
use asset_ledger::config::LogFormat;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Configuration: defaults, then file, then environment, then flags
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "asset_ledger=info,tower_http=debug".into());

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli, config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  Asset Ledger v{}

  Warehouse • Sites • Consistent history
"#,
        env!("CARGO_PKG_VERSION")
    );
}
