//! # Asset Ledger CLI Module
//!
//! This module implements the CLI interface.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show ledger status
//! - `init` - Initialize a new database
//! - `register` - Register an asset
//! - `move` - Record a movement
//! - `edit` - Edit a movement
//! - `delete` - Delete the latest movement of an asset
//! - `list` - List movements
//! - `locate` - Resolve an asset's current location
//! - `audit` - Check an asset's chain against the ledger invariants
//! - `reproject` - Rewrite an asset's cached location from its chain

mod commands;

use crate::api::OrderParam;
use crate::config::{AppConfig, BackendKind, ConfigError};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ledger_core::{Condition, Direction, LedgerError};
use std::path::PathBuf;
use thiserror::Error;

pub use commands::*;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Ledger(#[from] LedgerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database already exists at {0}. Use --force to overwrite.")]
    DatabaseExists(PathBuf),
}

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Asset Ledger
///
/// Records equipment movements between the central warehouse and the sites
/// of organizational units, keeping every asset's history consistent.
#[derive(Parser, Debug)]
#[command(name = "asset-ledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the ledger database (overrides config)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Fields shared by `move` and `edit`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct MovementArgs {
    /// Declared source unit, checked against the asset's current unit
    #[arg(long)]
    pub from_unit: Option<String>,

    /// Target organizational unit
    #[arg(long)]
    pub to_unit: Option<String>,

    /// Target site inside the unit
    #[arg(long)]
    pub to_site: Option<String>,

    /// Business date of the movement (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,
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

    /// Show ledger status
    Status,

    /// Initialize a new empty database
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Register an asset
    Register {
        /// Asset identifier
        asset_id: String,

        /// Registration date (YYYY-MM-DD, default today)
        #[arg(long)]
        registered_on: Option<NaiveDate>,

        /// Condition at registration
        #[arg(long, default_value = "good")]
        condition: Condition,
    },

    /// Record a movement
    Move {
        /// Asset identifier
        asset_id: String,

        /// warehouse_to_site, site_to_site or site_to_warehouse
        #[arg(short, long)]
        direction: Direction,

        #[command(flatten)]
        movement: MovementArgs,

        /// Condition observed at the movement
        #[arg(long, default_value = "good")]
        condition: Condition,

        /// Person who processed the movement
        #[arg(long)]
        by: String,
    },

    /// Edit a movement
    Edit {
        /// Movement code
        code: String,

        /// New direction
        #[arg(short, long)]
        direction: Option<Direction>,

        #[command(flatten)]
        movement: MovementArgs,

        /// New condition
        #[arg(long)]
        condition: Option<Condition>,

        /// New processor
        #[arg(long)]
        by: Option<String>,
    },

    /// Delete the latest movement of an asset
    Delete {
        /// Movement code
        code: String,
    },

    /// List movements
    List {
        /// Only this asset's movements
        #[arg(short, long)]
        asset: Option<String>,

        /// Sort order by sequence
        #[arg(short, long, value_enum, default_value = "desc")]
        order: OrderParam,
    },

    /// Resolve an asset's current location from its chain
    Locate {
        /// Asset identifier
        asset_id: String,
    },

    /// Check an asset's chain against the ledger invariants
    Audit {
        /// Asset identifier
        asset_id: String,
    },

    /// Rewrite an asset's cached location from its chain
    Reproject {
        /// Asset identifier
        asset_id: String,
    },
}

impl Cli {
    /// Load the configuration and apply this invocation's overrides.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// CLI flags win over file and environment.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(database) = &self.database {
            config.storage.database.clone_from(database);
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend;
        }
        if let Some(Commands::Server { host, port }) = &self.command {
            if let Some(host) = host {
                config.server.host.clone_from(host);
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved configuration.
pub async fn execute(cli: Cli, config: AppConfig) -> Result<(), CliError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&config).await,
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Register {
            asset_id,
            registered_on,
            condition,
        }) => cmd_register(&config, json_mode, asset_id, registered_on, condition),
        Some(Commands::Move {
            asset_id,
            direction,
            movement,
            condition,
            by,
        }) => cmd_move(&config, json_mode, asset_id, direction, movement, condition, by),
        Some(Commands::Edit {
            code,
            direction,
            movement,
            condition,
            by,
        }) => cmd_edit(&config, json_mode, code, direction, movement, condition, by),
        Some(Commands::Delete { code }) => cmd_delete(&config, json_mode, code),
        Some(Commands::List { asset, order }) => cmd_list(&config, json_mode, asset, order),
        Some(Commands::Locate { asset_id }) => cmd_locate(&config, json_mode, asset_id),
        Some(Commands::Audit { asset_id }) => cmd_audit(&config, json_mode, asset_id),
        Some(Commands::Reproject { asset_id }) => cmd_reproject(&config, json_mode, asset_id),
        Some(Commands::Status) | None => cmd_status(&config, json_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_move_command() {
        let cli = Cli::try_parse_from([
            "asset-ledger",
            "--backend",
            "memory",
            "move",
            "LAPTOP-1",
            "--direction",
            "warehouse_to_site",
            "--to-unit",
            "UNIT-A",
            "--to-site",
            "ROOM-1",
            "--date",
            "2024-03-01",
            "--by",
            "clerk",
        ])
        .expect("parse");

        assert_eq!(cli.backend, Some(BackendKind::Memory));
        match cli.command {
            Some(Commands::Move {
                direction,
                movement,
                condition,
                ..
            }) => {
                assert_eq!(direction, Direction::WarehouseToSite);
                assert_eq!(movement.to_unit.as_deref(), Some("UNIT-A"));
                assert_eq!(movement.date, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert_eq!(condition, Condition::Good);
            }
            other => unreachable!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "asset-ledger",
            "-D",
            "/tmp/other.redb",
            "server",
            "--port",
            "9999",
        ])
        .expect("parse");

        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.storage.database, PathBuf::from("/tmp/other.redb"));
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let result = Cli::try_parse_from([
            "asset-ledger",
            "move",
            "LAPTOP-1",
            "--direction",
            "teleport",
            "--by",
            "clerk",
        ]);
        assert!(result.is_err());
    }
}
