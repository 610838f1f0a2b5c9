//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command opens the configured backend, runs one ledger operation
//! and prints either a human summary or the same JSON body the HTTP API
//! would return.

use super::{CliError, MovementArgs};
use crate::api::{
    self, AssetResponse, AuditResponse, LocationResponse, MovementListResponse, MovementResponse,
    OrderParam,
};
use crate::config::AppConfig;
use chrono::NaiveDate;
use ledger_core::{
    AssetId, AssetRegistration, Clock, Condition, Direction, Ledger, MovementCode, MovementPatch,
    MovementRecord, NewMovement, SiteId, SystemClock, UnitId,
};
use serde::Serialize;

// =============================================================================
// HELPERS
// =============================================================================

/// Open the configured backend with the configured ledger policy.
pub fn open_ledger(config: &AppConfig) -> Result<Ledger, CliError> {
    let store = config.open_backend()?;
    Ok(Ledger::new(store).with_policy(config.ledger))
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_movement(record: &MovementRecord) {
    println!("{}  #{}", record.code, record.sequence.0);
    println!("  Asset:     {}", record.asset_id);
    println!("  Direction: {}", record.direction);
    println!("  From:      {}", record.source);
    println!("  To:        {}", record.target);
    println!("  Date:      {}", record.business_date);
    println!("  Condition: {}", record.condition);
    println!("  By:        {}", record.processed_by);
    if let Some(notes) = &record.notes {
        println!("  Notes:     {}", notes);
    }
}

fn show_movement(json_mode: bool, record: &MovementRecord) {
    if json_mode {
        print_json(&MovementResponse::from(record));
    } else {
        print_movement(record);
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;

    println!("Asset Ledger Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", config.server.host);
    println!("  Port:       {}", config.server.port);
    println!("  Backend:    {}", config.storage.backend.as_str());
    println!("  Database:   {:?}", config.storage.database);
    println!("  Rate limit: {} req/s", config.server.rate_limit);
    println!("  History:    {} years", config.ledger.history_years);
    println!();
    println!("Endpoints:");
    println!("  GET    /health                      - Health check");
    println!("  POST   /assets                      - Register an asset");
    println!("  GET    /assets/{{id}}                 - Asset with cached location");
    println!("  GET    /assets/{{id}}/location        - Location resolved from history");
    println!("  GET    /assets/{{id}}/audit           - Chain audit");
    println!("  POST   /assets/{{id}}/reproject       - Rewrite cached location");
    println!("  GET    /movements                   - List movements");
    println!("  POST   /movements                   - Record a movement");
    println!("  GET    /movements/{{code}}            - Get a movement");
    println!("  PATCH  /movements/{{code}}            - Edit a movement");
    println!("  DELETE /movements/{{code}}            - Delete the latest movement");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config.server, ledger).await?;
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show ledger status.
pub fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;
    let stats = ledger.stats()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": config.storage.database.to_string_lossy(),
            "backend": config.storage.backend.as_str(),
            "history_years": config.ledger.history_years,
            "assets": stats.assets,
            "movements": stats.movements,
        }));
        return Ok(());
    }

    println!("Asset Ledger Status");
    println!("===================");
    println!("Database: {:?}", config.storage.database);
    println!("Backend:  {}", config.storage.backend.as_str());
    println!();
    println!("Assets:    {}", stats.assets);
    println!("Movements: {}", stats.movements);
    println!("History:   {} years", config.ledger.history_years);

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(config: &AppConfig, force: bool) -> Result<(), CliError> {
    let path = &config.storage.database;
    if path.exists() {
        if !force {
            return Err(CliError::DatabaseExists(path.clone()));
        }
        std::fs::remove_file(path)?;
        tracing::warn!(path = %path.display(), "existing database removed");
    }

    let _store = ledger_core::StorageBackend::open_redb(path)?;
    println!("Initialized new redb database at {:?}", path);
    Ok(())
}

// =============================================================================
// ASSET COMMANDS
// =============================================================================

/// Register an asset.
pub fn cmd_register(
    config: &AppConfig,
    json_mode: bool,
    asset_id: String,
    registered_on: Option<NaiveDate>,
    condition: Condition,
) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;
    let registration = AssetRegistration {
        id: AssetId::new(asset_id),
        registered_on: registered_on.unwrap_or_else(|| SystemClock.today()),
        condition,
    };

    let asset = ledger
        .register_asset(registration)
        .inspect_err(|e| tracing::warn!(kind = %e.kind(), "registration rejected"))?;
    tracing::info!(asset_id = %asset.id, "asset registered");

    if json_mode {
        print_json(&AssetResponse::from(&asset));
    } else {
        println!("Registered {} on {} ({})", asset.id, asset.registered_on, asset.condition);
    }
    Ok(())
}

/// Resolve an asset's current location from its chain.
pub fn cmd_locate(config: &AppConfig, json_mode: bool, asset_id: String) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;
    let id = AssetId::new(asset_id);
    let location = ledger.resolve_current_location(&id)?;

    if json_mode {
        print_json(&LocationResponse {
            asset_id: id.to_string(),
            location,
        });
        return Ok(());
    }

    match (&location.unit, &location.site) {
        (Some(unit), Some(site)) => println!("{}: site {}/{}", id, unit, site),
        _ => println!("{}: warehouse", id),
    }
    Ok(())
}

/// Check an asset's chain against the ledger invariants.
pub fn cmd_audit(config: &AppConfig, json_mode: bool, asset_id: String) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;
    let id = AssetId::new(asset_id);
    let violations = ledger.audit(&id)?;

    if !violations.is_empty() {
        tracing::warn!(asset_id = %id, count = violations.len(), "chain audit found violations");
    }

    if json_mode {
        print_json(&AuditResponse::new(&id, &violations));
        return Ok(());
    }

    if violations.is_empty() {
        println!("{}: consistent", id);
    } else {
        println!("{}: {} violation(s)", id, violations.len());
        for violation in &violations {
            println!("  - {}", violation);
        }
    }
    Ok(())
}

/// Rewrite an asset's cached location from its chain.
pub fn cmd_reproject(
    config: &AppConfig,
    json_mode: bool,
    asset_id: String,
) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;
    let asset = ledger.reproject(&AssetId::new(asset_id))?;
    tracing::info!(asset_id = %asset.id, location = %asset.location, "location reprojected");

    if json_mode {
        print_json(&AssetResponse::from(&asset));
    } else {
        println!("{}: cached location is {}", asset.id, asset.location);
    }
    Ok(())
}

// =============================================================================
// MOVEMENT COMMANDS
// =============================================================================

/// Record a movement.
pub fn cmd_move(
    config: &AppConfig,
    json_mode: bool,
    asset_id: String,
    direction: Direction,
    movement: MovementArgs,
    condition: Condition,
    by: String,
) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;
    let request = NewMovement {
        asset_id: AssetId::new(asset_id),
        direction,
        source_unit: movement.from_unit.map(UnitId::new),
        target_unit: movement.to_unit.map(UnitId::new),
        target_site: movement.to_site.map(SiteId::new),
        condition,
        business_date: movement.date,
        notes: movement.notes,
        processed_by: by,
    };

    let record = ledger
        .create_movement(request)
        .inspect_err(|e| tracing::warn!(kind = %e.kind(), "movement rejected"))?;
    tracing::info!(code = %record.code, asset_id = %record.asset_id, "movement recorded");

    show_movement(json_mode, &record);
    Ok(())
}

/// Edit a movement.
pub fn cmd_edit(
    config: &AppConfig,
    json_mode: bool,
    code: String,
    direction: Option<Direction>,
    movement: MovementArgs,
    condition: Option<Condition>,
    by: Option<String>,
) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;
    let patch = MovementPatch {
        direction,
        source_unit: movement.from_unit.map(UnitId::new),
        target_unit: movement.to_unit.map(UnitId::new),
        target_site: movement.to_site.map(SiteId::new),
        condition,
        business_date: movement.date,
        notes: movement.notes,
        processed_by: by,
    };

    let record = ledger
        .edit_movement(&MovementCode::new(code), patch)
        .inspect_err(|e| tracing::warn!(kind = %e.kind(), "edit rejected"))?;
    tracing::info!(code = %record.code, asset_id = %record.asset_id, "movement edited");

    show_movement(json_mode, &record);
    Ok(())
}

/// Delete the latest movement of an asset.
pub fn cmd_delete(config: &AppConfig, json_mode: bool, code: String) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;
    let removed = ledger
        .delete_movement(&MovementCode::new(code))
        .inspect_err(|e| tracing::warn!(kind = %e.kind(), "delete rejected"))?;
    tracing::info!(code = %removed.code, asset_id = %removed.asset_id, "movement deleted");

    if json_mode {
        print_json(&MovementResponse::from(&removed));
    } else {
        println!("Deleted {} ({})", removed.code, removed.asset_id);
    }
    Ok(())
}

/// List movements.
pub fn cmd_list(
    config: &AppConfig,
    json_mode: bool,
    asset: Option<String>,
    order: OrderParam,
) -> Result<(), CliError> {
    let ledger = open_ledger(config)?;
    let asset = asset.map(AssetId::new);
    let records = ledger.list_movements(asset.as_ref(), order.into())?;

    if json_mode {
        print_json(&MovementListResponse::new(&records));
        return Ok(());
    }

    if records.is_empty() {
        println!("No movements.");
        return Ok(());
    }

    println!(
        "{:<12} {:<16} {:<18} {:<24} {:<24} {:<10}",
        "CODE", "ASSET", "DIRECTION", "FROM", "TO", "DATE"
    );
    for record in &records {
        println!(
            "{:<12} {:<16} {:<18} {:<24} {:<24} {:<10}",
            record.code.to_string(),
            record.asset_id.to_string(),
            record.direction.to_string(),
            record.source.to_string(),
            record.target.to_string(),
            record.business_date.to_string(),
        );
    }
    println!();
    println!("{} movement(s)", records.len());
    Ok(())
}
