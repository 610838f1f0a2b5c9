//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Ledger calls are synchronous; the per-asset lock lives inside
//! `ledger_core::Ledger`, so handlers share the ledger without an outer lock.

use super::{
    AppState,
    types::{
        ApiError, AssetResponse, AuditResponse, CreateMovementRequest, EditMovementRequest,
        HealthResponse, ListQuery, LocationResponse, MovementListResponse, MovementResponse,
        RegisterAssetRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use ledger_core::{AssetId, MovementCode};

type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let stats = state.ledger.stats()?;
    let backend = if state.ledger.store().is_persistent() {
        "redb"
    } else {
        "memory"
    };

    Ok((
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend: backend.to_string(),
            assets: stats.assets,
            movements: stats.movements,
        }),
    ))
}

// =============================================================================
// ASSET HANDLERS
// =============================================================================

/// Register an asset.
pub async fn register_asset_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterAssetRequest>,
) -> ApiResult<AssetResponse> {
    let asset = state.ledger.register_asset(request.into_registration())?;
    tracing::info!(asset_id = %asset.id, "asset registered");
    Ok((StatusCode::CREATED, Json(AssetResponse::from(&asset))))
}

/// Get an asset with its cached location.
pub async fn get_asset_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> ApiResult<AssetResponse> {
    let asset = state.ledger.asset(&AssetId::new(asset_id))?;
    Ok((StatusCode::OK, Json(AssetResponse::from(&asset))))
}

/// Resolve the current location from the movement chain.
pub async fn location_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> ApiResult<LocationResponse> {
    let id = AssetId::new(asset_id);
    let location = state.ledger.resolve_current_location(&id)?;
    Ok((
        StatusCode::OK,
        Json(LocationResponse {
            asset_id: id.to_string(),
            location,
        }),
    ))
}

/// Audit the stored chain of an asset.
pub async fn audit_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> ApiResult<AuditResponse> {
    let id = AssetId::new(asset_id);
    let violations = state.ledger.audit(&id)?;
    if !violations.is_empty() {
        tracing::warn!(asset_id = %id, count = violations.len(), "chain audit found violations");
    }
    Ok((StatusCode::OK, Json(AuditResponse::new(&id, &violations))))
}

/// Rewrite the cached location from the movement chain.
pub async fn reproject_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> ApiResult<AssetResponse> {
    let asset = state.ledger.reproject(&AssetId::new(asset_id))?;
    tracing::info!(asset_id = %asset.id, location = %asset.location, "location reprojected");
    Ok((StatusCode::OK, Json(AssetResponse::from(&asset))))
}

// =============================================================================
// MOVEMENT HANDLERS
// =============================================================================

/// List movements, optionally for one asset.
pub async fn list_movements_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<MovementListResponse> {
    let asset = query.asset_id.map(AssetId::new);
    let records = state
        .ledger
        .list_movements(asset.as_ref(), query.order.into())?;
    Ok((StatusCode::OK, Json(MovementListResponse::new(&records))))
}

/// Create a movement.
pub async fn create_movement_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateMovementRequest>,
) -> ApiResult<MovementResponse> {
    let record = state.ledger.create_movement(request.into_movement())?;
    tracing::info!(
        code = %record.code,
        asset_id = %record.asset_id,
        direction = %record.direction,
        "movement recorded"
    );
    Ok((StatusCode::CREATED, Json(MovementResponse::from(&record))))
}

/// Get one movement.
pub async fn get_movement_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<MovementResponse> {
    let record = state.ledger.movement(&MovementCode::new(code))?;
    Ok((StatusCode::OK, Json(MovementResponse::from(&record))))
}

/// Edit a movement.
pub async fn edit_movement_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<EditMovementRequest>,
) -> ApiResult<MovementResponse> {
    let record = state
        .ledger
        .edit_movement(&MovementCode::new(code), request.into_patch())?;
    tracing::info!(code = %record.code, asset_id = %record.asset_id, "movement edited");
    Ok((StatusCode::OK, Json(MovementResponse::from(&record))))
}

/// Delete the latest movement of an asset.
pub async fn delete_movement_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<MovementResponse> {
    let removed = state.ledger.delete_movement(&MovementCode::new(code))?;
    tracing::info!(code = %removed.code, asset_id = %removed.asset_id, "movement deleted");
    Ok((StatusCode::OK, Json(MovementResponse::from(&removed))))
}
