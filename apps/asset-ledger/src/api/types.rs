//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API and the
//! mapping from `LedgerError` to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use ledger_core::{
    Asset, AssetId, AssetRegistration, ChainViolation, Condition, CurrentLocation, Direction,
    ErrorKind, LedgerError, ListOrder, MovementPatch, MovementRecord, NewMovement, SiteId, UnitId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    pub assets: usize,
    pub movements: usize,
}

// =============================================================================
// ASSETS
// =============================================================================

/// Asset registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAssetRequest {
    pub asset_id: String,
    pub registered_on: NaiveDate,
    #[serde(default = "default_condition")]
    pub condition: Condition,
}

fn default_condition() -> Condition {
    Condition::Good
}

impl RegisterAssetRequest {
    #[must_use]
    pub fn into_registration(self) -> AssetRegistration {
        AssetRegistration {
            id: AssetId::new(self.asset_id),
            registered_on: self.registered_on,
            condition: self.condition,
        }
    }
}

/// An asset with its cached location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResponse {
    pub asset_id: String,
    pub registered_on: NaiveDate,
    pub condition: Condition,
    pub location: CurrentLocation,
}

impl From<&Asset> for AssetResponse {
    fn from(asset: &Asset) -> Self {
        Self {
            asset_id: asset.id.to_string(),
            registered_on: asset.registered_on,
            condition: asset.condition,
            location: CurrentLocation::from(&asset.location),
        }
    }
}

/// Location derived fresh from the movement chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationResponse {
    pub asset_id: String,
    #[serde(flatten)]
    pub location: CurrentLocation,
}

/// Result of an invariant audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResponse {
    pub asset_id: String,
    pub consistent: bool,
    pub violations: Vec<String>,
}

impl AuditResponse {
    #[must_use]
    pub fn new(asset_id: &AssetId, violations: &[ChainViolation]) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            consistent: violations.is_empty(),
            violations: violations.iter().map(ToString::to_string).collect(),
        }
    }
}

// =============================================================================
// MOVEMENTS
// =============================================================================

/// Movement creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMovementRequest {
    pub asset_id: String,
    pub direction: Direction,
    #[serde(default)]
    pub source_unit: Option<String>,
    #[serde(default)]
    pub target_unit: Option<String>,
    #[serde(default)]
    pub target_site: Option<String>,
    #[serde(default = "default_condition")]
    pub condition: Condition,
    #[serde(default)]
    pub business_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    pub processed_by: String,
}

impl CreateMovementRequest {
    #[must_use]
    pub fn into_movement(self) -> NewMovement {
        NewMovement {
            asset_id: AssetId::new(self.asset_id),
            direction: self.direction,
            source_unit: self.source_unit.map(UnitId::new),
            target_unit: self.target_unit.map(UnitId::new),
            target_site: self.target_site.map(SiteId::new),
            condition: self.condition,
            business_date: self.business_date,
            notes: self.notes,
            processed_by: self.processed_by,
        }
    }
}

/// Partial movement update. Omitted fields stay unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditMovementRequest {
    pub direction: Option<Direction>,
    pub source_unit: Option<String>,
    pub target_unit: Option<String>,
    pub target_site: Option<String>,
    pub condition: Option<Condition>,
    pub business_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub processed_by: Option<String>,
}

impl EditMovementRequest {
    #[must_use]
    pub fn into_patch(self) -> MovementPatch {
        MovementPatch {
            direction: self.direction,
            source_unit: self.source_unit.map(UnitId::new),
            target_unit: self.target_unit.map(UnitId::new),
            target_site: self.target_site.map(SiteId::new),
            condition: self.condition,
            business_date: self.business_date,
            notes: self.notes,
            processed_by: self.processed_by,
        }
    }
}

/// One movement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementResponse {
    pub code: String,
    pub asset_id: String,
    pub direction: Direction,
    pub source: CurrentLocation,
    pub target: CurrentLocation,
    pub condition: Condition,
    pub business_date: NaiveDate,
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub processed_by: String,
}

impl From<&MovementRecord> for MovementResponse {
    fn from(record: &MovementRecord) -> Self {
        Self {
            code: record.code.to_string(),
            asset_id: record.asset_id.to_string(),
            direction: record.direction,
            source: CurrentLocation::from(&record.source),
            target: CurrentLocation::from(&record.target),
            condition: record.condition,
            business_date: record.business_date,
            sequence: record.sequence.0,
            recorded_at: record.recorded_at,
            notes: record.notes.clone(),
            processed_by: record.processed_by.clone(),
        }
    }
}

/// List of movement records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementListResponse {
    pub count: usize,
    pub movements: Vec<MovementResponse>,
}

impl MovementListResponse {
    #[must_use]
    pub fn new(records: &[MovementRecord]) -> Self {
        Self {
            count: records.len(),
            movements: records.iter().map(MovementResponse::from).collect(),
        }
    }
}

/// Sort order accepted by list endpoints and commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OrderParam {
    Asc,
    #[default]
    Desc,
}

impl From<OrderParam> for ListOrder {
    fn from(order: OrderParam) -> Self {
        match order {
            OrderParam::Asc => ListOrder::Ascending,
            OrderParam::Desc => ListOrder::Descending,
        }
    }
}

/// Query string of `GET /movements`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub asset_id: Option<String>,
    #[serde(default)]
    pub order: OrderParam,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl From<&LedgerError> for ErrorResponse {
    fn from(err: &LedgerError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            context: error_context(err),
        }
    }
}

/// HTTP status for an error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::AssetExists | ErrorKind::NotLastRecord => StatusCode::CONFLICT,
        ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Serialization => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::DirectionViolation
        | ErrorKind::SourceMismatch
        | ErrorKind::FutureDate
        | ErrorKind::PredatesRegistration
        | ErrorKind::PrecedesPrevious
        | ErrorKind::FollowsNext
        | ErrorKind::TooOld
        | ErrorKind::NoOpMovement
        | ErrorKind::TargetConflict
        | ErrorKind::CascadeConflict => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Machine-readable details of an error.
fn error_context(err: &LedgerError) -> Map<String, Value> {
    let value = match err {
        LedgerError::DirectionViolation { direction, before } => json!({
            "direction": direction,
            "before": CurrentLocation::from(before),
        }),
        LedgerError::SourceMismatch { declared, expected } => json!({
            "declared": declared,
            "expected": expected,
        }),
        LedgerError::FutureDate { date, today } => json!({ "date": date, "today": today }),
        LedgerError::PredatesRegistration {
            date,
            registered_on,
        } => json!({ "date": date, "registered_on": registered_on }),
        LedgerError::PrecedesPrevious {
            date,
            previous,
            previous_date,
        } => json!({ "date": date, "previous": previous, "previous_date": previous_date }),
        LedgerError::FollowsNext {
            date,
            next,
            next_date,
        } => json!({ "date": date, "next": next, "next_date": next_date }),
        LedgerError::TooOld { date, earliest } => json!({ "date": date, "earliest": earliest }),
        LedgerError::NoOpMovement { location } => json!({
            "location": CurrentLocation::from(location),
        }),
        LedgerError::TargetConflict { next, location } => json!({
            "next": next,
            "location": CurrentLocation::from(location),
        }),
        LedgerError::CascadeConflict { next } => json!({ "next": next }),
        LedgerError::NotLastRecord { code, latest } => json!({ "code": code, "latest": latest }),
        LedgerError::AssetNotFound(id) | LedgerError::AssetExists(id) => {
            json!({ "asset_id": id })
        }
        LedgerError::MovementNotFound(code) => json!({ "code": code }),
        LedgerError::InvalidRequest(_)
        | LedgerError::StorageUnavailable(_)
        | LedgerError::Serialization(_) => json!({}),
    };

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// A `LedgerError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        if status.is_server_error() {
            tracing::error!(kind = %self.0.kind(), "{}", self.0);
        } else {
            tracing::warn!(kind = %self.0.kind(), "rejected: {}", self.0);
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{Location, MovementCode};

    #[test]
    fn validation_errors_are_unprocessable() {
        let err = LedgerError::CascadeConflict {
            next: MovementCode::new("MV-00000002"),
        };
        assert_eq!(status_for(err.kind()), StatusCode::UNPROCESSABLE_ENTITY);

        let body = ErrorResponse::from(&err);
        assert_eq!(body.kind, "CascadeConflict");
        assert_eq!(body.context.get("next"), Some(&json!("MV-00000002")));
    }

    #[test]
    fn lookup_and_conflict_statuses() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::NotLastRecord), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::AssetExists), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(ErrorKind::StorageUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn location_context_uses_public_shape() {
        let err = LedgerError::NoOpMovement {
            location: Location::site("UNIT-A", "ROOM-1"),
        };
        let body = ErrorResponse::from(&err);
        assert_eq!(
            body.context.get("location"),
            Some(&json!({ "location_class": "site", "unit": "UNIT-A", "site": "ROOM-1" }))
        );
    }

    #[test]
    fn edit_request_defaults_to_empty_patch() {
        let request: EditMovementRequest = serde_json::from_str("{}").expect("parse");
        assert_eq!(request.into_patch(), MovementPatch::default());
    }

    #[test]
    fn create_request_defaults_condition() {
        let request: CreateMovementRequest = serde_json::from_value(json!({
            "asset_id": "A-1",
            "direction": "warehouse_to_site",
            "target_unit": "UNIT-A",
            "target_site": "ROOM-1",
            "processed_by": "clerk"
        }))
        .expect("parse");
        let movement = request.into_movement();
        assert_eq!(movement.condition, Condition::Good);
        assert_eq!(movement.business_date, None);
    }
}
