//! # Mutation Engine
//!
//! Plans create, edit and delete operations against an `AssetChain` snapshot.
//!
//! Planning is pure: every check runs before anything is written, and the
//! output is a `LedgerBatch` the store applies in one transaction. A plan
//! that fails leaves no trace.
//!
//! Check order for a create or an edit:
//! 1. Direction rules against the derived-before location
//! 2. Timeline (create: always; edit: only when the date is patched)
//! 3. No-op conflict (target equals derived-before)
//! 4. Cascade onto the successor
//! 5. Successor-target conflict

use crate::cascade::CascadeEngine;
use crate::chain::AssetChain;
use crate::conflict::ConflictChecker;
use crate::direction::DirectionRules;
use crate::primitives::{MAX_ACTOR_LENGTH, MAX_IDENTIFIER_LENGTH, MAX_NOTES_LENGTH};
use crate::storage::LedgerBatch;
use crate::timeline::{LedgerPolicy, TimelineValidator};
use crate::{
    Direction, LedgerError, Location, MovementCode, MovementDraft, MovementPatch, MovementRecord,
    NewMovement, SiteId, UnitId,
};
use chrono::{DateTime, NaiveDate, Utc};

/// Calendar context a plan is computed under.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
    pub policy: LedgerPolicy,
}

/// Output of `plan_edit`: the rewritten record and, if the chain needs
/// it, the rewritten successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    pub record: MovementRecord,
    pub successor: Option<MovementRecord>,
}

impl EditPlan {
    /// Number of records this plan rewrites.
    #[must_use]
    pub fn writes(&self) -> usize {
        1 + usize::from(self.successor.is_some())
    }

    #[must_use]
    pub fn into_batch(self) -> LedgerBatch {
        let mut batch = LedgerBatch::new(self.record.asset_id.clone());
        batch.replace.push(self.record);
        batch.replace.extend(self.successor);
        batch
    }
}

/// The MutationEngine plans every ledger mutation.
pub struct MutationEngine;

impl MutationEngine {
    /// Plan a `CreateMovement`. The new record is appended after the
    /// chain's latest record.
    pub fn plan_create(
        chain: &AssetChain,
        request: &NewMovement,
        ctx: &PlanContext,
    ) -> Result<MovementDraft, LedgerError> {
        validate_actor(&request.processed_by)?;
        validate_notes(request.notes.as_deref())?;

        let before = chain.current_location();
        DirectionRules::admit(&before, request.direction, request.source_unit.as_ref())?;

        let target = requested_target(
            request.direction,
            request.target_unit.as_ref(),
            request.target_site.as_ref(),
        )?;

        let business_date = request.business_date.unwrap_or(ctx.today);
        TimelineValidator::new(ctx.today, chain.asset().registered_on, &ctx.policy).check(
            business_date,
            chain.latest(),
            None,
        )?;

        ConflictChecker::no_op(&before, &target)?;

        Ok(MovementDraft {
            asset_id: chain.asset().id.clone(),
            direction: request.direction,
            source: before,
            target,
            condition: request.condition,
            business_date,
            recorded_at: ctx.now,
            notes: request.notes.clone(),
            processed_by: request.processed_by.clone(),
        })
    }

    /// Plan an `EditMovement` of the record identified by `code`.
    pub fn plan_edit(
        chain: &AssetChain,
        code: &MovementCode,
        patch: &MovementPatch,
        ctx: &PlanContext,
    ) -> Result<EditPlan, LedgerError> {
        let index = chain
            .position(code)
            .ok_or_else(|| LedgerError::MovementNotFound(code.clone()))?;
        let current = chain
            .get(index)
            .ok_or_else(|| LedgerError::MovementNotFound(code.clone()))?;
        let previous = chain.predecessor(index);
        let next = chain.successor(index);
        let before = chain.location_before(index);

        if let Some(actor) = patch.processed_by.as_deref() {
            validate_actor(actor)?;
        }
        validate_notes(patch.notes.as_deref())?;

        let direction = patch.direction.unwrap_or(current.direction);
        DirectionRules::admit(&before, direction, patch.source_unit.as_ref())?;

        let target = edited_target(current, direction, patch)?;

        if let Some(date) = patch.business_date {
            TimelineValidator::new(ctx.today, chain.asset().registered_on, &ctx.policy)
                .check(date, previous, next)?;
        }

        ConflictChecker::no_op(&before, &target)?;

        let mut record = current.clone();
        record.direction = direction;
        record.source = before;
        record.target = target;
        if let Some(condition) = patch.condition {
            record.condition = condition;
        }
        if let Some(date) = patch.business_date {
            record.business_date = date;
        }
        if let Some(notes) = &patch.notes {
            record.notes = Some(notes.clone());
        }
        if let Some(actor) = &patch.processed_by {
            record.processed_by = actor.clone();
        }

        let moved = patch.touches_position()
            && (record.direction != current.direction || record.target != current.target);
        let successor = if moved {
            CascadeEngine::cascade(&record, next)?
        } else {
            None
        };

        ConflictChecker::successor(&record.target, next)?;

        Ok(EditPlan { record, successor })
    }

    /// Plan a `DeleteMovement`. Only the sequence-latest record may go.
    pub fn plan_delete(
        chain: &AssetChain,
        code: &MovementCode,
    ) -> Result<MovementRecord, LedgerError> {
        let index = chain
            .position(code)
            .ok_or_else(|| LedgerError::MovementNotFound(code.clone()))?;

        match (chain.get(index), chain.latest()) {
            (Some(record), Some(latest)) if latest.code == record.code => Ok(record.clone()),
            (_, Some(latest)) => Err(LedgerError::NotLastRecord {
                code: code.clone(),
                latest: latest.code.clone(),
            }),
            _ => Err(LedgerError::MovementNotFound(code.clone())),
        }
    }
}

// =============================================================================
// REQUEST VALIDATION
// =============================================================================

/// Reject empty or oversized identifiers.
pub fn validate_identifier(label: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidRequest(format!("{} must not be empty", label)));
    }
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(LedgerError::InvalidRequest(format!(
            "{} length {} exceeds maximum {} bytes",
            label,
            value.len(),
            MAX_IDENTIFIER_LENGTH
        )));
    }
    Ok(())
}

fn validate_actor(actor: &str) -> Result<(), LedgerError> {
    if actor.trim().is_empty() {
        return Err(LedgerError::InvalidRequest(
            "processed_by must not be empty".to_string(),
        ));
    }
    if actor.len() > MAX_ACTOR_LENGTH {
        return Err(LedgerError::InvalidRequest(format!(
            "processed_by length {} exceeds maximum {} bytes",
            actor.len(),
            MAX_ACTOR_LENGTH
        )));
    }
    Ok(())
}

fn validate_notes(notes: Option<&str>) -> Result<(), LedgerError> {
    match notes {
        Some(n) if n.len() > MAX_NOTES_LENGTH => Err(LedgerError::InvalidRequest(format!(
            "notes length {} exceeds maximum {} bytes",
            n.len(),
            MAX_NOTES_LENGTH
        ))),
        _ => Ok(()),
    }
}

/// Target of a new movement from its direction and the requested unit/site.
fn requested_target(
    direction: Direction,
    unit: Option<&UnitId>,
    site: Option<&SiteId>,
) -> Result<Location, LedgerError> {
    if direction.arrives_warehouse() {
        if unit.is_some() || site.is_some() {
            return Err(LedgerError::InvalidRequest(
                "a return to the warehouse takes no target unit or site".to_string(),
            ));
        }
        return Ok(Location::Warehouse);
    }

    match (unit, site) {
        (Some(unit), Some(site)) => {
            validate_identifier("target_unit", unit.as_str())?;
            validate_identifier("target_site", site.as_str())?;
            Ok(Location::Site {
                unit: unit.clone(),
                site: site.clone(),
            })
        }
        _ => Err(LedgerError::InvalidRequest(format!(
            "{} needs both a target unit and a target site",
            direction
        ))),
    }
}

/// Target of an edited movement. Missing halves come from the existing site target.
fn edited_target(
    current: &MovementRecord,
    direction: Direction,
    patch: &MovementPatch,
) -> Result<Location, LedgerError> {
    if direction.arrives_warehouse() {
        return requested_target(direction, patch.target_unit.as_ref(), patch.target_site.as_ref());
    }

    let unit = patch.target_unit.as_ref().or_else(|| current.target.unit());
    let site = patch.target_site.as_ref().or_else(|| current.target.site_id());
    requested_target(direction, unit, site)
}

// =============================================================================
// TESTS
// =============================================================================
