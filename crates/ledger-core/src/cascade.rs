//! # Cascade Engine
//!
//! Keeps the chain continuous when a record's position changes.
//!
//! When an edit changes a record's direction or target, the record that
//! immediately follows it by `Sequence` must start where the edited record
//! now ends. The successor's source is rewritten and its direction is
//! re-derived from the new source and its own, unchanged, target.
//!
//! Propagation is single-hop. The successor's target never changes, so
//! every record after it still starts where its predecessor ends.
//!
//! The engine is a pure function over records. Persisting its output is the
//! caller's job, in the same transaction as the edit itself.

use crate::direction::DirectionRules;
use crate::resolver::LocationResolver;
use crate::{LedgerError, MovementRecord};

/// Single-hop successor rewriting.
pub struct CascadeEngine;

impl CascadeEngine {
    /// Compute the successor rewrite implied by `updated`.
    ///
    /// Returns `Ok(None)` when there is no successor or when the successor
    /// already agrees with `updated` (no write needed).
    ///
    /// # Errors
    ///
    /// `CascadeConflict` when the successor would have to travel from the
    /// warehouse to the warehouse.
    pub fn cascade(
        updated: &MovementRecord,
        successor: Option<&MovementRecord>,
    ) -> Result<Option<MovementRecord>, LedgerError> {
        let Some(next) = successor else {
            return Ok(None);
        };

        let new_source = LocationResolver::project(Some(updated));
        let direction = DirectionRules::derive(&new_source, &next.target).ok_or_else(|| {
            LedgerError::CascadeConflict {
                next: next.code.clone(),
            }
        })?;

        if next.source == new_source && next.direction == direction {
            return Ok(None);
        }

        let mut rewritten = next.clone();
        rewritten.source = new_source;
        rewritten.direction = direction;
        Ok(Some(rewritten))
    }
}
