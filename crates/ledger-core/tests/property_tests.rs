//! # Property-Based Tests
//!
//! Random sequences of create, edit and delete against the in-memory
//! ledger. Whatever the outcome of each operation, the stored chain must
//! stay consistent and a rejected operation must leave no trace.

use chrono::{Days, NaiveDate};
use ledger_core::{
    AssetId, AssetRegistration, CascadeEngine, Condition, CurrentLocation, Direction, FixedClock,
    Ledger, LedgerError, ListOrder, MemoryLedger, MovementPatch, MovementRecord, NewMovement,
    SiteId, UnitId,
};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;

// =============================================================================
// OPERATIONS
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Create {
        direction: Direction,
        target: (u8, u8),
        offset: u64,
    },
    Edit {
        pick: Index,
        direction: Option<Direction>,
        target: Option<(u8, u8)>,
        offset: Option<u64>,
    },
    Delete {
        pick: Index,
    },
}

fn direction() -> impl Strategy<Value = Direction> {
    prop::sample::select(Direction::ALL.to_vec())
}

fn target() -> impl Strategy<Value = (u8, u8)> {
    (0u8..3, 0u8..2)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (direction(), target(), 0u64..90).prop_map(|(direction, target, offset)| {
            Op::Create { direction, target, offset }
        }),
        2 => (
            any::<Index>(),
            proptest::option::of(direction()),
            proptest::option::of(target()),
            proptest::option::of(0u64..90),
        )
            .prop_map(|(pick, direction, target, offset)| Op::Edit {
                pick,
                direction,
                target,
                offset,
            }),
        1 => any::<Index>().prop_map(|pick| Op::Delete { pick }),
    ]
}

fn registered_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
}

fn date(offset: u64) -> NaiveDate {
    registered_on()
        .checked_add_days(Days::new(offset))
        .expect("date in range")
}

fn asset_id() -> AssetId {
    AssetId::new("asset")
}

fn ledger() -> Ledger<MemoryLedger> {
    let ledger = Ledger::new(MemoryLedger::new()).with_clock(FixedClock::new(date(90)));
    ledger
        .register_asset(AssetRegistration {
            id: asset_id(),
            registered_on: registered_on(),
            condition: Condition::Good,
        })
        .expect("register");
    ledger
}

fn chain(ledger: &Ledger<MemoryLedger>) -> Vec<MovementRecord> {
    ledger
        .list_movements(Some(&asset_id()), ListOrder::Ascending)
        .expect("list")
}

fn apply(ledger: &Ledger<MemoryLedger>, op: &Op) -> Result<(), LedgerError> {
    let records = chain(ledger);
    match op {
        Op::Create {
            direction,
            target: (unit, site),
            offset,
        } => {
            let site_bound = !direction.arrives_warehouse();
            ledger.create_movement(NewMovement {
                asset_id: asset_id(),
                direction: *direction,
                source_unit: None,
                target_unit: site_bound.then(|| UnitId::new(format!("unit-{}", unit))),
                target_site: site_bound.then(|| SiteId::new(format!("site-{}", site))),
                condition: Condition::Good,
                business_date: Some(date(*offset)),
                notes: None,
                processed_by: "prop".into(),
            })?;
        }
        Op::Edit {
            pick,
            direction,
            target,
            offset,
        } => {
            if records.is_empty() {
                return Ok(());
            }
            let code = &records[pick.index(records.len())].code;
            ledger.edit_movement(
                code,
                MovementPatch {
                    direction: *direction,
                    target_unit: target.map(|(u, _)| UnitId::new(format!("unit-{}", u))),
                    target_site: target.map(|(_, s)| SiteId::new(format!("site-{}", s))),
                    business_date: offset.map(date),
                    ..MovementPatch::default()
                },
            )?;
        }
        Op::Delete { pick } => {
            if records.is_empty() {
                return Ok(());
            }
            ledger.delete_movement(&records[pick.index(records.len())].code)?;
        }
    }
    Ok(())
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every reachable chain satisfies every invariant.
    #[test]
    fn chain_stays_consistent(ops in vec(op(), 1..40)) {
        let ledger = ledger();

        for op in &ops {
            let _ = apply(&ledger, op);
            let violations = ledger.audit(&asset_id()).expect("audit");
            prop_assert!(violations.is_empty(), "{:?} after {:?}", violations, op);
        }
    }

    /// A rejected operation writes nothing.
    #[test]
    fn rejected_operations_leave_no_trace(ops in vec(op(), 1..40)) {
        let ledger = ledger();

        for op in &ops {
            let before = chain(&ledger);
            let cached = ledger.asset(&asset_id()).expect("asset");
            if apply(&ledger, op).is_err() {
                prop_assert_eq!(chain(&ledger), before);
                prop_assert_eq!(ledger.asset(&asset_id()).expect("asset"), cached);
            }
        }
    }

    /// The cached location always equals a fresh resolution of the chain.
    #[test]
    fn cache_matches_resolution(ops in vec(op(), 1..40)) {
        let ledger = ledger();

        for op in &ops {
            let _ = apply(&ledger, op);
            let asset = ledger.asset(&asset_id()).expect("asset");
            let resolved = ledger.resolve_current_location(&asset_id()).expect("resolve");
            prop_assert_eq!(CurrentLocation::from(&asset.location), resolved);
        }
    }

    /// Re-running the cascade over a stored chain never produces a write.
    #[test]
    fn cascade_is_idempotent_on_stored_chains(ops in vec(op(), 1..40)) {
        let ledger = ledger();
        for op in &ops {
            let _ = apply(&ledger, op);
        }

        let records = chain(&ledger);
        for pair in records.windows(2) {
            prop_assert_eq!(CascadeEngine::cascade(&pair[0], Some(&pair[1])), Ok(None));
        }
    }

    /// Business dates never decrease along the sequence order.
    #[test]
    fn business_dates_are_monotonic(ops in vec(op(), 1..40)) {
        let ledger = ledger();
        for op in &ops {
            let _ = apply(&ledger, op);
        }

        let records = chain(&ledger);
        for pair in records.windows(2) {
            prop_assert!(pair[0].sequence < pair[1].sequence);
            prop_assert!(pair[0].business_date <= pair[1].business_date);
        }
    }

    /// The same operations produce the same ledger.
    #[test]
    fn replay_is_deterministic(ops in vec(op(), 1..30)) {
        let first = ledger();
        let second = ledger();

        for op in &ops {
            let a = apply(&first, op);
            let b = apply(&second, op);
            prop_assert_eq!(a, b);
        }

        prop_assert_eq!(chain(&first), chain(&second));
    }
}
