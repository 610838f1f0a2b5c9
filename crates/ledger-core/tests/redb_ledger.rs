//! # Persistent Ledger Tests
//!
//! The `Ledger` facade over the redb backend: durability across reopen,
//! sequence continuity, and agreement with the in-memory backend.

use chrono::NaiveDate;
use ledger_core::{
    AssetId, AssetRegistration, Condition, Direction, FixedClock, Ledger, LedgerStore, ListOrder,
    Location, MemoryLedger, MovementPatch, NewMovement, SiteId, StorageBackend, UnitId,
};
use std::path::Path;
use tempfile::tempdir;

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).expect("valid date")
}

fn open(path: &Path) -> Ledger<StorageBackend> {
    Ledger::new(StorageBackend::open_redb(path).expect("open redb"))
        .with_clock(FixedClock::new(day(6, 30)))
}

fn registration(id: &str) -> AssetRegistration {
    AssetRegistration {
        id: AssetId::new(id),
        registered_on: day(1, 1),
        condition: Condition::Good,
    }
}

fn request(asset: &str, direction: Direction, target: Option<(&str, &str)>, d: u32) -> NewMovement {
    NewMovement {
        asset_id: AssetId::new(asset),
        direction,
        source_unit: None,
        target_unit: target.map(|(u, _)| UnitId::new(u)),
        target_site: target.map(|(_, s)| SiteId::new(s)),
        condition: Condition::LightlyDamaged,
        business_date: Some(day(3, d)),
        notes: Some("handover".into()),
        processed_by: "clerk".into(),
    }
}

/// Run the same mutations against any backend.
fn populate<S: LedgerStore>(ledger: &Ledger<S>) {
    ledger.register_asset(registration("PROJ-1")).expect("register");
    ledger.register_asset(registration("PROJ-2")).expect("register");

    let r1 = ledger
        .create_movement(request("PROJ-1", Direction::WarehouseToSite, Some(("A", "1")), 1))
        .expect("r1");
    ledger
        .create_movement(request("PROJ-2", Direction::WarehouseToSite, Some(("B", "1")), 2))
        .expect("other asset");
    ledger
        .create_movement(request("PROJ-1", Direction::SiteToSite, Some(("B", "2")), 3))
        .expect("r2");
    ledger
        .edit_movement(
            &r1.code,
            MovementPatch {
                target_unit: Some(UnitId::new("C")),
                ..MovementPatch::default()
            },
        )
        .expect("cascade edit");
}

#[test]
fn chain_survives_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("ledger.redb");

    let before = {
        let ledger = open(&path);
        populate(&ledger);
        ledger
            .list_movements(None, ListOrder::Ascending)
            .expect("list")
    };

    let ledger = open(&path);
    let after = ledger
        .list_movements(None, ListOrder::Ascending)
        .expect("list");

    assert_eq!(before, after);
    assert_eq!(
        ledger.asset(&AssetId::new("PROJ-1")).expect("asset").location,
        Location::site("B", "2")
    );
    assert!(ledger.audit(&AssetId::new("PROJ-1")).expect("audit").is_empty());

    let r2 = &after[2];
    assert_eq!(r2.source, Location::site("C", "1"));
}

#[test]
fn sequence_continues_after_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("ledger.redb");

    let last = {
        let ledger = open(&path);
        populate(&ledger);
        let latest = ledger
            .list_movements(Some(&AssetId::new("PROJ-1")), ListOrder::Descending)
            .expect("list")
            .remove(0);
        ledger.delete_movement(&latest.code).expect("delete");
        latest
    };

    let ledger = open(&path);
    let next = ledger
        .create_movement(request("PROJ-1", Direction::SiteToWarehouse, None, 4))
        .expect("create");

    assert!(next.sequence > last.sequence);
    assert_ne!(next.code, last.code);
}

#[test]
fn backends_agree() {
    let dir = tempdir().expect("tempdir");
    let persistent = open(&dir.path().join("ledger.redb"));
    let volatile = Ledger::new(MemoryLedger::new()).with_clock(FixedClock::new(day(6, 30)));

    populate(&persistent);
    populate(&volatile);

    assert_eq!(
        persistent.list_movements(None, ListOrder::Descending).expect("list"),
        volatile.list_movements(None, ListOrder::Descending).expect("list")
    );
    for id in ["PROJ-1", "PROJ-2"] {
        let id = AssetId::new(id);
        assert_eq!(
            persistent.asset(&id).expect("asset"),
            volatile.asset(&id).expect("asset")
        );
    }
    assert_eq!(
        persistent.stats().expect("stats"),
        volatile.stats().expect("stats")
    );
}

#[test]
fn registered_asset_survives_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("ledger.redb");

    {
        let ledger = open(&path);
        ledger.register_asset(registration("PROJ-9")).expect("register");
    }

    let ledger = open(&path);
    let asset = ledger.asset(&AssetId::new("PROJ-9")).expect("asset");
    assert_eq!(asset.location, Location::Warehouse);
    assert_eq!(asset.registered_on, day(1, 1));
    assert!(
        ledger
            .register_asset(registration("PROJ-9"))
            .is_err()
    );
}
