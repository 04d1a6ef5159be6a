//! Snapshot persistence across a simulated restart.

use pillar_core::clock::ManualClock;
use pillar_core::error::SnapshotError;
use pillar_engine::{Ledger, LedgerSnapshot};
use pillar_tests::helpers::*;

fn busy_harness() -> Harness {
    let mut h = Harness::without_fees();
    h.deposit(&addr(1), tokens(550_000), None).unwrap();
    h.deposit(&addr(2), tokens(600_000), Some(addr(1))).unwrap();
    h.deposit(&addr(3), tokens(20), Some(addr(2))).unwrap();
    h.ledger.set_whitelist(&admin(), &addr(9), 7, true).unwrap();
    h.advance_rounds(3);
    h
}

#[test]
fn restored_ledger_continues_identically() {
    let mut original = busy_harness();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pillar.snap");
    original.ledger.snapshot().save(&path).unwrap();

    let snapshot = LedgerSnapshot::load(&path).unwrap();
    let clock = ManualClock::new(original.ledger.now());
    let mut restored = Ledger::restore(snapshot, original.transfer.clone(), clock.clone()).unwrap();

    original.advance_rounds(2);
    clock.advance(2 * ROUND);
    for who in [addr(1), addr(2), addr(3), addr(9)] {
        assert_eq!(
            restored.accumulated_rewards(&who).unwrap(),
            original.ledger.accumulated_rewards(&who).unwrap()
        );
    }

    let a = original.ledger.claim(&addr(2)).unwrap();
    let b = restored.claim(&addr(2)).unwrap();
    assert_eq!(a, b);
    assert_eq!(restored.total_deposit(), original.ledger.total_deposit());
    assert_eq!(restored.state().accounts().count(), 4);
}

#[test]
fn snapshot_preserves_active_session() {
    let mut h = busy_harness();
    let criteria = [pillar_core::rates::PoolCriteria::in_tokens(275_000, 560_000, 1)];
    h.ledger.set_pool_criteria(&admin(), &[0], &criteria, 1).unwrap();

    let bytes = h.ledger.snapshot().encode().unwrap();
    let mut restored =
        Ledger::restore(LedgerSnapshot::decode(&bytes).unwrap(), h.transfer.clone(), h.clock.clone()).unwrap();
    assert!(restored.is_criteria_update_active());
    assert_eq!(restored.session().cursor, 1);

    let progress = restored.set_pool_criteria(&admin(), &[], &[], 10).unwrap();
    assert!(progress.completed);
    assert_eq!(restored.pool(0).unwrap().criteria, Some(criteria[0]));
}

#[test]
fn truncated_file_is_rejected() {
    let h = busy_harness();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pillar.snap");
    let bytes = h.ledger.snapshot().encode().unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(LedgerSnapshot::load(&path), Err(SnapshotError::Decode(_))));
}

#[test]
fn raw_bincode_matches_snapshot_encoding() {
    let h = busy_harness();
    let snapshot = h.ledger.snapshot();
    let raw = bincode::encode_to_vec(&snapshot, bincode::config::standard()).unwrap();
    assert_eq!(raw, snapshot.encode().unwrap());
}
