//! Correctness: commit visibility, rollback invisibility, and count
//! conservation against the SQLite store adapter.
//!
//! The deterministic scenarios pin exact row counts; the mixed workload
//! checks the conservation invariant (`actual == committed_total`) without
//! caring which transactions happened to commit.

use txstress_harness::{InsertCountRange, WorkloadConfig, run_stress};
use txstress_store::{SqliteStore, Store};

fn sqlite_store(dir: &tempfile::TempDir) -> SqliteStore {
    SqliteStore::create(dir.path().join("stress.db")).expect("create store")
}

// ─── Scenario: everything rolls back ───────────────────────────────────

#[test]
fn rollback_only_run_leaves_the_store_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite_store(&dir);

    let config = WorkloadConfig {
        total_transactions: 10,
        concurrency: 1,
        rollback_probability: 1.0,
        ..WorkloadConfig::default()
    };

    let report = run_stress(&config, &store).expect("run");
    assert!(report.passed(), "{}", report.render_text());
    assert_eq!(report.aggregate.committed_total, 0);
    assert_eq!(report.verification.actual_rows, 0);
    assert!(report.aggregate.rolled_back_total > 0);
}

// ─── Scenario: everything commits, fixed batch size ────────────────────

#[test]
fn commit_only_run_with_fixed_batches_is_exact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite_store(&dir);

    let config = WorkloadConfig {
        total_transactions: 10,
        concurrency: 1,
        rollback_probability: 0.0,
        insert_count_range: InsertCountRange::fixed(5),
        ..WorkloadConfig::default()
    };

    let report = run_stress(&config, &store).expect("run");
    assert!(report.passed(), "{}", report.render_text());
    assert_eq!(report.aggregate.committed_total, 50);
    assert_eq!(report.verification.actual_rows, 50);
    assert_eq!(report.aggregate.rolled_back_total, 0);
}

// ─── Mixed workload: count conservation ────────────────────────────────

#[test]
fn mixed_concurrent_workload_conserves_counts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite_store(&dir);

    let config = WorkloadConfig {
        total_transactions: 120,
        concurrency: 6,
        rollback_probability: 0.4,
        ..WorkloadConfig::default()
    };

    let report = run_stress(&config, &store).expect("run");
    assert!(report.passed(), "{}", report.render_text());
    assert_eq!(report.aggregate.transactions_total, 120);
    assert_eq!(report.aggregate.failed_total, 0);
    assert_eq!(
        report.verification.actual_rows,
        report.aggregate.committed_total
    );

    // No duplicate retries configured and labels are unique, so any
    // duplicate group would be a store defect.
    assert!(
        report.verification.duplicate_groups.is_empty(),
        "unexpected duplicates: {:?}",
        report.verification.duplicate_groups
    );
}

// ─── Verification idempotence ──────────────────────────────────────────

#[test]
fn verifying_twice_against_an_unchanged_store_is_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite_store(&dir);

    let config = WorkloadConfig {
        total_transactions: 40,
        concurrency: 4,
        ..WorkloadConfig::default()
    };

    let pool = txstress_harness::WorkerPool::new(config).expect("pool");
    let run = pool.run(&store).expect("run");

    let mut reader = store.open_session().expect("reader");
    let first = txstress_harness::verify(&run.aggregate, &mut reader, run.elapsed).expect("verify");
    let second =
        txstress_harness::verify(&run.aggregate, &mut reader, run.elapsed).expect("verify again");
    assert_eq!(first, second);
    assert!(first.pass);
}

// ─── Replay determinism across stores ──────────────────────────────────

#[test]
fn identical_seeds_commit_identical_row_counts() {
    let config = WorkloadConfig {
        total_transactions: 60,
        ..WorkloadConfig::default()
    }
    .with_concurrency(3)
    .with_run_seed(0xD1CE);

    let totals: Vec<u64> = (0..2)
        .map(|_| {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = sqlite_store(&dir);
            let report = run_stress(&config, &store).expect("run");
            assert!(report.passed(), "{}", report.render_text());
            report.aggregate.committed_total
        })
        .collect();

    assert_eq!(totals[0], totals[1]);
}
