//! Cross-session concurrency probes.
//!
//! Fixed-key mode funnels every worker onto one identity label so a store
//! that applies a committed write more than once (or leaks a rolled-back
//! one) shows up as a count mismatch on that single label. Duplicate-retry
//! mode checks the opposite direction: deliberately injected duplicates
//! must reconcile exactly with the workload's own ledger.

use txstress_harness::{WorkloadConfig, profiles, run_stress};
use txstress_store::{MemoryStore, SqliteStore};

// ─── Fixed-key contention, no duplicate retries ────────────────────────

#[test]
fn fixed_key_contention_accounts_for_every_effective_write() {
    // Full-size probe against the in-memory store: 50 sessions racing on
    // one label.
    let store = MemoryStore::new();
    let config = profiles::profile_fixed_key_contention();

    let report = run_stress(&config, &store).expect("run");
    assert!(report.passed(), "{}", report.render_text());
    assert_eq!(report.aggregate.transactions_total, 2_000);
    assert_eq!(report.aggregate.failed_total, 0);

    // All committed rows legitimately share the key, so the single "dup"
    // group must tally to exactly the committed total: one extra effective
    // write would be a race defect.
    if report.aggregate.committed_total > 1 {
        let groups = &report.verification.duplicate_groups;
        assert_eq!(groups.len(), 1, "groups: {groups:?}");
        assert_eq!(groups[0].label, "dup");
        assert_eq!(groups[0].count, report.aggregate.committed_total);
    }
}

#[test]
fn fixed_key_contention_on_sqlite_matches_committed_total() {
    // Scaled-down fixed-key run against the real file-backed store.
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::create(dir.path().join("contention.db")).expect("create store");

    let config = WorkloadConfig {
        total_transactions: 200,
        concurrency: 8,
        rollback_probability: 0.3,
        fixed_key: Some("dup".to_owned()),
        ..WorkloadConfig::default()
    };

    let report = run_stress(&config, &store).expect("run");
    assert!(report.passed(), "{}", report.render_text());
    assert_eq!(report.aggregate.failed_total, 0, "{}", report.render_text());
    if report.aggregate.committed_total > 1 {
        assert_eq!(
            report.verification.duplicate_groups[0].count,
            report.aggregate.committed_total
        );
    }
}

// ─── Duplicate-retry reconciliation ────────────────────────────────────

#[test]
fn duplicate_retry_groups_reconcile_with_the_workload_ledger() {
    let store = MemoryStore::new();
    let config = profiles::profile_duplicate_retry();

    let report = run_stress(&config, &store).expect("run");
    assert!(report.passed(), "{}", report.render_text());
    assert!(
        report.aggregate.duplicate_total > 0,
        "p=0.25 over 400 txns should exercise the retry path"
    );

    // Labels are unique outside the retry path, so each committed
    // duplicate-retry plan contributes exactly one over-represented label.
    // The excess row count across all groups is therefore the ledger's
    // duplicate total.
    let excess: u64 = report
        .verification
        .duplicate_groups
        .iter()
        .map(|g| g.count - 1)
        .sum();
    assert_eq!(excess, report.aggregate.duplicate_total);
}

#[test]
fn no_duplicate_groups_when_the_retry_path_is_disabled() {
    let store = MemoryStore::new();
    let mut config = profiles::profile_duplicate_retry();
    config.duplicate_retry_probability = 0.0;

    let report = run_stress(&config, &store).expect("run");
    assert!(report.passed());
    assert_eq!(report.aggregate.duplicate_total, 0);
    assert!(
        report.verification.duplicate_groups.is_empty(),
        "duplicates without the retry path are a store defect: {:?}",
        report.verification.duplicate_groups
    );
}
