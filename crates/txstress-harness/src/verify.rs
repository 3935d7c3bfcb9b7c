//! Verification pass: expected state vs actual store state.
//!
//! Runs once, after the pool barrier, against a reader session that no
//! worker ever touched. The verdict is a row-count comparison; duplicate
//! groups are reported alongside as an observational diagnostic because
//! duplicates are *expected* when the duplicate-retry path was exercised
//! and a defect when it was not.
//!
//! Verification only reads, so running it twice against an unchanged store
//! yields an identical report (modulo the elapsed time handed in by the
//! caller).

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use txstress_error::Result;
use txstress_store::StoreSession;

use crate::pool::AggregateSnapshot;

/// One identity label observed on more than one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Identity label shared by the rows.
    pub label: String,
    /// Number of rows carrying it.
    pub count: u64,
}

/// Final comparison of expected against actual store state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Rows the aggregate says were committed.
    pub expected_rows: u64,
    /// Rows the store actually holds.
    pub actual_rows: u64,
    /// Identity labels with more than one row, sorted by label.
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Committed duplicate-retry rows according to the workload ledger;
    /// lets a reader reconcile `duplicate_groups` without re-running.
    pub duplicate_rows_expected: u64,
    /// Cycles that failed on store errors (distinct from rollbacks).
    pub failed_cycles: u64,
    /// Whether `actual_rows == expected_rows`.
    pub pass: bool,
    /// Wall-clock duration of the workload phase, milliseconds.
    pub elapsed_ms: u64,
}

impl VerificationReport {
    /// One-line verdict for triage.
    #[must_use]
    pub fn triage_line(&self) -> String {
        if self.pass {
            format!(
                "PASS: {} rows expected, {} found, {} duplicate group(s), {} failed cycle(s)",
                self.expected_rows,
                self.actual_rows,
                self.duplicate_groups.len(),
                self.failed_cycles,
            )
        } else {
            format!(
                "FAIL: expected {} rows, found {} (delta {:+}), {} duplicate group(s), {} failed cycle(s)",
                self.expected_rows,
                self.actual_rows,
                i128::from(self.actual_rows) - i128::from(self.expected_rows),
                self.duplicate_groups.len(),
                self.failed_cycles,
            )
        }
    }

    /// Multi-line diagnostic rendering.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Verification ===");
        let _ = writeln!(out, "Expected committed rows: {}", self.expected_rows);
        let _ = writeln!(out, "Actual rows in store:    {}", self.actual_rows);
        let _ = writeln!(out, "Failed cycles:           {}", self.failed_cycles);
        let _ = writeln!(out, "Elapsed:                 {}ms", self.elapsed_ms);
        if self.duplicate_groups.is_empty() {
            let _ = writeln!(out, "Duplicate groups:        none");
        } else {
            let _ = writeln!(
                out,
                "Duplicate groups ({} expected duplicate rows from retries):",
                self.duplicate_rows_expected
            );
            for group in &self.duplicate_groups {
                let _ = writeln!(out, "  {} x{}", group.label, group.count);
            }
        }
        let _ = writeln!(
            out,
            "Result: {}",
            if self.pass { "PASS" } else { "FAIL" }
        );
        out
    }
}

/// Compare the aggregate's expected totals against the store.
pub fn verify<S: StoreSession>(
    aggregate: &AggregateSnapshot,
    reader: &mut S,
    elapsed: Duration,
) -> Result<VerificationReport> {
    let actual_rows = reader.count()?;
    let duplicate_groups: Vec<DuplicateGroup> = reader
        .group_count()?
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(label, count)| DuplicateGroup { label, count })
        .collect();

    let expected_rows = aggregate.committed_total;
    let report = VerificationReport {
        expected_rows,
        actual_rows,
        duplicate_groups,
        duplicate_rows_expected: aggregate.duplicate_total,
        failed_cycles: aggregate.failed_total,
        pass: actual_rows == expected_rows,
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    };

    info!(
        target: "txstress::verify",
        expected = report.expected_rows,
        actual = report.actual_rows,
        duplicates = report.duplicate_groups.len(),
        pass = report.pass,
        "verification complete"
    );
    Ok(report)
}
