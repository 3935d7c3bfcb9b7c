//! Terminal run artifact: configuration echo, aggregate totals, and the
//! verification verdict in one serializable report.

use serde::{Deserialize, Serialize};
use txstress_error::Result;

use crate::pool::{AggregateSnapshot, PoolRun};
use crate::verify::VerificationReport;
use crate::workload::WorkloadConfig;

/// JSON schema tag for `report.json` consumers.
pub const REPORT_SCHEMA_V1: &str = "txstress.report.v1";

/// Full report for one stress run. Created once; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressRunReport {
    /// Schema tag, always [`REPORT_SCHEMA_V1`].
    pub schema_version: String,
    /// The configuration that drove the run.
    pub config: WorkloadConfig,
    /// Aggregate totals at the pool barrier.
    pub aggregate: AggregateSnapshot,
    /// Expected-vs-actual comparison.
    pub verification: VerificationReport,
    /// Workload wall-clock time, milliseconds.
    pub wall_time_ms: u64,
    /// Executed transactions per second over the workload phase.
    pub transactions_per_sec: f64,
    /// Whether the run was cut short by a stop request.
    pub stopped_early: bool,
}

impl StressRunReport {
    /// Assemble the report from the pool result and verification verdict.
    #[must_use]
    pub fn new(config: WorkloadConfig, run: &PoolRun, verification: VerificationReport) -> Self {
        let wall_time_ms = u64::try_from(run.elapsed.as_millis()).unwrap_or(u64::MAX);
        let secs = run.elapsed.as_secs_f64();
        let transactions_per_sec = if secs > 0.0 {
            run.aggregate.transactions_total as f64 / secs
        } else {
            0.0
        };
        Self {
            schema_version: REPORT_SCHEMA_V1.to_owned(),
            config,
            aggregate: run.aggregate,
            verification,
            wall_time_ms,
            transactions_per_sec,
            stopped_early: run.stopped_early,
        }
    }

    /// Whether the store state matched expectations.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verification.pass
    }

    /// One-line summary for triage.
    #[must_use]
    pub fn triage_line(&self) -> String {
        format!(
            "{} | {} txns ({} committed rows, {} rolled back, {} failed) in {}ms",
            if self.passed() { "PASS" } else { "FAIL" },
            self.aggregate.transactions_total,
            self.aggregate.committed_total,
            self.aggregate.rolled_back_total,
            self.aggregate.failed_total,
            self.wall_time_ms,
        )
    }

    /// Full textual rendering for the console.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Transaction Stress Run ===\n");
        out.push_str(&format!(
            "Transactions: {} across {} worker(s), inserts per txn {}, rollback p={}, duplicate-retry p={}\n",
            self.config.total_transactions,
            self.config.concurrency,
            self.config.insert_count_range,
            self.config.rollback_probability,
            self.config.duplicate_retry_probability,
        ));
        if let Some(key) = &self.config.fixed_key {
            out.push_str(&format!("Fixed-key mode: every row labelled {key:?}\n"));
        }
        out.push_str(&format!("Seed: {:#018x}\n", self.config.run_seed));
        if self.stopped_early {
            out.push_str("Run stopped early by request.\n");
        }
        out.push_str(&format!(
            "Throughput: {:.1} txn/s\n\n",
            self.transactions_per_sec
        ));
        out.push_str(&self.verification.render());
        out
    }

    /// Encode as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
