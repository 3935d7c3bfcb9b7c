//! Workload configuration and plan generation.
//!
//! A [`WorkloadConfig`] describes *what* a run should do; [`generate`]
//! turns one (worker, cycle) coordinate into a [`TransactionPlan`] using a
//! caller-owned random source. Generation is pure modulo that RNG: the same
//! config, coordinate, and RNG state always yield the same plan, which is
//! what makes runs replayable from a single seed.
//!
//! Draw order within one plan is part of the replay contract: batch size,
//! then per-record flags, then the rollback decision, then the
//! duplicate-retry decision.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use txstress_error::{Result, StressError};
use txstress_types::{Record, row_label};

/// Run seed used when the caller does not supply one.
pub const DEFAULT_RUN_SEED: u64 = 0x5EED_0001;

// ---------------------------------------------------------------------------
// Insert count range
// ---------------------------------------------------------------------------

/// Inclusive bounds on the primary insert batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertCountRange {
    /// Smallest batch size (inclusive, >= 1).
    pub min: u32,
    /// Largest batch size (inclusive).
    pub max: u32,
}

impl InsertCountRange {
    /// Range spanning `min..=max`.
    #[must_use]
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Degenerate range: every batch has exactly `size` rows.
    #[must_use]
    pub fn fixed(size: u32) -> Self {
        Self {
            min: size,
            max: size,
        }
    }

    fn sample(&self, rng: &mut impl Rng) -> u32 {
        rng.gen_range(self.min..=self.max)
    }
}

impl fmt::Display for InsertCountRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..={}", self.min, self.max)
        }
    }
}

// ---------------------------------------------------------------------------
// Workload configuration
// ---------------------------------------------------------------------------

/// Immutable description of one stress run.
///
/// Built once at harness start and validated before use; nothing mutates it
/// afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Total transactions across all workers (>= 1).
    pub total_transactions: u64,
    /// Number of concurrent workers (>= 1). The remainder of
    /// `total_transactions / concurrency` goes to the first workers.
    pub concurrency: u16,
    /// Bounds on the primary insert batch per transaction.
    pub insert_count_range: InsertCountRange,
    /// Probability that a plan resolves to `Rollback` (0.0..=1.0).
    pub rollback_probability: f64,
    /// Probability that a plan carries a duplicate-retry batch (0.0..=1.0).
    pub duplicate_retry_probability: f64,
    /// Rows in the duplicate-retry batch when one is attached (>= 1).
    pub duplicate_batch_size: u32,
    /// When set, every record in the run shares this identity label. This
    /// is the mode that turns the harness into a cross-session race probe.
    pub fixed_key: Option<String>,
    /// Root seed for per-worker RNG derivation.
    pub run_seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            total_transactions: 100,
            concurrency: 4,
            insert_count_range: InsertCountRange::new(1, 9),
            rollback_probability: 0.5,
            duplicate_retry_probability: 0.0,
            duplicate_batch_size: 1,
            fixed_key: None,
            run_seed: DEFAULT_RUN_SEED,
        }
    }
}

impl WorkloadConfig {
    /// Check every field against its documented bounds.
    pub fn validate(&self) -> Result<()> {
        if self.total_transactions == 0 {
            return Err(StressError::config("total_transactions must be >= 1"));
        }
        if self.concurrency == 0 {
            return Err(StressError::config("concurrency must be >= 1"));
        }
        if self.insert_count_range.min == 0 {
            return Err(StressError::config("insert_count_range.min must be >= 1"));
        }
        if self.insert_count_range.min > self.insert_count_range.max {
            return Err(StressError::config(format!(
                "insert_count_range is inverted: {}",
                self.insert_count_range
            )));
        }
        if !(0.0..=1.0).contains(&self.rollback_probability) {
            return Err(StressError::config(format!(
                "rollback_probability {} outside 0.0..=1.0",
                self.rollback_probability
            )));
        }
        if !(0.0..=1.0).contains(&self.duplicate_retry_probability) {
            return Err(StressError::config(format!(
                "duplicate_retry_probability {} outside 0.0..=1.0",
                self.duplicate_retry_probability
            )));
        }
        if self.duplicate_batch_size == 0 {
            return Err(StressError::config("duplicate_batch_size must be >= 1"));
        }
        if let Some(key) = &self.fixed_key {
            if key.is_empty() {
                return Err(StressError::config("fixed_key must not be empty"));
            }
        }
        Ok(())
    }

    /// Cycles assigned to `worker_index`: the base share plus one extra for
    /// the first `total % concurrency` workers.
    #[must_use]
    pub fn cycles_for_worker(&self, worker_index: usize) -> u64 {
        let workers = u64::from(self.concurrency);
        let base = self.total_transactions / workers;
        let remainder = self.total_transactions % workers;
        base + u64::from((worker_index as u64) < remainder)
    }

    /// Override the run seed.
    #[must_use]
    pub fn with_run_seed(mut self, run_seed: u64) -> Self {
        self.run_seed = run_seed;
        self
    }

    /// Override the worker count.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: u16) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Force every generated record onto one identity label.
    #[must_use]
    pub fn with_fixed_key(mut self, key: impl Into<String>) -> Self {
        self.fixed_key = Some(key.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Transaction plan
// ---------------------------------------------------------------------------

/// Commit-or-rollback decision resolved at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeDirective {
    /// Commit the transaction after all inserts.
    Commit,
    /// Roll the transaction back after all inserts.
    Rollback,
}

impl fmt::Display for OutcomeDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Rollback => write!(f, "rollback"),
        }
    }
}

/// One generated unit of transactional work, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPlan {
    /// Primary insert batch, in insertion order.
    pub records: Vec<Record>,
    /// Resolved outcome decision.
    pub directive: OutcomeDirective,
    /// Optional second batch simulating an erroneous client-side retry of
    /// an already-applied write, executed inside the same transaction.
    /// Rows share the identity label of the first primary record.
    pub duplicate_batch: Option<Vec<Record>>,
}

impl TransactionPlan {
    /// Rows the plan will insert in total (primary plus duplicate batch).
    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.records.len() as u64 + self.duplicate_batch.as_ref().map_or(0, |b| b.len() as u64)
    }
}

/// Generate the plan for one (worker, cycle) coordinate.
///
/// The config must have passed [`WorkloadConfig::validate`]; probabilities
/// outside 0.0..=1.0 would panic in the RNG draw.
pub fn generate(
    config: &WorkloadConfig,
    worker_index: usize,
    cycle_index: u64,
    rng: &mut impl Rng,
) -> TransactionPlan {
    let batch_size = config.insert_count_range.sample(rng);

    let mut records = Vec::with_capacity(batch_size as usize);
    for item_index in 0..batch_size {
        let label = config.fixed_key.clone().unwrap_or_else(|| {
            row_label(worker_index, cycle_index, item_index)
        });
        records.push(Record::new(label, rng.gen_bool(0.5)));
    }

    let directive = if rng.gen_bool(config.rollback_probability) {
        OutcomeDirective::Rollback
    } else {
        OutcomeDirective::Commit
    };

    let duplicate_batch = if config.duplicate_retry_probability > 0.0
        && rng.gen_bool(config.duplicate_retry_probability)
    {
        let retry_label = records[0].label.clone();
        let batch = (0..config.duplicate_batch_size)
            .map(|_| Record::new(retry_label.clone(), rng.gen_bool(0.5)))
            .collect();
        Some(batch)
    } else {
        None
    };

    TransactionPlan {
        records,
        directive,
        duplicate_batch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    #[test]
    fn default_config_is_valid() {
        WorkloadConfig::default().validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_fields() {
        let mut config = WorkloadConfig::default();
        config.total_transactions = 0;
        assert!(config.validate().is_err());

        let mut config = WorkloadConfig::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = WorkloadConfig::default();
        config.insert_count_range = InsertCountRange::new(5, 2);
        assert!(config.validate().is_err());

        let mut config = WorkloadConfig::default();
        config.rollback_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = WorkloadConfig::default();
        config.duplicate_batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = WorkloadConfig::default();
        config.fixed_key = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn remainder_cycles_go_to_first_workers() {
        let config = WorkloadConfig {
            total_transactions: 10,
            concurrency: 3,
            ..WorkloadConfig::default()
        };
        assert_eq!(config.cycles_for_worker(0), 4);
        assert_eq!(config.cycles_for_worker(1), 3);
        assert_eq!(config.cycles_for_worker(2), 3);

        let total: u64 = (0..3).map(|w| config.cycles_for_worker(w)).sum();
        assert_eq!(total, config.total_transactions);
    }

    #[test]
    fn generation_is_deterministic_for_a_seed() {
        let config = WorkloadConfig::default();
        let a = generate(&config, 2, 7, &mut rng(99));
        let b = generate(&config, 2, 7, &mut rng(99));
        // Timestamps differ between calls; compare the replayable parts.
        assert_eq!(a.directive, b.directive);
        assert_eq!(a.records.len(), b.records.len());
        for (ra, rb) in a.records.iter().zip(&b.records) {
            assert_eq!(ra.label, rb.label);
            assert_eq!(ra.done, rb.done);
        }
    }

    #[test]
    fn rollback_probability_extremes_resolve_exactly() {
        let mut config = WorkloadConfig::default();
        config.rollback_probability = 1.0;
        for cycle in 0..50 {
            let plan = generate(&config, 0, cycle, &mut rng(cycle));
            assert_eq!(plan.directive, OutcomeDirective::Rollback);
        }

        config.rollback_probability = 0.0;
        for cycle in 0..50 {
            let plan = generate(&config, 0, cycle, &mut rng(cycle));
            assert_eq!(plan.directive, OutcomeDirective::Commit);
        }
    }

    #[test]
    fn fixed_key_overrides_every_label() {
        let config = WorkloadConfig::default().with_fixed_key("dup");
        let plan = generate(&config, 3, 11, &mut rng(5));
        assert!(plan.records.iter().all(|r| r.label == "dup"));
    }

    #[test]
    fn duplicate_batch_reuses_first_primary_label() {
        let mut config = WorkloadConfig::default();
        config.duplicate_retry_probability = 1.0;
        config.duplicate_batch_size = 3;

        let plan = generate(&config, 0, 0, &mut rng(17));
        let batch = plan.duplicate_batch.as_ref().expect("duplicate batch must be attached");
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|r| r.label == plan.records[0].label));
        assert_eq!(plan.total_rows(), plan.records.len() as u64 + 3);
    }

    #[test]
    fn zero_duplicate_probability_never_attaches_a_batch() {
        let config = WorkloadConfig::default();
        for cycle in 0..100 {
            let plan = generate(&config, 0, cycle, &mut rng(cycle));
            assert!(plan.duplicate_batch.is_none());
        }
    }

    proptest! {
        #[test]
        fn batch_size_stays_in_range(seed in any::<u64>(), min in 1u32..8, spread in 0u32..8) {
            let config = WorkloadConfig {
                insert_count_range: InsertCountRange::new(min, min + spread),
                ..WorkloadConfig::default()
            };
            let plan = generate(&config, 0, 0, &mut rng(seed));
            let n = plan.records.len() as u32;
            prop_assert!(n >= min && n <= min + spread);
        }

        #[test]
        fn labels_are_unique_without_fixed_key(seed in any::<u64>(), worker in 0usize..8, cycle in 0u64..64) {
            let plan = generate(&WorkloadConfig::default(), worker, cycle, &mut rng(seed));
            let mut labels: Vec<_> = plan.records.iter().map(|r| r.label.clone()).collect();
            labels.sort();
            labels.dedup();
            prop_assert_eq!(labels.len(), plan.records.len());
        }
    }
}
