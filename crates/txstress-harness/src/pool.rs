//! Worker pool: concurrent execution of independent transaction sessions.
//!
//! ```text
//!  WorkerPool::run(store)
//!    ├── spawn `concurrency` scoped threads
//!    │     └── worker: own session + own RNG
//!    │           loop cycles: generate → run_plan → AggregateState::record
//!    ├── join barrier (the only cross-worker synchronization)
//!    └── PoolRun { aggregate snapshot, elapsed, stopped_early }
//! ```
//!
//! The shared [`AggregateState`] is the single cross-worker resource and is
//! updated with atomic increments. Sessions, RNGs, and generated plans are
//! exclusively owned by one worker for their whole lifetime. A runner
//! failure is recorded and the worker moves on to its next cycle; only a
//! harness contract violation aborts the run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use txstress_error::{Result, StressError};
use txstress_store::Store;
use txstress_types::derive_worker_seed;

use crate::runner::{TransactionOutcome, run_plan};
use crate::workload::{WorkloadConfig, generate};

// ---------------------------------------------------------------------------
// Aggregate state
// ---------------------------------------------------------------------------

/// Process-wide expected-outcome accumulator.
///
/// Written by every worker through atomic increments; read once, after the
/// join barrier, as an [`AggregateSnapshot`].
#[derive(Debug, Default)]
pub struct AggregateState {
    committed: AtomicU64,
    rolled_back: AtomicU64,
    failed: AtomicU64,
    duplicates: AtomicU64,
    transactions: AtomicU64,
}

impl AggregateState {
    /// Fold one transaction outcome into the totals.
    pub fn record(&self, outcome: &TransactionOutcome) {
        self.transactions.fetch_add(1, Ordering::Relaxed);
        if outcome.failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.committed
            .fetch_add(outcome.committed_inserts, Ordering::Relaxed);
        self.rolled_back
            .fetch_add(outcome.rolled_back_inserts, Ordering::Relaxed);
        self.duplicates
            .fetch_add(outcome.duplicate_inserts, Ordering::Relaxed);
    }

    /// Read the totals. Only meaningful after all writers have joined.
    #[must_use]
    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            committed_total: self.committed.load(Ordering::Relaxed),
            rolled_back_total: self.rolled_back.load(Ordering::Relaxed),
            failed_total: self.failed.load(Ordering::Relaxed),
            duplicate_total: self.duplicates.load(Ordering::Relaxed),
            transactions_total: self.transactions.load(Ordering::Relaxed),
        }
    }
}

/// Immutable copy of the aggregate totals taken after the pool barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    /// Rows expected to be durably visible in the store.
    pub committed_total: u64,
    /// Rows inserted and rolled back by plan directive.
    pub rolled_back_total: u64,
    /// Cycles that failed on a store error.
    pub failed_total: u64,
    /// Committed rows that came from duplicate-retry batches.
    pub duplicate_total: u64,
    /// Transaction cycles actually executed.
    pub transactions_total: u64,
}

// ---------------------------------------------------------------------------
// Stop flag
// ---------------------------------------------------------------------------

/// Cooperative cancellation handle.
///
/// Workers poll it between cycles; an in-flight transaction always runs to
/// its commit/rollback decision, so stopping never abandons an open
/// transaction.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Fresh, unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask all workers to stop before their next cycle.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Worker pool
// ---------------------------------------------------------------------------

/// Result of one pool run.
#[derive(Debug, Clone)]
pub struct PoolRun {
    /// Final aggregate totals.
    pub aggregate: AggregateSnapshot,
    /// Wall-clock time from first spawn to last join.
    pub elapsed: Duration,
    /// Whether the run was cut short by the stop flag.
    pub stopped_early: bool,
}

/// Fixed-size pool of independently scheduled workers.
pub struct WorkerPool {
    config: WorkloadConfig,
    stop: StopFlag,
}

impl WorkerPool {
    /// Build a pool for a validated configuration.
    pub fn new(config: WorkloadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stop: StopFlag::new(),
        })
    }

    /// Handle for requesting early stop from another thread.
    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Run the configured workload to completion (or early stop) and
    /// return the aggregate totals.
    ///
    /// Blocks until every worker has joined. Worker cycle failures are
    /// folded into `failed_total`; `Err` is reserved for harness contract
    /// violations.
    pub fn run<S: Store>(&self, store: &S) -> Result<PoolRun> {
        let aggregate = AggregateState::default();
        let workers = usize::from(self.config.concurrency);
        let started = Instant::now();

        info!(
            target: "txstress::pool",
            transactions = self.config.total_transactions,
            concurrency = workers,
            seed = self.config.run_seed,
            "starting workload"
        );

        let mut contract_violation: Option<StressError> = None;
        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for worker_index in 0..workers {
                let aggregate = &aggregate;
                let config = &self.config;
                let stop = self.stop.clone();
                handles.push(scope.spawn(move || {
                    worker_loop(config, store, worker_index, aggregate, &stop)
                }));
            }

            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        if contract_violation.is_none() {
                            contract_violation = Some(err);
                        }
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        });

        if let Some(err) = contract_violation {
            return Err(err);
        }

        let elapsed = started.elapsed();
        let snapshot = aggregate.snapshot();
        info!(
            target: "txstress::pool",
            transactions = snapshot.transactions_total,
            committed = snapshot.committed_total,
            rolled_back = snapshot.rolled_back_total,
            failed = snapshot.failed_total,
            elapsed_ms = elapsed.as_millis() as u64,
            "workload complete"
        );

        Ok(PoolRun {
            aggregate: snapshot,
            elapsed,
            stopped_early: self.stop.is_stopped(),
        })
    }
}

/// One worker: private session, private RNG, serial cycles.
fn worker_loop<S: Store>(
    config: &WorkloadConfig,
    store: &S,
    worker_index: usize,
    aggregate: &AggregateState,
    stop: &StopFlag,
) -> Result<()> {
    let cycles = config.cycles_for_worker(worker_index);

    let mut session = match store.open_session() {
        Ok(session) => session,
        Err(err) => {
            // No session, no cycles: every assigned cycle is a failure.
            warn!(
                target: "txstress::pool",
                worker = worker_index,
                error = %err,
                "session open failed; recording all cycles as failed"
            );
            for _ in 0..cycles {
                aggregate.record(&TransactionOutcome::failed(err.to_string()));
            }
            return Ok(());
        }
    };

    let mut rng = SmallRng::seed_from_u64(derive_worker_seed(config.run_seed, worker_index));

    for cycle_index in 0..cycles {
        if stop.is_stopped() {
            debug!(
                target: "txstress::pool",
                worker = worker_index,
                completed = cycle_index,
                assigned = cycles,
                "stop requested; worker exiting early"
            );
            break;
        }

        let plan = generate(config, worker_index, cycle_index, &mut rng);
        let outcome = run_plan(&plan, &mut session)?;
        if outcome.failed {
            warn!(
                target: "txstress::pool",
                worker = worker_index,
                cycle = cycle_index,
                detail = outcome.error_detail.as_deref().unwrap_or("unknown"),
                "cycle failed"
            );
        }
        aggregate.record(&outcome);
    }

    Ok(())
}
