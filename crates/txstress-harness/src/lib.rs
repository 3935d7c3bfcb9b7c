//! Transactional stress-test workload engine and verifier.
//!
//! Drives a transactional store through randomized, concurrent workloads of
//! inserts that are either committed or rolled back, then verifies the
//! store's final observable state against the commit/rollback decisions
//! actually taken. The point is to expose atomicity, isolation, and
//! duplicate-write defects under load.
//!
//! # Architecture
//!
//! ```text
//!  run_stress(config, store)
//!    ├── WorkerPool::run
//!    │     └── per worker: generate → run_plan → AggregateState
//!    ├── join barrier
//!    ├── verify (fresh reader session)
//!    └── StressRunReport
//! ```
//!
//! The store is consumed through the narrow capability contract in
//! `txstress-store`; nothing in this crate knows which engine is behind a
//! session.

pub mod pool;
pub mod profiles;
pub mod report;
pub mod runner;
pub mod verify;
pub mod workload;

use txstress_error::Result;
use txstress_store::Store;

pub use pool::{AggregateSnapshot, AggregateState, PoolRun, StopFlag, WorkerPool};
pub use report::{REPORT_SCHEMA_V1, StressRunReport};
pub use runner::{TransactionOutcome, run_plan};
pub use verify::{DuplicateGroup, VerificationReport, verify};
pub use workload::{
    DEFAULT_RUN_SEED, InsertCountRange, OutcomeDirective, TransactionPlan, WorkloadConfig,
    generate,
};

/// Run the whole harness: workload, barrier, verification, report.
///
/// The verifier reads through a fresh session opened after every worker has
/// joined, so it never shares a session with a writer.
pub fn run_stress<S: Store>(config: &WorkloadConfig, store: &S) -> Result<StressRunReport> {
    let pool = WorkerPool::new(config.clone())?;
    let run = pool.run(store)?;

    let mut reader = store.open_session()?;
    let verification = verify(&run.aggregate, &mut reader, run.elapsed)?;

    Ok(StressRunReport::new(config.clone(), &run, verification))
}
