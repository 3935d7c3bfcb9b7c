//! Transaction runner: executes one plan against one session.
//!
//! The runner owns the transaction scope. [`TxnScope`] is an RAII guard
//! over the session's open transaction: consuming it with `commit` or
//! `rollback` resolves the scope, and dropping it unresolved rolls back,
//! so no exit path can leave a transaction open past the call boundary.
//!
//! Store failures never escape [`run_plan`]; they are folded into a
//! `failed` [`TransactionOutcome`] after the open transaction is aborted.
//! The one exception is [`StressError::InvalidTransactionState`], which
//! means the harness itself broke the handle lifecycle and must surface as
//! a fatal error.

use serde::{Deserialize, Serialize};
use tracing::warn;
use txstress_error::{Result, StressError};
use txstress_store::StoreSession;
use txstress_types::Record;

use crate::workload::{OutcomeDirective, TransactionPlan};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Realized result of executing one plan. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    /// Rows durably committed by this transaction, duplicate batch
    /// included. Zero when the plan rolled back or failed.
    pub committed_inserts: u64,
    /// Rows inserted and then rolled back by the plan's own directive.
    /// Zero for committed and failed transactions.
    pub rolled_back_inserts: u64,
    /// Committed rows that came from the duplicate-retry batch.
    pub duplicate_inserts: u64,
    /// Whether the cycle failed on a store error.
    pub failed: bool,
    /// Store error detail for failed cycles.
    pub error_detail: Option<String>,
}

impl TransactionOutcome {
    /// Outcome of a committed plan.
    #[must_use]
    pub fn committed(total_inserts: u64, duplicate_inserts: u64) -> Self {
        Self {
            committed_inserts: total_inserts,
            rolled_back_inserts: 0,
            duplicate_inserts,
            failed: false,
            error_detail: None,
        }
    }

    /// Outcome of a deliberately rolled-back plan.
    #[must_use]
    pub fn rolled_back(inserts: u64) -> Self {
        Self {
            committed_inserts: 0,
            rolled_back_inserts: inserts,
            duplicate_inserts: 0,
            failed: false,
            error_detail: None,
        }
    }

    /// Outcome of a cycle that failed on a store error.
    #[must_use]
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            committed_inserts: 0,
            rolled_back_inserts: 0,
            duplicate_inserts: 0,
            failed: true,
            error_detail: Some(detail.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction scope guard
// ---------------------------------------------------------------------------

/// Scoped transaction over a borrowed session.
///
/// Resolving the scope (`commit`/`rollback`) consumes it; an unresolved
/// scope rolls back on drop.
struct TxnScope<'s, S: StoreSession> {
    session: &'s mut S,
    open: bool,
}

impl<'s, S: StoreSession> TxnScope<'s, S> {
    fn begin(session: &'s mut S) -> Result<Self> {
        session.begin()?;
        Ok(Self {
            session,
            open: true,
        })
    }

    fn insert_many(&mut self, records: &[Record]) -> Result<()> {
        self.session.insert_many(records)
    }

    fn commit(mut self) -> Result<()> {
        self.open = false;
        self.session.commit()
    }

    fn rollback(mut self) -> Result<()> {
        self.open = false;
        self.session.rollback()
    }
}

impl<S: StoreSession> Drop for TxnScope<'_, S> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.session.rollback();
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Execute one plan on one session.
///
/// Returns `Err` only for harness contract violations
/// ([`StressError::InvalidTransactionState`]); every store failure becomes
/// a `failed` outcome with the transaction rolled back first.
pub fn run_plan<S: StoreSession>(
    plan: &TransactionPlan,
    session: &mut S,
) -> Result<TransactionOutcome> {
    match execute(plan, session) {
        Ok(outcome) => Ok(outcome),
        Err(err) if err.is_contract_violation() => Err(err),
        Err(err) => {
            abort_open_txn(session)?;
            Ok(TransactionOutcome::failed(err.to_string()))
        }
    }
}

fn execute<S: StoreSession>(
    plan: &TransactionPlan,
    session: &mut S,
) -> Result<TransactionOutcome> {
    let mut scope = TxnScope::begin(session)?;
    scope.insert_many(&plan.records)?;

    let mut duplicate_inserts = 0u64;
    if let Some(batch) = &plan.duplicate_batch {
        scope.insert_many(batch)?;
        duplicate_inserts = batch.len() as u64;
    }

    let inserted = plan.records.len() as u64 + duplicate_inserts;
    match plan.directive {
        OutcomeDirective::Commit => {
            scope.commit()?;
            Ok(TransactionOutcome::committed(inserted, duplicate_inserts))
        }
        OutcomeDirective::Rollback => {
            scope.rollback()?;
            Ok(TransactionOutcome::rolled_back(inserted))
        }
    }
}

/// Roll back whatever transaction the failed cycle left open.
///
/// A rollback that itself fails on a store error is logged and swallowed;
/// the cycle is already recorded as failed and the session's `Drop` is the
/// backstop. A contract violation still propagates.
fn abort_open_txn<S: StoreSession>(session: &mut S) -> Result<()> {
    if !session.in_transaction() {
        return Ok(());
    }
    match session.rollback() {
        Ok(()) => Ok(()),
        Err(err) if err.is_contract_violation() => Err(err),
        Err(err) => {
            warn!(target: "txstress::runner", error = %err, "rollback after failed cycle also failed");
            Ok(())
        }
    }
}
