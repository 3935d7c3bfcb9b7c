//! Store adapter boundary for the txstress harness.
//!
//! The harness core never talks to a concrete database; it consumes the
//! narrow capability contract defined here. Two traits make up the
//! boundary:
//!
//! - [`Store`] — a factory handing out independent sessions against one
//!   logical store. Sessions opened from the same store must support true
//!   concurrent use.
//! - [`StoreSession`] — one exclusively-owned channel for issuing
//!   transactions. A session is serial: the owner must complete each call
//!   before issuing the next, and the harness gives each worker its own
//!   session for the worker's entire lifetime.
//!
//! Transaction lifecycle is an explicit state machine. `begin` while a
//! transaction is open, or `commit`/`rollback` while none is, fail with
//! [`StressError::InvalidTransactionState`] — that is a harness bug, not a
//! store defect, and callers treat it as fatal.
//!
//! Session teardown is `Drop`; adapters roll back any transaction still
//! open when a session is dropped so a panicking worker cannot leak an
//! open write lock.

use std::collections::BTreeMap;

use txstress_error::{Result, StressError};
use txstress_types::Record;

pub mod fault;
pub mod memory;
pub mod sqlite;

pub use fault::{FaultKind, FaultPlan, FaultSession, FaultStore};
pub use memory::{MemorySession, MemoryStore};
pub use sqlite::{SqliteSession, SqliteStore};

/// Factory for independent store sessions.
pub trait Store: Sync {
    /// Session type produced by this store.
    type Session: StoreSession + Send;

    /// Open a fresh session.
    ///
    /// Fails with [`StressError::StoreUnavailable`] when the underlying
    /// store cannot be reached.
    fn open_session(&self) -> Result<Self::Session>;
}

/// One exclusively-owned channel for transactions against the store.
pub trait StoreSession {
    /// Open a transaction scope on this session.
    fn begin(&mut self) -> Result<()>;

    /// Insert one record inside the open transaction.
    fn insert(&mut self, record: &Record) -> Result<()>;

    /// Insert a batch of records inside the open transaction.
    fn insert_many(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.insert(record)?;
        }
        Ok(())
    }

    /// Commit the open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Whether a transaction is currently open on this session.
    fn in_transaction(&self) -> bool;

    /// Total rows visible to this session.
    fn count(&mut self) -> Result<u64>;

    /// Rows visible to this session, grouped by identity label.
    fn group_count(&mut self) -> Result<BTreeMap<String, u64>>;
}

/// Guard helper shared by adapters: error for an operation that requires an
/// open transaction.
pub(crate) fn require_open(op: &str, in_txn: bool) -> Result<()> {
    if in_txn {
        Ok(())
    } else {
        Err(StressError::invalid_txn(format!(
            "{op} called with no open transaction"
        )))
    }
}

/// Guard helper shared by adapters: error for `begin` on a session that
/// already holds an open transaction.
pub(crate) fn require_closed(in_txn: bool) -> Result<()> {
    if in_txn {
        Err(StressError::invalid_txn(
            "begin called while a transaction is already open",
        ))
    } else {
        Ok(())
    }
}
