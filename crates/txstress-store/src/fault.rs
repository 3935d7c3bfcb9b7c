//! Fault-injecting session wrapper.
//!
//! Wraps any [`StoreSession`] and fails scripted operations so the harness's
//! own rollback-on-error path can be exercised without a misbehaving store.
//! Injected failures are reported with real taxonomy errors
//! ([`crate::StoreSession::insert`] failing with a constraint violation or
//! I/O error), never with panics, because that is what a production store
//! would do.

use std::collections::BTreeMap;

use txstress_error::{Result, StressError};
use txstress_types::Record;

use crate::{Store, StoreSession};

/// Which taxonomy error an injected fault reports as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// `ConstraintViolation`, as if a unique index rejected the row.
    Constraint,
    /// `StoreIo`, as if the disk or lock layer failed.
    Io,
}

impl FaultKind {
    fn to_error(self, op: &str) -> StressError {
        match self {
            Self::Constraint => StressError::constraint(format!("injected fault during {op}")),
            Self::Io => StressError::store_io(format!("injected fault during {op}")),
        }
    }
}

/// Script describing which operations fail.
#[derive(Debug, Clone, Copy)]
pub struct FaultPlan {
    /// Fail the insert with this zero-based index within each transaction.
    pub fail_insert_at: Option<u32>,
    /// Fail every commit attempt.
    pub fail_commit: bool,
    /// Error the injected faults report as.
    pub kind: FaultKind,
}

impl FaultPlan {
    /// Plan that fails the `index`-th insert of every transaction.
    #[must_use]
    pub fn failing_insert(index: u32, kind: FaultKind) -> Self {
        Self {
            fail_insert_at: Some(index),
            fail_commit: false,
            kind,
        }
    }

    /// Plan that fails every commit.
    #[must_use]
    pub fn failing_commit(kind: FaultKind) -> Self {
        Self {
            fail_insert_at: None,
            fail_commit: true,
            kind,
        }
    }
}

/// Store wrapper whose sessions all follow one [`FaultPlan`].
#[derive(Debug, Clone)]
pub struct FaultStore<S> {
    inner: S,
    plan: FaultPlan,
}

impl<S: Store> FaultStore<S> {
    /// Wrap `inner` so every opened session injects `plan`.
    pub fn new(inner: S, plan: FaultPlan) -> Self {
        Self { inner, plan }
    }
}

impl<S: Store> Store for FaultStore<S> {
    type Session = FaultSession<S::Session>;

    fn open_session(&self) -> Result<Self::Session> {
        Ok(FaultSession {
            inner: self.inner.open_session()?,
            plan: self.plan,
            inserts_seen: 0,
        })
    }
}

/// Session wrapper applying a [`FaultPlan`] to one inner session.
#[derive(Debug)]
pub struct FaultSession<S> {
    inner: S,
    plan: FaultPlan,
    inserts_seen: u32,
}

impl<S: StoreSession> FaultSession<S> {
    /// Wrap a single session directly (unit-test convenience).
    pub fn new(inner: S, plan: FaultPlan) -> Self {
        Self {
            inner,
            plan,
            inserts_seen: 0,
        }
    }
}

impl<S: StoreSession> StoreSession for FaultSession<S> {
    fn begin(&mut self) -> Result<()> {
        self.inserts_seen = 0;
        self.inner.begin()
    }

    fn insert(&mut self, record: &Record) -> Result<()> {
        let index = self.inserts_seen;
        self.inserts_seen += 1;
        if self.plan.fail_insert_at == Some(index) {
            return Err(self.plan.kind.to_error("insert"));
        }
        self.inner.insert(record)
    }

    fn commit(&mut self) -> Result<()> {
        if self.plan.fail_commit {
            // The inner transaction stays open; the caller is expected to
            // roll back, exactly as with a real failed COMMIT.
            return Err(self.plan.kind.to_error("commit"));
        }
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.inner.rollback()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn count(&mut self) -> Result<u64> {
        self.inner.count()
    }

    fn group_count(&mut self) -> Result<BTreeMap<String, u64>> {
        self.inner.group_count()
    }
}
