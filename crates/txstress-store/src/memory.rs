//! In-memory reference store.
//!
//! A single shared row vector behind a `parking_lot` mutex. Each session
//! buffers its writes privately until commit, so a rolled-back transaction
//! never touches shared state and concurrent readers never observe a
//! partial batch: commit appends the whole pending buffer under one lock
//! acquisition.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use txstress_error::Result;
use txstress_types::Record;

use crate::{Store, StoreSession, require_closed, require_open};

/// Shared in-memory table.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<Record>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all committed rows, for test assertions.
    #[must_use]
    pub fn rows(&self) -> Vec<Record> {
        self.rows.lock().clone()
    }
}

impl Store for MemoryStore {
    type Session = MemorySession;

    fn open_session(&self) -> Result<Self::Session> {
        debug!(target: "txstress::store", adapter = "memory", "session opened");
        Ok(MemorySession {
            rows: Arc::clone(&self.rows),
            pending: Vec::new(),
            in_txn: false,
        })
    }
}

/// Session over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    rows: Arc<Mutex<Vec<Record>>>,
    pending: Vec<Record>,
    in_txn: bool,
}

impl StoreSession for MemorySession {
    fn begin(&mut self) -> Result<()> {
        require_closed(self.in_txn)?;
        self.in_txn = true;
        Ok(())
    }

    fn insert(&mut self, record: &Record) -> Result<()> {
        require_open("insert", self.in_txn)?;
        self.pending.push(record.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        require_open("commit", self.in_txn)?;
        self.rows.lock().append(&mut self.pending);
        self.in_txn = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        require_open("rollback", self.in_txn)?;
        self.pending.clear();
        self.in_txn = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_txn
    }

    fn count(&mut self) -> Result<u64> {
        Ok(self.rows.lock().len() as u64)
    }

    fn group_count(&mut self) -> Result<BTreeMap<String, u64>> {
        let rows = self.rows.lock();
        let mut groups = BTreeMap::new();
        for record in rows.iter() {
            *groups.entry(record.label.clone()).or_insert(0) += 1;
        }
        Ok(groups)
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        // A dropped session must not leak buffered writes.
        if self.in_txn {
            self.pending.clear();
        }
    }
}
