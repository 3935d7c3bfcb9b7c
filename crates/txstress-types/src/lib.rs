//! Shared value types for the txstress workspace.
//!
//! The harness exercises a single logical table of [`Record`] rows. A record
//! carries one identity-bearing field (`label`) that the verifier groups on,
//! plus two auxiliary fields that exist only to make rows non-trivial.
//!
//! Also home to the deterministic seed-derivation helpers: every worker owns
//! a private RNG whose seed is derived from the run seed and worker index,
//! so runs replay exactly and no RNG state is ever shared across threads.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Domain tag mixed into worker seed derivation.
const SEED_DOMAIN: &[u8] = b"txstress_worker";

/// Domain tag mixed into profile seed derivation.
const PROFILE_SEED_DOMAIN: &[u8] = b"txstress_profile";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One synthetic row inserted by the harness.
///
/// Ownership passes to the store adapter on insert; the harness never
/// mutates a record after generating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identity-bearing field. Unique per generated row unless the workload
    /// runs in fixed-key mode, where every row in the run shares one label.
    pub label: String,
    /// Auxiliary flag, randomized per row.
    pub done: bool,
    /// Auxiliary creation timestamp, milliseconds since the Unix epoch.
    pub created_unix_ms: u64,
}

impl Record {
    /// Build a record with the creation timestamp taken from the wall clock.
    #[must_use]
    pub fn new(label: impl Into<String>, done: bool) -> Self {
        Self {
            label: label.into(),
            done,
            created_unix_ms: unix_now_ms(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (done: {})", self.label, self.done)
    }
}

/// Synthesize the identity label for one generated row.
///
/// Labels are unique across the run: worker index, cycle index, and item
/// index each contribute a component.
#[must_use]
pub fn row_label(worker_index: usize, cycle_index: u64, item_index: u32) -> String {
    format!("w{worker_index}_c{cycle_index}_i{item_index}")
}

/// Milliseconds since the Unix epoch.
///
/// Saturates to zero if the clock reads before the epoch.
#[must_use]
pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

/// Derive the private RNG seed for one worker.
///
/// xxh3 over a domain tag, the run seed, and the worker index. Distinct
/// workers get uncorrelated streams; the same run seed replays the same
/// streams.
#[must_use]
pub fn derive_worker_seed(run_seed: u64, worker_index: usize) -> u64 {
    let mut buf = Vec::with_capacity(SEED_DOMAIN.len() + 16);
    buf.extend_from_slice(SEED_DOMAIN);
    buf.extend_from_slice(&run_seed.to_le_bytes());
    buf.extend_from_slice(&(worker_index as u64).to_le_bytes());
    xxh3_64(&buf)
}

/// Derive the default run seed for a named workload profile.
///
/// Distinct profile names never share RNG streams by accident; the same
/// name always derives the same seed.
#[must_use]
pub fn derive_profile_seed(name: &str) -> u64 {
    let mut buf = Vec::with_capacity(PROFILE_SEED_DOMAIN.len() + name.len());
    buf.extend_from_slice(PROFILE_SEED_DOMAIN);
    buf.extend_from_slice(name.as_bytes());
    xxh3_64(&buf)
}
