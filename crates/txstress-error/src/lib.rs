//! Error taxonomy for the txstress harness.
//!
//! One enum covers both sides of the boundary: failures raised by a store
//! adapter while executing a workload, and failures of the harness plumbing
//! itself (configuration, report encoding). The distinction that matters at
//! runtime is [`StressError::is_contract_violation`]: store-operation
//! failures are folded into a `failed` transaction outcome by the runner,
//! while a contract violation means the harness itself mismanaged a
//! transaction handle and must abort the process.

use thiserror::Error;

/// Primary error type for harness and store-adapter operations.
#[derive(Error, Debug)]
pub enum StressError {
    // === Store adapter errors ===
    /// The session cannot be used at all (broken connection, unopenable
    /// database file). Fatal to the worker's current cycle only.
    #[error("store unavailable: {detail}")]
    StoreUnavailable { detail: String },

    /// An insert violated a table constraint.
    #[error("constraint violation: {detail}")]
    ConstraintViolation { detail: String },

    /// The store failed at the I/O layer (busy, locked, disk error).
    #[error("store I/O error: {detail}")]
    StoreIo { detail: String },

    /// A transaction handle was used outside its valid lifecycle:
    /// `begin` inside an open transaction, or `commit`/`rollback` with
    /// none open. Always a harness bug, never a store defect.
    #[error("invalid transaction state: {detail}")]
    InvalidTransactionState { detail: String },

    // === Harness plumbing errors ===
    /// Workload configuration failed validation.
    #[error("invalid workload configuration: {detail}")]
    InvalidConfig { detail: String },

    /// File I/O while writing reports or artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A report could not be encoded as JSON.
    #[error("report encoding failed: {0}")]
    ReportEncoding(#[from] serde_json::Error),
}

impl StressError {
    /// Shorthand constructor for [`StressError::StoreUnavailable`].
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            detail: detail.into(),
        }
    }

    /// Shorthand constructor for [`StressError::ConstraintViolation`].
    pub fn constraint(detail: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            detail: detail.into(),
        }
    }

    /// Shorthand constructor for [`StressError::StoreIo`].
    pub fn store_io(detail: impl Into<String>) -> Self {
        Self::StoreIo {
            detail: detail.into(),
        }
    }

    /// Shorthand constructor for [`StressError::InvalidTransactionState`].
    pub fn invalid_txn(detail: impl Into<String>) -> Self {
        Self::InvalidTransactionState {
            detail: detail.into(),
        }
    }

    /// Shorthand constructor for [`StressError::InvalidConfig`].
    pub fn config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detail: detail.into(),
        }
    }

    /// Whether this error is a harness contract violation.
    ///
    /// Contract violations propagate out of the worker pool as fatal;
    /// everything else is recorded in the run's failed-cycle count.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvalidTransactionState { .. })
    }

    /// Whether this error originated in a store adapter operation.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. }
                | Self::ConstraintViolation { .. }
                | Self::StoreIo { .. }
                | Self::InvalidTransactionState { .. }
        )
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, StressError>;
