//! Error types for the ledger

use crate::types::{Address, Amount};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Stored hash or chain linkage does not match the recomputed value
    #[error("Integrity error at block {index}: {reason}")]
    Integrity {
        /// Index of the first offending block
        index: u64,
        /// What failed to verify
        reason: String,
    },

    /// Replaying a verified chain broke a ledger invariant
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Persisted state cannot be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Source balance is lower than the requested amount
    #[error("Insufficient funds in {address}: available {available}, required {required}")]
    InsufficientFunds {
        /// Debited address
        address: Address,
        /// Balance at the time of the request (base units)
        available: Amount,
        /// Requested amount (base units)
        required: Amount,
    },

    /// Non-positive, malformed or out-of-range amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Empty or reserved address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by the request itself rather than the ledger.
    ///
    /// Rejections leave the ledger untouched and are safe to report back to
    /// the caller verbatim.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InsufficientFunds { .. } | Error::InvalidAmount(_) | Error::InvalidAddress(_)
        )
    }

    pub(crate) fn integrity(index: u64, reason: impl Into<String>) -> Self {
        Error::Integrity {
            index,
            reason: reason.into(),
        }
    }
}
