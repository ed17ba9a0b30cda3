//! SRT Ledger
//!
//! Append-only token ledger with SHA-256 hash-chained blocks.
//!
//! # Architecture
//!
//! - **Event Sourcing**: Balances are derived by replaying immutable entries
//! - **Hash Chain**: Each block commits to its predecessor's hash
//! - **Single Writer**: One actor task serializes every mutation
//! - **Write-Through**: A block counts only once the ledger file is replaced
//!
//! # Invariants
//!
//! - No address balance is ever negative
//! - Σ balances == genesis supply + Σ deposits
//! - Deterministic replay: same chain → same balances
//! - Append-only: blocks are never modified or deleted

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod amount;
pub mod block;
pub mod canonical;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod projector;
pub mod storage;
pub mod types;

// Re-exports
pub use block::{verify_chain, Block};
pub use config::{Config, LoadPolicy};
pub use engine::{AuditReport, LedgerEngine};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use projector::{project, Balances};
pub use storage::{JsonFileStore, LedgerStore, MemoryStore};
pub use types::{Address, Amount, Entry, EntryId, EntryKind, MINT_SENTINEL};
