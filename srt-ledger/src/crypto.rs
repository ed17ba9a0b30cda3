//! Cryptographic helpers for the ledger
//!
//! This module provides:
//! - SHA-256 hashing for block contents
//! - Hex rendering of digests (the persisted hash format)
//! - Time-ordered entry identifiers

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of `data` as lowercase hex
pub fn hash_hex(data: &[u8]) -> String {
    hex::encode(hash_bytes(data))
}

/// Generate a new entry ID
///
/// UUIDv7 embeds timestamp for time-ordering while maintaining uniqueness
pub fn generate_entry_id() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}
