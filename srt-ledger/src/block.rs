//! Hash-linked blocks
//!
//! A block's hash covers exactly `(index, previous_hash, entries)`. The block
//! timestamp is deliberately outside the hash domain: two blocks that differ
//! only in timestamp hash identically, and changing that would invalidate
//! every chain already on disk.

use crate::canonical::CanonicalEncoder;
use crate::crypto::hash_hex;
use crate::types::{Entry, EntryKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// `previous_hash` of block 0
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Immutable batch of entries linked to its predecessor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Sequence number, 0 for genesis
    pub index: u64,

    /// Creation time (milliseconds since Unix epoch), not hashed
    pub timestamp: i64,

    /// Hash of the previous block
    pub previous_hash: String,

    /// Hex SHA-256 over the canonical encoding of index, previous hash and entries
    pub hash: String,

    /// Entries in application order
    pub entries: Vec<Entry>,
}

impl Block {
    /// Create a block and compute its hash
    pub fn create(index: u64, previous_hash: impl Into<String>, entries: Vec<Entry>, timestamp: i64) -> Self {
        let mut block = Self {
            index,
            timestamp,
            previous_hash: previous_hash.into(),
            hash: String::new(),
            entries,
        };
        block.hash = block.compute_hash();
        block
    }

    /// Create the genesis block holding a single GENESIS entry
    pub fn genesis(entry: Entry, timestamp: i64) -> Self {
        Self::create(0, GENESIS_PREVIOUS_HASH, vec![entry], timestamp)
    }

    /// Recompute the hash from `(index, previous_hash, entries)`
    pub fn compute_hash(&self) -> String {
        let mut enc = CanonicalEncoder::new();
        enc.write_u64(self.index);
        enc.write_string(&self.previous_hash);
        enc.write_entries(&self.entries);
        hash_hex(&enc.finalize())
    }

    /// Check the stored hash against the recomputed one
    pub fn verify_hash(&self) -> Result<()> {
        let computed = self.compute_hash();
        if computed != self.hash {
            return Err(Error::integrity(
                self.index,
                format!("stored hash {} does not match computed {}", self.hash, computed),
            ));
        }
        Ok(())
    }

    /// Timestamp of the last entry, or the block timestamp when empty
    pub fn last_timestamp(&self) -> i64 {
        self.entries.last().map(|e| e.timestamp).unwrap_or(self.timestamp)
    }
}

/// Verify hashes, index sequence and linkage of a whole chain.
///
/// Returns the first violation found, scanning from block 0.
pub fn verify_chain(chain: &[Block]) -> Result<()> {
    for (position, block) in chain.iter().enumerate() {
        let expected_index = position as u64;
        if block.index != expected_index {
            return Err(Error::integrity(
                expected_index,
                format!("index {} out of sequence", block.index),
            ));
        }

        block.verify_hash()?;

        if block.entries.is_empty() {
            return Err(Error::integrity(block.index, "block has no entries"));
        }

        match position {
            0 => {
                if block.previous_hash != GENESIS_PREVIOUS_HASH {
                    return Err(Error::integrity(0, "genesis block must link to \"0\""));
                }
                let is_genesis = block.entries.len() == 1
                    && block.entries[0].kind == EntryKind::Genesis
                    && block.entries[0].is_mint();
                if !is_genesis {
                    return Err(Error::integrity(0, "block 0 must hold exactly one GENESIS mint"));
                }
            }
            _ => {
                let previous = &chain[position - 1];
                if block.previous_hash != previous.hash {
                    return Err(Error::integrity(
                        block.index,
                        format!(
                            "previous hash {} does not match block {} hash {}",
                            block.previous_hash, previous.index, previous.hash
                        ),
                    ));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    fn genesis() -> Block {
        let entry = Entry::new(
            EntryKind::Genesis,
            Address::mint(),
            Address::new("SRT-BANK-RESERVE"),
            500,
            1_000,
        );
        Block::genesis(entry, 1_000)
    }

    fn deposit_after(prev: &Block, amount: u128) -> Block {
        let entry = Entry::new(
            EntryKind::Deposit,
            Address::mint(),
            Address::new("SRT-AAAA1111"),
            amount,
            2_000,
        );
        Block::create(prev.index + 1, prev.hash.clone(), vec![entry], 2_000)
    }

    #[test]
    fn test_hash_is_reproducible() {
        let block = genesis();
        assert_eq!(block.hash, block.compute_hash());
        assert_eq!(block.hash.len(), 64);
        block.verify_hash().unwrap();
    }

    #[test]
    fn test_timestamp_not_hashed() {
        let block = genesis();
        let mut later = block.clone();
        later.timestamp += 60_000;
        assert_eq!(later.compute_hash(), block.hash);
        later.verify_hash().unwrap();
    }

    #[test]
    fn test_amount_tamper_detected() {
        let mut block = genesis();
        block.entries[0].amount += 1;
        let err = block.verify_hash().unwrap_err();
        assert!(matches!(err, Error::Integrity { index: 0, .. }));
    }

    #[test]
    fn test_chain_linkage() {
        let g = genesis();
        let b1 = deposit_after(&g, 10);
        let b2 = deposit_after(&b1, 20);
        verify_chain(&[g, b1, b2]).unwrap();
    }

    #[test]
    fn test_broken_link_detected() {
        let g = genesis();
        let b1 = deposit_after(&g, 10);
        let mut b2 = deposit_after(&b1, 20);
        b2.previous_hash = g.hash.clone();
        b2.hash = b2.compute_hash();

        let err = verify_chain(&[g, b1, b2]).unwrap_err();
        assert!(matches!(err, Error::Integrity { index: 2, .. }));
    }

    #[test]
    fn test_index_gap_detected() {
        let g = genesis();
        let mut b1 = deposit_after(&g, 10);
        b1.index = 5;
        b1.hash = b1.compute_hash();

        let err = verify_chain(&[g, b1]).unwrap_err();
        assert!(matches!(err, Error::Integrity { index: 1, .. }));
    }

    #[test]
    fn test_genesis_must_be_mint() {
        let entry = Entry::new(
            EntryKind::Transfer,
            Address::new("SRT-X"),
            Address::new("SRT-Y"),
            1,
            0,
        );
        let bad = Block::genesis(entry, 0);
        assert!(matches!(verify_chain(&[bad]), Err(Error::Integrity { index: 0, .. })));
    }

    #[test]
    fn test_persisted_field_names() {
        let json = serde_json::to_value(genesis()).unwrap();
        for key in ["index", "timestamp", "previousHash", "hash", "entries"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["previousHash"], "0");
    }
}
