//! Core types for the ledger
//!
//! All types are designed for:
//! - Stable JSON layout (the persisted ledger file)
//! - Exact arithmetic (integer base units, never floats)

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Amount in base units (18 implied decimal places)
pub type Amount = u128;

/// Entry identifier (UUIDv7, time-ordered)
pub type EntryId = Uuid;

/// Reserved source address of newly created supply.
///
/// Entries from this address credit `to` without debiting anyone.
pub const MINT_SENTINEL: &str = "0000";

/// Ledger address (e.g. `SRT-1A2B3C4D`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create new address
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The mint sentinel
    pub fn mint() -> Self {
        Self(MINT_SENTINEL.to_string())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the mint sentinel
    pub fn is_mint(&self) -> bool {
        self.0 == MINT_SENTINEL
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Kind of economic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum EntryKind {
    /// One-time creation of the total supply
    Genesis = 1,
    /// Newly minted units credited to an address
    Deposit = 2,
    /// Units moved between two addresses
    Transfer = 3,
}

impl EntryKind {
    /// Tag used in the canonical hash encoding
    pub fn tag(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Genesis => "GENESIS",
            EntryKind::Deposit => "DEPOSIT",
            EntryKind::Transfer => "TRANSFER",
        };
        f.write_str(s)
    }
}

/// One economic event recorded inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique entry ID
    pub id: EntryId,

    /// Event kind
    pub kind: EntryKind,

    /// Debited address (mint sentinel for GENESIS/DEPOSIT)
    pub from: Address,

    /// Credited address
    pub to: Address,

    /// Amount in base units, persisted as a decimal string
    #[serde(with = "amount_string")]
    pub amount: Amount,

    /// Creation time (milliseconds since Unix epoch)
    pub timestamp: i64,
}

impl Entry {
    /// Create a new entry with a fresh ID
    pub fn new(kind: EntryKind, from: Address, to: Address, amount: Amount, timestamp: i64) -> Self {
        Self {
            id: crate::crypto::generate_entry_id(),
            kind,
            from,
            to,
            amount,
            timestamp,
        }
    }

    /// True when the entry creates supply instead of moving it
    pub fn is_mint(&self) -> bool {
        self.from.is_mint()
    }

    /// True when `address` is debited or credited by this entry
    pub fn touches(&self, address: &Address) -> bool {
        &self.from == address || &self.to == address
    }
}

/// Serde adapter storing `u128` amounts as decimal strings.
///
/// JSON numbers above 2^53 are not portable, so amounts never travel as numbers.
mod amount_string {
    use super::Amount;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<Amount>()
            .map_err(|e| de::Error::custom(format!("invalid amount {:?}: {}", s, e)))
    }
}
