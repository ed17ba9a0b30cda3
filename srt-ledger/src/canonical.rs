//! Canonical encoding for block hashing
//!
//! Ensures a deterministic byte representation of block contents.
//! Uses fixed field order, big-endian integers and length-prefixed strings,
//! so digests do not depend on any serializer's formatting choices.

use crate::types::Entry;

/// Canonical encoder
#[derive(Debug, Default)]
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
}

impl CanonicalEncoder {
    /// Create new encoder
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Write u8
    pub fn write_u8(&mut self, n: u8) {
        self.buffer.push(n);
    }

    /// Write u32 (big-endian)
    pub fn write_u32(&mut self, n: u32) {
        self.write_bytes(&n.to_be_bytes());
    }

    /// Write u64 (big-endian)
    pub fn write_u64(&mut self, n: u64) {
        self.write_bytes(&n.to_be_bytes());
    }

    /// Write i64 (big-endian)
    pub fn write_i64(&mut self, n: i64) {
        self.write_bytes(&n.to_be_bytes());
    }

    /// Write u128 (big-endian)
    pub fn write_u128(&mut self, n: u128) {
        self.write_bytes(&n.to_be_bytes());
    }

    /// Write string (length-prefixed)
    pub fn write_string(&mut self, s: &str) {
        let bytes = s.as_bytes();
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes);
    }

    /// Write one entry in fixed field order
    pub fn write_entry(&mut self, entry: &Entry) {
        self.write_string(&entry.id.hyphenated().to_string());
        self.write_u8(entry.kind.tag());
        self.write_string(entry.from.as_str());
        self.write_string(entry.to.as_str());
        self.write_u128(entry.amount);
        self.write_i64(entry.timestamp);
    }

    /// Write a count-prefixed entry sequence, preserving order
    pub fn write_entries(&mut self, entries: &[Entry]) {
        self.write_u32(entries.len() as u32);
        for entry in entries {
            self.write_entry(entry);
        }
    }

    /// Finalize and return bytes
    pub fn finalize(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, EntryKind};

    fn entry(amount: u128) -> Entry {
        Entry::new(
            EntryKind::Deposit,
            Address::mint(),
            Address::new("SRT-AAAA1111"),
            amount,
            1_700_000_000_000,
        )
    }

    #[test]
    fn test_string_is_length_prefixed() {
        let mut enc = CanonicalEncoder::new();
        enc.write_string("ab");
        assert_eq!(enc.finalize(), vec![0, 0, 0, 2, b'a', b'b']);
    }

    #[test]
    fn test_adjacent_strings_do_not_collide() {
        let mut a = CanonicalEncoder::new();
        a.write_string("ab");
        a.write_string("c");

        let mut b = CanonicalEncoder::new();
        b.write_string("a");
        b.write_string("bc");

        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_entry_order_matters() {
        let e1 = entry(1);
        let e2 = entry(2);

        let mut forward = CanonicalEncoder::new();
        forward.write_entries(&[e1.clone(), e2.clone()]);

        let mut reverse = CanonicalEncoder::new();
        reverse.write_entries(&[e2, e1]);

        assert_ne!(forward.finalize(), reverse.finalize());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let e = entry(42);

        let mut a = CanonicalEncoder::new();
        a.write_entry(&e);
        let mut b = CanonicalEncoder::new();
        b.write_entry(&e);

        assert_eq!(a.finalize(), b.finalize());
    }
}
