//! Balance projection
//!
//! Balances are derived state: [`project`] replays a chain from zero, and
//! [`Balances::apply_block`] applies a single block's delta. The engine keeps
//! an incrementally maintained mapping for the hot path and uses full replay
//! when loading and auditing; both must always agree.

use crate::block::Block;
use crate::types::{Address, Entry};
use crate::{Error, Result};
use std::collections::HashMap;

/// Address -> signed balance in base units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    accounts: HashMap<Address, i128>,
}

impl Balances {
    /// Empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `address`, 0 when never credited
    pub fn get(&self, address: &Address) -> i128 {
        self.accounts.get(address).copied().unwrap_or(0)
    }

    /// Apply one entry: credit `to`, debit `from` unless it is the mint sentinel.
    ///
    /// Fails without changing anything when a balance would leave the `i128` range.
    pub fn apply_entry(&mut self, entry: &Entry) -> Result<()> {
        let overflow = || Error::InvariantViolation(format!("entry {} overflows a balance", entry.id));

        let amount = i128::try_from(entry.amount).map_err(|_| overflow())?;
        let credited = self.get(&entry.to).checked_add(amount).ok_or_else(overflow)?;

        if entry.is_mint() {
            self.accounts.insert(entry.to.clone(), credited);
            return Ok(());
        }

        let debited = self.get(&entry.from).checked_sub(amount).ok_or_else(overflow)?;
        self.accounts.insert(entry.from.clone(), debited);
        // Self-transfer: credit the already-debited balance
        let credited = if entry.from == entry.to { debited + amount } else { credited };
        self.accounts.insert(entry.to.clone(), credited);
        Ok(())
    }

    /// Apply every entry of `block` in insertion order
    pub fn apply_block(&mut self, block: &Block) -> Result<()> {
        for entry in &block.entries {
            self.apply_entry(entry)?;
        }
        Ok(())
    }

    /// Sum of all balances
    pub fn total(&self) -> i128 {
        self.accounts.values().sum()
    }

    /// Lowest balance with its address, if any account exists
    pub fn min_balance(&self) -> Option<(&Address, i128)> {
        self.accounts
            .iter()
            .map(|(address, balance)| (address, *balance))
            .min_by_key(|(_, balance)| *balance)
    }

    /// Number of addresses ever touched
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no entry has been applied
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Iterate over `(address, balance)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &i128)> {
        self.accounts.iter()
    }
}

/// Replay `chain` from an empty mapping
pub fn project(chain: &[Block]) -> Result<Balances> {
    let mut balances = Balances::new();
    for block in chain {
        balances.apply_block(block)?;
    }
    tracing::debug!(
        blocks = chain.len(),
        accounts = balances.len(),
        "Projected balances from full replay"
    );
    Ok(balances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryKind;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn chain() -> Vec<Block> {
        let g = Block::genesis(
            Entry::new(EntryKind::Genesis, Address::mint(), addr("RESERVE"), 1_000, 0),
            0,
        );
        let b1 = Block::create(
            1,
            g.hash.clone(),
            vec![Entry::new(EntryKind::Deposit, Address::mint(), addr("A"), 10, 1)],
            1,
        );
        let b2 = Block::create(
            2,
            b1.hash.clone(),
            vec![
                Entry::new(EntryKind::Transfer, addr("A"), addr("B"), 4, 2),
                Entry::new(EntryKind::Transfer, addr("B"), addr("C"), 1, 2),
            ],
            2,
        );
        vec![g, b1, b2]
    }

    #[test]
    fn test_unknown_address_is_zero() {
        assert_eq!(Balances::new().get(&addr("nobody")), 0);
    }

    #[test]
    fn test_project_replays_in_order() {
        let balances = project(&chain()).unwrap();
        assert_eq!(balances.get(&addr("RESERVE")), 1_000);
        assert_eq!(balances.get(&addr("A")), 6);
        assert_eq!(balances.get(&addr("B")), 3);
        assert_eq!(balances.get(&addr("C")), 1);
        // The sentinel is never debited
        assert_eq!(balances.get(&Address::mint()), 0);
        assert_eq!(balances.total(), 1_010);
    }

    #[test]
    fn test_incremental_matches_full_replay() {
        let chain = chain();
        let mut incremental = Balances::new();
        for (i, block) in chain.iter().enumerate() {
            incremental.apply_block(block).unwrap();
            assert_eq!(incremental, project(&chain[..=i]).unwrap());
        }
    }

    #[test]
    fn test_min_balance() {
        let balances = project(&chain()).unwrap();
        assert_eq!(balances.min_balance(), Some((&addr("C"), 1)));
        assert_eq!(Balances::new().min_balance(), None);
    }

    #[test]
    fn test_self_transfer_is_neutral() {
        let mut balances = project(&chain()).unwrap();
        balances
            .apply_entry(&Entry::new(EntryKind::Transfer, addr("A"), addr("A"), 6, 3))
            .unwrap();
        assert_eq!(balances.get(&addr("A")), 6);
    }

    #[test]
    fn test_overflowing_credit_changes_nothing() {
        let mut balances = Balances::new();
        let max = i128::MAX as u128;
        balances
            .apply_entry(&Entry::new(EntryKind::Deposit, Address::mint(), addr("A"), max, 0))
            .unwrap();

        let err = balances
            .apply_entry(&Entry::new(EntryKind::Deposit, Address::mint(), addr("A"), 1, 1))
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert_eq!(balances.get(&addr("A")), i128::MAX);

        // Amounts beyond the signed range are refused outright
        let err = balances
            .apply_entry(&Entry::new(EntryKind::Deposit, Address::mint(), addr("B"), max + 1, 2))
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert_eq!(balances.get(&addr("B")), 0);
    }
}
