//! Ledger engine
//!
//! The engine is the only mutation surface of the ledger. It owns the chain
//! and the incrementally maintained balance mapping, enforces the
//! no-negative-balance rule and writes every committed block through to the
//! store before reporting success.
//!
//! # Invariants
//!
//! - Every address balance is >= 0 after every committed operation
//! - Σ balances == total minted (genesis supply plus deposits)
//! - Cached balances == `project(chain)` at all times
//! - A mutation either appends and persists exactly one block, or changes nothing

use crate::amount::MAX_AMOUNT;
use crate::block::{verify_chain, Block};
use crate::config::{Config, TokenConfig};
use crate::metrics::Metrics;
use crate::projector::{project, Balances};
use crate::storage::LedgerStore;
use crate::types::{Address, Amount, Entry, EntryId, EntryKind};
use crate::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Read-only summary produced by [`LedgerEngine::audit`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Number of blocks, genesis included
    pub block_count: u64,
    /// Number of entries across all blocks
    pub entry_count: u64,
    /// Every hash and link re-verified successfully
    pub integrity_ok: bool,
    /// Cached balances equal a full replay of the chain
    pub balances_consistent: bool,
    /// Hash of the last block
    pub tip_hash: String,
    /// Human-readable verdict
    pub status: String,
}

impl AuditReport {
    /// True when both checks passed
    pub fn is_secure(&self) -> bool {
        self.integrity_ok && self.balances_consistent
    }
}

/// Owner of the chain and its derived balances
pub struct LedgerEngine {
    chain: Vec<Block>,
    balances: Balances,
    entry_locations: HashMap<EntryId, (usize, usize)>,
    total_minted: Amount,
    store: Box<dyn LedgerStore>,
    token: TokenConfig,
    metrics: Metrics,
    poisoned: AtomicBool,
}

impl fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("blocks", &self.chain.len())
            .field("accounts", &self.balances.len())
            .field("total_minted", &self.total_minted)
            .field("store", &self.store.describe())
            .field("poisoned", &self.is_poisoned())
            .finish_non_exhaustive()
    }
}

impl LedgerEngine {
    /// Load the chain from `store` (or create genesis) and build balances
    pub fn open(store: Box<dyn LedgerStore>, config: &Config) -> Result<Self> {
        let chain = store.load()?;
        Self::from_chain(store, chain, config)
    }

    /// Build an engine over an already loaded chain.
    ///
    /// An empty chain gets a genesis block, persisted before returning. A
    /// non-empty chain must pass hash verification and a checked replay.
    pub fn from_chain(store: Box<dyn LedgerStore>, chain: Vec<Block>, config: &Config) -> Result<Self> {
        config.validate()?;

        let mut engine = Self {
            chain: Vec::new(),
            balances: Balances::new(),
            entry_locations: HashMap::new(),
            total_minted: 0,
            store,
            token: config.token.clone(),
            metrics: Metrics::new()?,
            poisoned: AtomicBool::new(false),
        };

        if chain.is_empty() {
            engine.create_genesis()?;
        } else {
            engine.restore(chain)?;
        }

        Ok(engine)
    }

    fn create_genesis(&mut self) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let entry = Entry::new(
            EntryKind::Genesis,
            Address::mint(),
            Address::new(self.token.genesis_address.clone()),
            self.token.total_supply(),
            now,
        );

        self.chain.push(Block::genesis(entry, now));
        if let Err(e) = self.persist() {
            self.chain.clear();
            return Err(e);
        }
        self.index_tip()?;

        tracing::info!(
            genesis_address = %self.token.genesis_address,
            total_supply = %self.token.total_supply(),
            store = %self.store.describe(),
            "Created genesis block"
        );

        Ok(())
    }

    fn restore(&mut self, chain: Vec<Block>) -> Result<()> {
        verify_chain(&chain)?;
        let (balances, total_minted) = checked_replay(&chain)?;

        let genesis = &chain[0].entries[0];
        if genesis.to.as_str() != self.token.genesis_address || genesis.amount != self.token.total_supply() {
            tracing::warn!(
                stored_address = %genesis.to,
                stored_supply = %genesis.amount,
                "Stored genesis differs from configured token parameters; keeping stored chain"
            );
        }

        self.balances = balances;
        self.total_minted = total_minted;
        self.chain = chain;
        for position in 0..self.chain.len() {
            self.index_block(position);
        }
        self.metrics.block_height.set(self.tip().index as i64);

        tracing::info!(
            blocks = self.chain.len(),
            accounts = self.balances.len(),
            tip = %self.tip().hash,
            "Ledger restored and verified"
        );

        Ok(())
    }

    // Mutations

    /// Credit `to` with `amount` newly minted base units.
    ///
    /// Appends one DEPOSIT entry from the mint sentinel; never fails on
    /// balance grounds. Rejected when the total supply would exceed
    /// [`MAX_AMOUNT`].
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<EntryId> {
        self.ensure_writable()?;
        let validation = validate_address(to)
            .and_then(|_| validate_amount(amount))
            .and_then(|_| self.check_supply(to, amount));
        if let Err(e) = validation {
            return Err(self.reject(e));
        }

        let entry = Entry::new(EntryKind::Deposit, Address::mint(), to.clone(), amount, self.next_timestamp());
        let entry_id = entry.id;
        self.append(entry)?;
        self.metrics.record_mint();

        tracing::info!(
            entry_id = %entry_id,
            block_index = self.tip().index,
            to = %to,
            amount = %amount,
            "Mint committed"
        );

        Ok(entry_id)
    }

    /// Move `amount` base units from `from` to `to`.
    ///
    /// Fails without touching the ledger when the amount is zero, an address
    /// is invalid, or `from` holds less than `amount`.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<EntryId> {
        self.ensure_writable()?;
        let validation = validate_address(from)
            .and_then(|_| validate_address(to))
            .and_then(|_| validate_amount(amount));
        if let Err(e) = validation {
            return Err(self.reject(e));
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(self.reject(Error::InsufficientFunds {
                address: from.clone(),
                available,
                required: amount,
            }));
        }

        let entry = Entry::new(EntryKind::Transfer, from.clone(), to.clone(), amount, self.next_timestamp());
        let entry_id = entry.id;
        self.append(entry)?;
        self.metrics.record_transfer();

        tracing::info!(
            entry_id = %entry_id,
            block_index = self.tip().index,
            from = %from,
            to = %to,
            amount = %amount,
            "Transfer committed"
        );

        Ok(entry_id)
    }

    /// Every balance is bounded by the total supply, so capping the supply
    /// keeps all balance arithmetic in range.
    fn check_supply(&self, to: &Address, amount: Amount) -> Result<()> {
        let supply = self
            .total_minted
            .checked_add(amount)
            .filter(|supply| *supply <= MAX_AMOUNT);
        let credited = i128::try_from(amount)
            .ok()
            .and_then(|amount| self.balances.get(to).checked_add(amount));

        match (supply, credited) {
            (Some(_), Some(_)) => Ok(()),
            _ => Err(Error::InvalidAmount(format!(
                "minting {} would push the total supply past {}",
                amount, MAX_AMOUNT
            ))),
        }
    }

    /// Wrap `entry` in a new block, persist, then update balances.
    fn append(&mut self, entry: Entry) -> Result<()> {
        let tip = self.tip();
        let block = Block::create(tip.index + 1, tip.hash.clone(), vec![entry], Utc::now().timestamp_millis());

        self.chain.push(block);
        if let Err(e) = self.persist() {
            let dropped = self.chain.pop();
            tracing::error!(
                block_index = dropped.map(|b| b.index),
                "Save failed, block discarded: {}",
                e
            );
            return Err(e);
        }

        if let Err(e) = self.index_tip() {
            // Persisted but not applied: refuse further writes until an operator looks
            self.poisoned.store(true, Ordering::SeqCst);
            tracing::error!(block_index = self.tip().index, "Committed block could not be applied: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// Apply the freshly persisted tip block to the derived state
    fn index_tip(&mut self) -> Result<()> {
        let position = self.chain.len() - 1;
        let block = &self.chain[position];
        let minted = block
            .entries
            .iter()
            .filter(|e| e.is_mint())
            .try_fold(self.total_minted, |total, e| total.checked_add(e.amount))
            .filter(|total| *total <= MAX_AMOUNT)
            .ok_or_else(|| Error::InvariantViolation(format!("block {} overflows the supply", block.index)))?;

        self.balances.apply_block(block)?;
        self.total_minted = minted;
        self.metrics.record_block(block.index);
        self.index_block(position);
        Ok(())
    }

    fn index_block(&mut self, position: usize) {
        for (offset, entry) in self.chain[position].entries.iter().enumerate() {
            self.entry_locations.insert(entry.id, (position, offset));
        }
    }

    fn persist(&self) -> Result<()> {
        let start = Instant::now();
        self.store.save(&self.chain)?;
        self.metrics.record_save_duration(start.elapsed().as_secs_f64());
        Ok(())
    }

    fn reject(&self, err: Error) -> Error {
        self.metrics.record_rejection();
        tracing::warn!("Mutation rejected: {}", err);
        err
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_poisoned() {
            return Err(Error::integrity(
                self.tip().index,
                "ledger failed its last audit; mutations are disabled",
            ));
        }
        Ok(())
    }

    fn next_timestamp(&self) -> i64 {
        Utc::now().timestamp_millis().max(self.tip().last_timestamp())
    }

    fn tip(&self) -> &Block {
        // The chain always holds at least the genesis block once constructed
        &self.chain[self.chain.len() - 1]
    }

    // Queries

    /// Balance of `address` in base units, 0 when never credited
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).max(0) as Amount
    }

    /// Re-verify the whole chain and the cached balances.
    ///
    /// A failed audit disables further mutations.
    pub fn audit(&self) -> AuditReport {
        let integrity = verify_chain(&self.chain);
        let balances_consistent = project(&self.chain).is_ok_and(|replayed| replayed == self.balances);
        let integrity_ok = integrity.is_ok();

        let status = if integrity_ok && balances_consistent {
            format!("SECURE - {} LEDGER", self.token.symbol)
        } else {
            self.poisoned.store(true, Ordering::SeqCst);
            tracing::error!(
                integrity = ?integrity.err(),
                balances_consistent,
                "Audit failed, ledger is now read-only"
            );
            format!("COMPROMISED - {} LEDGER", self.token.symbol)
        };

        AuditReport {
            block_count: self.chain.len() as u64,
            entry_count: self.chain.iter().map(|b| b.entries.len() as u64).sum(),
            integrity_ok,
            balances_consistent,
            tip_hash: self.tip().hash.clone(),
            status,
        }
    }

    /// True once an audit has failed
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    /// Number of blocks, genesis included
    pub fn block_count(&self) -> u64 {
        self.chain.len() as u64
    }

    /// Every block in index order
    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    /// Cached balance mapping
    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    /// Genesis supply plus every deposit, in base units
    pub fn total_minted(&self) -> Amount {
        self.total_minted
    }

    /// Look up an entry by ID
    pub fn entry(&self, id: &EntryId) -> Option<&Entry> {
        self.entry_locations
            .get(id)
            .map(|&(block, offset)| &self.chain[block].entries[offset])
    }

    /// Entries debiting or crediting `address`, oldest first
    pub fn history(&self, address: &Address) -> Vec<&Entry> {
        self.chain
            .iter()
            .flat_map(|b| b.entries.iter())
            .filter(|e| e.touches(address))
            .collect()
    }

    /// Token parameters
    pub fn token(&self) -> &TokenConfig {
        &self.token
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

fn validate_address(address: &Address) -> Result<()> {
    if address.as_str().trim().is_empty() {
        return Err(Error::InvalidAddress("address must not be empty".to_string()));
    }
    if address.is_mint() {
        return Err(Error::InvalidAddress(format!("{} is reserved for minting", address)));
    }
    Ok(())
}

fn validate_amount(amount: Amount) -> Result<()> {
    if amount == 0 {
        return Err(Error::InvalidAmount("amount must be positive".to_string()));
    }
    if amount > MAX_AMOUNT {
        return Err(Error::InvalidAmount(format!("{} exceeds the maximum of {}", amount, MAX_AMOUNT)));
    }
    Ok(())
}

/// Replay a hash-verified chain, checking the rules the engine enforces on write.
///
/// Returns the balances and the total minted supply.
fn checked_replay(chain: &[Block]) -> Result<(Balances, Amount)> {
    let mut balances = Balances::new();
    let mut total_minted: Amount = 0;
    let mut last_timestamp = i64::MIN;

    for block in chain {
        for entry in &block.entries {
            let at = format!("block {} entry {}", block.index, entry.id);

            if entry.amount == 0 {
                return Err(Error::InvariantViolation(format!("{}: zero amount", at)));
            }
            if entry.timestamp < last_timestamp {
                return Err(Error::InvariantViolation(format!("{}: timestamp goes backwards", at)));
            }
            last_timestamp = entry.timestamp;

            if entry.to.is_mint() {
                return Err(Error::InvariantViolation(format!("{}: credits the mint sentinel", at)));
            }

            match entry.kind {
                EntryKind::Genesis if block.index != 0 => {
                    return Err(Error::InvariantViolation(format!("{}: second GENESIS", at)));
                }
                EntryKind::Genesis | EntryKind::Deposit if !entry.is_mint() => {
                    return Err(Error::InvariantViolation(format!("{}: {} not from the mint", at, entry.kind)));
                }
                EntryKind::Transfer if entry.is_mint() => {
                    return Err(Error::InvariantViolation(format!("{}: TRANSFER from the mint", at)));
                }
                _ => {}
            }

            balances.apply_entry(entry)?;

            if entry.is_mint() {
                total_minted = total_minted
                    .checked_add(entry.amount)
                    .filter(|total| *total <= MAX_AMOUNT)
                    .ok_or_else(|| Error::InvariantViolation(format!("{}: supply overflow", at)))?;
            } else if balances.get(&entry.from) < 0 {
                return Err(Error::InvariantViolation(format!(
                    "{}: {} overdrawn",
                    at, entry.from
                )));
            }
        }
    }

    Ok((balances, total_minted))
}
