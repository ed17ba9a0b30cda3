//! Main ledger orchestration layer
//!
//! This module ties together storage, the engine and the writer actor into a
//! high-level API that speaks human token amounts.
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use srt_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> srt_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default()).await?;
//!
//!     ledger.mint("SRT-AAAA1111", Decimal::from(10)).await?;
//!     ledger.transfer("SRT-AAAA1111", "SRT-BBBB2222", Decimal::from(4)).await?;
//!     assert_eq!(ledger.balance_of_human("SRT-BBBB2222")?, Decimal::from(4));
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    amount::{to_base_units, to_human},
    block::Block,
    config::LoadPolicy,
    engine::{AuditReport, LedgerEngine},
    storage::{JsonFileStore, LedgerStore},
    types::{Address, Amount, Entry, EntryId},
    Config, Error, Result,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Actor task, awaited on shutdown
    task: JoinHandle<()>,

    /// Shared engine (read lock for queries)
    engine: Arc<RwLock<LedgerEngine>>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open the ledger file named in `config`
    pub async fn open(config: Config) -> Result<Self> {
        let store = JsonFileStore::new(&config.storage.ledger_file);

        let chain = match store.load() {
            Ok(chain) => chain,
            Err(Error::Storage(reason)) if config.storage.load_policy == LoadPolicy::Quarantine => {
                tracing::warn!(reason = %reason, "Ledger file unreadable, quarantining");
                store.quarantine()?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let engine = LedgerEngine::from_chain(Box::new(store), chain, &config)?;
        Ok(Self::start(engine, config))
    }

    /// Open over an arbitrary store
    pub async fn with_store(store: Box<dyn LedgerStore>, config: Config) -> Result<Self> {
        let engine = LedgerEngine::open(store, &config)?;
        Ok(Self::start(engine, config))
    }

    fn start(engine: LedgerEngine, config: Config) -> Self {
        let engine = Arc::new(RwLock::new(engine));
        let (handle, task) = spawn_ledger_actor(engine.clone(), config.actor.mailbox_capacity);

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            blocks = engine.read().block_count(),
            "Ledger opened"
        );

        Self {
            handle,
            task,
            engine,
            config,
        }
    }

    /// Convert a human amount, counting a failed conversion as a rejected mutation
    fn base_units(&self, amount: Decimal) -> Result<Amount> {
        to_base_units(amount).map_err(|e| {
            self.engine.read().metrics().record_rejection();
            tracing::warn!("Mutation rejected: {}", e);
            e
        })
    }

    /// Mint a human amount to `to`
    pub async fn mint(&self, to: &str, amount: Decimal) -> Result<EntryId> {
        let units = self.base_units(amount)?;
        self.handle.mint(Address::new(to), units).await
    }

    /// Transfer a human amount from `from` to `to`
    pub async fn transfer(&self, from: &str, to: &str, amount: Decimal) -> Result<EntryId> {
        let units = self.base_units(amount)?;
        self.handle
            .transfer(Address::new(from), Address::new(to), units)
            .await
    }

    /// Mint exact base units
    pub async fn mint_units(&self, to: &str, units: Amount) -> Result<EntryId> {
        self.handle.mint(Address::new(to), units).await
    }

    /// Transfer exact base units
    pub async fn transfer_units(&self, from: &str, to: &str, units: Amount) -> Result<EntryId> {
        self.handle
            .transfer(Address::new(from), Address::new(to), units)
            .await
    }

    /// Balance in base units
    pub fn balance_of(&self, address: &str) -> Amount {
        self.engine.read().balance_of(&Address::new(address))
    }

    /// Balance as a human amount
    pub fn balance_of_human(&self, address: &str) -> Result<Decimal> {
        to_human(self.balance_of(address))
    }

    /// Verify the chain and the cached balances
    pub fn audit(&self) -> AuditReport {
        self.engine.read().audit()
    }

    /// Entries touching `address`, oldest first
    pub fn history(&self, address: &str) -> Vec<Entry> {
        self.engine
            .read()
            .history(&Address::new(address))
            .into_iter()
            .cloned()
            .collect()
    }

    /// Entry by ID
    pub fn entry(&self, id: &EntryId) -> Option<Entry> {
        self.engine.read().entry(id).cloned()
    }

    /// Number of blocks, genesis included
    pub fn block_count(&self) -> u64 {
        self.engine.read().block_count()
    }

    /// Genesis supply plus deposits, in base units
    pub fn total_minted(&self) -> Amount {
        self.engine.read().total_minted()
    }

    /// Snapshot of every block
    pub fn export(&self) -> Vec<Block> {
        self.engine.read().blocks().to_vec()
    }

    /// Prometheus text rendering of the ledger metrics
    pub fn metrics(&self) -> String {
        self.engine.read().metrics().render()
    }

    /// Configuration the ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the writer actor and wait for it to drain
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await?;
        self.task
            .await
            .map_err(|e| Error::Concurrency(format!("Actor task failed: {}", e)))
    }
}
