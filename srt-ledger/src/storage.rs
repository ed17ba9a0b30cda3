//! Storage layer for the block sequence
//!
//! # Layout
//!
//! The whole durable state is one JSON file: an array of block records
//! `{index, timestamp, previousHash, hash, entries: [...]}` in index order.
//!
//! # Atomicity
//!
//! `save` writes `<file>.tmp`, syncs it, then renames it over the ledger
//! file. A crash mid-write leaves either the old or the new chain, never a
//! truncated one.

use crate::block::Block;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Durable persistence of the ordered block sequence.
///
/// Only ever invoked by the engine; implementations need no cross-process
/// coordination.
pub trait LedgerStore: Send + Sync {
    /// Load the persisted chain; empty when no prior state exists
    fn load(&self) -> Result<Vec<Block>>;

    /// Replace the persisted chain with `chain`
    fn save(&self, chain: &[Block]) -> Result<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Single-file JSON store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path` (created on first save)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Move an unreadable ledger file aside.
    ///
    /// Returns the new location, or `None` when there was nothing to move.
    pub fn quarantine(&self) -> Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let millis = chrono::Utc::now().timestamp_millis();
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{}", millis));
        let target = PathBuf::from(name);

        fs::rename(&self.path, &target)
            .map_err(|e| Error::Storage(format!("Failed to quarantine {:?}: {}", self.path, e)))?;

        tracing::warn!(
            from = ?self.path,
            to = ?target,
            "Quarantined unreadable ledger file"
        );

        Ok(Some(target))
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Block>> {
        if !self.path.exists() {
            tracing::info!(path = ?self.path, "No ledger file, starting empty");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| Error::Storage(format!("Failed to read {:?}: {}", self.path, e)))?;

        let chain: Vec<Block> = serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("Failed to parse {:?}: {}", self.path, e)))?;

        tracing::info!(path = ?self.path, blocks = chain.len(), "Loaded ledger file");

        Ok(chain)
    }

    fn save(&self, chain: &[Block]) -> Result<()> {
        let start = Instant::now();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(chain)?;
        let temp_path = self.temp_path();

        let write_result = (|| -> std::io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()
        })();

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(Error::Storage(format!("Failed to write {:?}: {}", temp_path, e)));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::Storage(format!("Failed to replace {:?}: {}", self.path, e))
        })?;

        tracing::debug!(
            path = ?self.path,
            blocks = chain.len(),
            bytes = json.len(),
            elapsed = ?start.elapsed(),
            "Ledger saved"
        );

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store
///
/// Clones share the same state, so a test can keep one clone and inspect
/// what the engine persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    chain: Arc<Mutex<Vec<Block>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `chain`
    pub fn with_chain(chain: Vec<Block>) -> Self {
        Self {
            chain: Arc::new(Mutex::new(chain)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of successful `save` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the persisted chain
    pub fn snapshot(&self) -> Vec<Block> {
        self.chain.lock().clone()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Vec<Block>> {
        Ok(self.chain.lock().clone())
    }

    fn save(&self, chain: &[Block]) -> Result<()> {
        *self.chain.lock() = chain.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
