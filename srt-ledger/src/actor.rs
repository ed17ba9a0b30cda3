//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns every mutation, so check-then-append never races
//! - Requests are processed strictly in arrival order
//! - Async message passing with backpressure (bounded mailbox)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │            Callers (CLI, services, tests)             │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   write lock ─► validate ─► append ─► save ─► apply  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Readers take the engine's read lock directly and never go through the
//! mailbox; they observe either the state before or after a block, never a
//! half-applied one.

use crate::engine::LedgerEngine;
use crate::types::{Address, Amount, EntryId};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Mint new supply to an address
    Mint {
        /// Credited address
        to: Address,
        /// Base units
        amount: Amount,
        /// Reply channel
        response: oneshot::Sender<Result<EntryId>>,
    },

    /// Move funds between addresses
    Transfer {
        /// Debited address
        from: Address,
        /// Credited address
        to: Address,
        /// Base units
        amount: Amount,
        /// Reply channel
        response: oneshot::Sender<Result<EntryId>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger mutations
#[derive(Debug)]
pub struct LedgerActor {
    /// Shared engine
    engine: Arc<RwLock<LedgerEngine>>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(engine: Arc<RwLock<LedgerEngine>>, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { engine, mailbox }
    }

    /// Run the actor event loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        tracing::debug!("Ledger actor started");

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => {
                    tracing::info!("Ledger actor shutting down");
                    break;
                }
                msg => self.handle_message(msg),
            }
        }

        tracing::debug!("Ledger actor stopped");
    }

    /// Handle a single mutation
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Mint { to, amount, response } => {
                let result = self.engine.write().mint(&to, amount);
                let _ = response.send(result);
            }

            LedgerMessage::Transfer {
                from,
                to,
                amount,
                response,
            } => {
                let result = self.engine.write().transfer(&from, &to, amount);
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Mint `amount` base units to `to`
    pub async fn mint(&self, to: Address, amount: Amount) -> Result<EntryId> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Mint {
                to,
                amount,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Transfer `amount` base units from `from` to `to`
    pub async fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<EntryId> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Transfer {
                from,
                to,
                amount,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor over a shared engine
pub fn spawn_ledger_actor(
    engine: Arc<RwLock<LedgerEngine>>,
    mailbox_capacity: usize,
) -> (LedgerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(engine, rx);

    let task = tokio::spawn(async move {
        actor.run().await;
    });

    (LedgerHandle::new(tx), task)
}
