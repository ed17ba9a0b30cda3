//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Supply conservation: Σ balances == genesis supply + Σ deposits
//! - No negative balance after any sequence of operations
//! - Cached balances == full replay of the chain
//! - Deterministic replay: reopening a persisted chain reproduces every balance

use proptest::prelude::*;
use rust_decimal::Decimal;
use srt_ledger::{
    amount::UNIT, project, Address, Amount, Config, Error, Ledger, LedgerEngine, MemoryStore,
};

const ADDRESSES: [&str; 5] = ["SRT-BANK-RESERVE", "SRT-A", "SRT-B", "SRT-C", "SRT-D"];

/// Operation applied to the ledger
#[derive(Debug, Clone)]
enum Op {
    Mint { to: usize, amount: Amount },
    Transfer { from: usize, to: usize, amount: Amount },
}

/// Strategy for generating amounts, zero included to exercise rejection
fn amount_strategy() -> impl Strategy<Value = Amount> {
    prop_oneof![
        1 => Just(0u128),
        8 => 1u128..1_000u128,
        1 => (1u64..1_000u64).prop_map(|t| t as Amount * UNIT),
    ]
}

/// Strategy for generating operations over a small address pool
fn op_strategy() -> impl Strategy<Value = Op> {
    let index = 0usize..ADDRESSES.len();
    prop_oneof![
        (index.clone(), amount_strategy()).prop_map(|(to, amount)| Op::Mint { to, amount }),
        (index.clone(), index, amount_strategy())
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
    ]
}

fn addr(i: usize) -> Address {
    Address::new(ADDRESSES[i])
}

fn open_engine() -> (LedgerEngine, MemoryStore) {
    let store = MemoryStore::new();
    let engine = LedgerEngine::open(Box::new(store.clone()), &Config::default()).unwrap();
    (engine, store)
}

fn apply(engine: &mut LedgerEngine, op: &Op) -> Result<(), Error> {
    match *op {
        Op::Mint { to, amount } => engine.mint(&addr(to), amount).map(|_| ()),
        Op::Transfer { from, to, amount } => engine.transfer(&addr(from), &addr(to), amount).map(|_| ()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Σ balances equals everything ever minted
    #[test]
    fn prop_supply_conservation(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (mut engine, _store) = open_engine();
        let mut expected_minted = Config::default().token.total_supply();

        for op in &ops {
            let committed = apply(&mut engine, op).is_ok();
            if let (true, Op::Mint { amount, .. }) = (committed, op) {
                expected_minted += amount;
            }
        }

        prop_assert_eq!(engine.total_minted(), expected_minted);
        prop_assert_eq!(engine.balances().total(), expected_minted as i128);
    }

    /// Property: no address ever goes negative, and rejections change nothing
    #[test]
    fn prop_no_negative_balance(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (mut engine, store) = open_engine();

        for op in &ops {
            let blocks_before = engine.block_count();
            let saves_before = store.save_count();

            match apply(&mut engine, op) {
                Ok(()) => {
                    prop_assert_eq!(engine.block_count(), blocks_before + 1);
                    prop_assert_eq!(store.save_count(), saves_before + 1);
                }
                Err(e) => {
                    prop_assert!(e.is_rejection());
                    prop_assert_eq!(engine.block_count(), blocks_before);
                    prop_assert_eq!(store.save_count(), saves_before);
                }
            }

            if let Some((_, lowest)) = engine.balances().min_balance() {
                prop_assert!(lowest >= 0);
            }
        }
    }

    /// Property: incremental balances always equal a full replay
    #[test]
    fn prop_projection_equivalence(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (mut engine, _store) = open_engine();

        for op in &ops {
            let _ = apply(&mut engine, op);
            prop_assert_eq!(engine.balances(), &project(engine.blocks()).unwrap());
        }

        prop_assert!(engine.audit().is_secure());
    }

    /// Property: reopening the persisted chain reproduces every balance
    #[test]
    fn prop_restart_reproduces_state(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let (mut engine, store) = open_engine();
        for op in &ops {
            let _ = apply(&mut engine, op);
        }

        let reopened = LedgerEngine::open(Box::new(store.clone()), &Config::default()).unwrap();

        prop_assert_eq!(reopened.blocks(), engine.blocks());
        prop_assert_eq!(reopened.balances(), engine.balances());
        for i in 0..ADDRESSES.len() {
            prop_assert_eq!(reopened.balance_of(&addr(i)), engine.balance_of(&addr(i)));
        }
    }

    /// Property: human amounts survive the file round trip through the facade
    #[test]
    fn prop_file_backed_restart(cents in prop::collection::vec(1i64..1_000_000i64, 1..8)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let mut config = Config::default();
            config.storage.ledger_file = dir.path().join("srt_ledger.json");

            let ledger = Ledger::open(config.clone()).await.unwrap();
            let mut expected = Decimal::ZERO;
            for c in &cents {
                let amount = Decimal::new(*c, 2);
                ledger.mint("SRT-A", amount).await.unwrap();
                expected += amount;
            }
            ledger.shutdown().await.unwrap();

            let reopened = Ledger::open(config).await.unwrap();
            prop_assert_eq!(reopened.balance_of_human("SRT-A").unwrap(), expected.normalize());
            prop_assert_eq!(reopened.block_count(), cents.len() as u64 + 1);
            reopened.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}
