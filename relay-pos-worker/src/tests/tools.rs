// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::PosKeeper;
use parking_lot::RwLock;
use relay_db_exports::{BlockContext, RelayDBConfig, RelayDBController, ShareableRelayDBController};
use relay_db_worker::RelayDB;
use relay_ledger_exports::{
    AccountKeeper, LedgerConfig, ModuleAccount, ModulePermission, DAO_POOL_NAME,
    FEE_COLLECTOR_NAME, STAKED_POOL_NAME,
};
use relay_ledger_worker::FinalLedger;
use relay_models::{Address, Amount, BlockHeader, Event};
use relay_pos_exports::test_exports::{address_of, signed_tx, test_stake_msg};
use relay_pos_exports::{
    BeginBlockRequest, PosConfig, PosError, PosHooks, PosMessage, SignedTx, ValidatorUpdate,
};
use relay_signature::KeyPair;
use relay_time::RelayTime;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Time of the genesis block
pub const GENESIS_TIME: RelayTime = RelayTime::from_millis(1_600_000_000_000);
/// Time between two blocks
pub const BLOCK_TIME: RelayTime = RelayTime::from_millis(10_000);

/// Output of a block run through the whole pipeline
pub struct BlockOutcome {
    pub updates: Vec<ValidatorUpdate>,
    pub events: Vec<Event>,
    pub tx_results: Vec<Result<(), PosError>>,
}

impl BlockOutcome {
    /// Events of kind `kind`
    pub fn events_of(&self, kind: &str) -> Vec<&Event> {
        self.events.iter().filter(|event| event.kind == kind).collect()
    }
}

/// A keeper over a RocksDB store in a temporary folder, with a chain of
/// blocks committed one after the other
pub struct TestUniverse {
    pub keeper: PosKeeper,
    /// stateless, reads the same store as the keeper's ledger
    pub ledger: FinalLedger,
    pub db: ShareableRelayDBController,
    pub height: u64,
    pub time: RelayTime,
    pub proposer: Address,
    _temp_dir: TempDir,
}

fn new_ledger() -> FinalLedger {
    FinalLedger::new(LedgerConfig {
        initial_ledger_path: None,
    })
}

impl TestUniverse {
    /// Universe with the module accounts registered and the given balances
    pub fn new(config: PosConfig, balances: &[(Address, Amount)]) -> Self {
        Self::with_hooks(config, balances, None)
    }

    pub fn with_hooks(
        config: PosConfig,
        balances: &[(Address, Amount)],
        hooks: Option<Box<dyn PosHooks>>,
    ) -> Self {
        let universe = Self::empty(config, hooks);
        let mut ctx = universe.context(0, GENESIS_TIME);
        register_pools(&universe.ledger, &mut ctx);
        let balances: BTreeMap<Address, Amount> = balances.iter().copied().collect();
        universe
            .ledger
            .load_initial_balances(&mut ctx, &balances)
            .unwrap();
        ctx.commit();
        universe
    }

    /// Universe without module accounts nor balances
    pub fn empty(config: PosConfig, hooks: Option<Box<dyn PosHooks>>) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let temp_dir = tempfile::tempdir().expect("Unable to create a temp folder");
        let db: ShareableRelayDBController = Arc::new(RwLock::new(Box::new(RelayDB::new(
            RelayDBConfig {
                path: temp_dir.path().to_path_buf(),
                max_open_files: None,
            },
        )) as Box<dyn RelayDBController>));
        let keeper = PosKeeper::new(config, Box::new(new_ledger()), hooks);
        TestUniverse {
            keeper,
            ledger: new_ledger(),
            db,
            height: 0,
            time: GENESIS_TIME,
            proposer: Address::from_module_name("proposer"),
            _temp_dir: temp_dir,
        }
    }

    fn context(&self, height: u64, time: RelayTime) -> BlockContext {
        BlockContext::new(
            BlockHeader {
                height,
                time,
                proposer: self.proposer,
            },
            self.db.clone(),
        )
    }

    /// Height of the next block
    pub fn next_height(&self) -> u64 {
        self.height + 1
    }

    /// Time of the next block
    pub fn next_time(&self) -> RelayTime {
        self.time.saturating_add(BLOCK_TIME)
    }

    /// Opens the next block, to be committed with `commit`
    pub fn begin(&mut self) -> BlockContext {
        self.height = self.next_height();
        self.time = self.next_time();
        self.context(self.height, self.time)
    }

    /// Commits a block opened with `begin` after checking the invariants
    pub fn commit(&self, ctx: BlockContext) -> Vec<Event> {
        self.keeper.check_invariants(&ctx).unwrap();
        ctx.commit()
    }

    /// Read-only view of the last committed block
    pub fn view(&self) -> BlockContext {
        self.context(self.height, self.time)
    }

    /// Moves the clock forward without producing blocks
    pub fn advance_time(&mut self, duration: RelayTime) {
        self.time = self.time.saturating_add(duration);
    }

    /// Runs a whole block: `begin_block`, the transactions, `end_block`
    pub fn run_block(&mut self, request: &BeginBlockRequest, txs: &[SignedTx]) -> BlockOutcome {
        let mut ctx = self.begin();
        self.keeper.begin_block(&mut ctx, request);
        let tx_results = txs
            .iter()
            .map(|tx| self.keeper.deliver_tx(&mut ctx, tx))
            .collect();
        let updates = self.keeper.end_block(&mut ctx);
        let events = self.commit(ctx);
        BlockOutcome {
            updates,
            events,
            tx_results,
        }
    }

    /// Runs a block with transactions only
    pub fn run_txs(&mut self, txs: &[SignedTx]) -> BlockOutcome {
        self.run_block(&BeginBlockRequest::default(), txs)
    }

    /// Runs `count` empty blocks
    pub fn run_empty_blocks(&mut self, count: u64) {
        for _ in 0..count {
            self.run_block(&BeginBlockRequest::default(), &[]);
        }
    }

    pub fn balance(&self, address: &Address) -> Amount {
        self.ledger.get_coins(&self.view(), address)
    }

    pub fn module_balance(&self, name: &str) -> Amount {
        let address = self.ledger.get_module_address(name);
        self.balance(&address)
    }
}

pub fn register_pools(ledger: &FinalLedger, ctx: &mut BlockContext) {
    ledger
        .register_module_account(
            ctx,
            ModuleAccount::new(STAKED_POOL_NAME, &ModulePermission::ALL),
        )
        .unwrap();
    ledger
        .register_module_account(ctx, ModuleAccount::new(DAO_POOL_NAME, &ModulePermission::ALL))
        .unwrap();
    ledger
        .register_module_account(ctx, ModuleAccount::new(FEE_COLLECTOR_NAME, &[]))
        .unwrap();
}

/// Stake of `value` for the validator owning `keypair`, signed by it
pub fn stake_tx(keypair: &KeyPair, value: u64) -> SignedTx {
    signed_tx(
        keypair,
        PosMessage::Stake(test_stake_msg(keypair, Amount::from_raw(value))),
        Amount::zero(),
    )
}

/// Unstake of the validator owning `keypair`, signed by it
pub fn unstake_tx(keypair: &KeyPair) -> SignedTx {
    let address = address_of(keypair);
    signed_tx(
        keypair,
        PosMessage::BeginUnstake {
            address,
            signer: address,
        },
        Amount::zero(),
    )
}

/// Unjail of the validator owning `keypair`, signed by it
pub fn unjail_tx(keypair: &KeyPair) -> SignedTx {
    let address = address_of(keypair);
    signed_tx(
        keypair,
        PosMessage::Unjail {
            address,
            signer: address,
        },
        Amount::zero(),
    )
}
