// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::PosError;
use crate::genesis::GenesisState;
use crate::message::SignedTx;
use crate::query::{PosQuery, QueryError};
use crate::types::{BeginBlockRequest, ValidatorUpdate};
use relay_db_exports::BlockContext;
use relay_models::Address;

/// Interface of the PoS state machine, driven by the consensus engine.
///
/// Within a block the calls arrive as `begin_block`, then `deliver_tx` for
/// every transaction, then `end_block`. The caller commits the block context
/// afterwards.
pub trait PosController: Send + Sync {
    /// Pays rewards, accounts the votes of the last commit and handles evidence.
    /// Failures that are not invariant violations are logged.
    fn begin_block(&self, ctx: &mut BlockContext, request: &BeginBlockRequest);

    /// Releases waiting validators, pays back mature unstakings and returns
    /// the changes of the consensus set
    fn end_block(&self, ctx: &mut BlockContext) -> Vec<ValidatorUpdate>;

    /// Executes a transaction. On error, none of the writes of the message are kept.
    fn deliver_tx(&self, ctx: &mut BlockContext, tx: &SignedTx) -> Result<(), PosError>;

    /// Read-only query, the response is a JSON value
    fn query(&self, ctx: &BlockContext, query: &PosQuery) -> Result<serde_json::Value, QueryError>;

    /// Loads the genesis state and returns the initial consensus set
    fn init_genesis(
        &self,
        ctx: &mut BlockContext,
        genesis: &GenesisState,
    ) -> Result<Vec<ValidatorUpdate>, PosError>;

    /// Reads back the state of the module
    fn export_genesis(&self, ctx: &BlockContext) -> Result<GenesisState, PosError>;

    /// Records served relays, paid at the beginning of the next block
    fn award_relays(&self, ctx: &mut BlockContext, address: &Address, relays: u64);

    /// Checks the accounting invariants of the module
    fn check_invariants(&self, ctx: &BlockContext) -> Result<(), PosError>;
}
