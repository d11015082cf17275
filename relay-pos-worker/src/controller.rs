// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::keeper::PosKeeper;
use relay_db_exports::BlockContext;
use relay_models::Address;
use relay_pos_exports::{
    BeginBlockRequest, GenesisState, PosController, PosError, PosQuery, QueryError, SignedTx,
    ValidatorUpdate,
};

impl PosController for PosKeeper {
    fn begin_block(&self, ctx: &mut BlockContext, request: &BeginBlockRequest) {
        PosKeeper::begin_block(self, ctx, request)
    }

    fn end_block(&self, ctx: &mut BlockContext) -> Vec<ValidatorUpdate> {
        PosKeeper::end_block(self, ctx)
    }

    fn deliver_tx(&self, ctx: &mut BlockContext, tx: &SignedTx) -> Result<(), PosError> {
        PosKeeper::deliver_tx(self, ctx, tx)
    }

    fn query(&self, ctx: &BlockContext, query: &PosQuery) -> Result<serde_json::Value, QueryError> {
        self.handle_query(ctx, query)
    }

    fn init_genesis(
        &self,
        ctx: &mut BlockContext,
        genesis: &GenesisState,
    ) -> Result<Vec<ValidatorUpdate>, PosError> {
        PosKeeper::init_genesis(self, ctx, genesis)
    }

    fn export_genesis(&self, ctx: &BlockContext) -> Result<GenesisState, PosError> {
        PosKeeper::export_genesis(self, ctx)
    }

    fn award_relays(&self, ctx: &mut BlockContext, address: &Address, relays: u64) {
        PosKeeper::award_relays(self, ctx, address, relays)
    }

    fn check_invariants(&self, ctx: &BlockContext) -> Result<(), PosError> {
        PosKeeper::check_invariants(self, ctx)
    }
}
