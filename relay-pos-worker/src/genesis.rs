// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::keeper::PosKeeper;
use relay_db_exports::BlockContext;
use relay_ledger_exports::{DAO_POOL_NAME, FEE_COLLECTOR_NAME, STAKED_POOL_NAME};
use relay_pos_exports::{
    GenesisState, MissedBlock, PosError, SigningInfo, ValidatorPower, ValidatorUpdate,
};
use std::collections::BTreeMap;
use tracing::{info, warn};

impl PosKeeper {
    /// Loads the genesis state of the module and returns the initial consensus set
    pub fn init_genesis(
        &self,
        ctx: &mut BlockContext,
        genesis: &GenesisState,
    ) -> Result<Vec<ValidatorUpdate>, PosError> {
        if genesis.params != self.config.params {
            return Err(PosError::InvalidParams(
                "genesis parameters differ from the node configuration".to_string(),
            ));
        }
        genesis.validate(self.config.power_reduction)?;
        for name in [STAKED_POOL_NAME, DAO_POOL_NAME, FEE_COLLECTOR_NAME] {
            if self.ledger.get_module_account(ctx, name).is_none() {
                return Err(PosError::ModuleAccountMissing(name.to_string()));
            }
        }
        self.clear_cache();

        for validator in &genesis.validators {
            self.set_validator_keys(ctx, &validator.public_key);
            self.set_validator(ctx, validator);
        }
        for (address, info) in &genesis.signing_infos {
            let info = SigningInfo {
                address: *address,
                ..*info
            };
            self.set_signing_info(ctx, &info);
        }
        for validator in genesis.validators.iter().filter(|v| v.is_staked()) {
            self.ensure_signing_info(ctx, &validator.address);
        }
        for (address, bits) in &genesis.missed_blocks {
            for bit in bits.iter().filter(|bit| bit.missed) {
                self.set_missed_block(ctx, address, bit.index, true);
            }
        }
        for entry in &genesis.prev_state_validator_powers {
            self.set_prev_state_power(ctx, &entry.address, entry.power);
        }
        self.set_prev_state_total_power(ctx, genesis.prev_state_total_power);
        if let Some(proposer) = &genesis.previous_proposer {
            self.set_previous_proposer(ctx, proposer);
        }

        let bonded = genesis.bonded_tokens()?;
        let staked_pool = self.get_staked_pool_balance(ctx);
        if staked_pool.is_zero() {
            if !bonded.is_zero() {
                self.ledger.mint_coins(ctx, STAKED_POOL_NAME, bonded)?;
            }
        } else if staked_pool != bonded {
            return Err(PosError::InvalidParams(format!(
                "the staked pool holds {} but genesis validators bond {}",
                staked_pool, bonded
            )));
        }
        let dao_pool = self.get_dao_pool_balance(ctx);
        if dao_pool.is_zero() {
            self.mint_to_module(ctx, genesis.dao_balance, DAO_POOL_NAME)?;
        } else if dao_pool != genesis.dao_balance {
            warn!(
                "the dao pool holds {}, genesis expects {}",
                dao_pool, genesis.dao_balance
            );
        }

        let updates = self.update_validator_set(ctx);
        info!(
            "pos genesis loaded: {} validators, {} bonded, {} in the initial set",
            genesis.validators.len(),
            bonded,
            updates.len()
        );
        Ok(updates)
    }

    /// Reads back the state of the module
    pub fn export_genesis(&self, ctx: &BlockContext) -> Result<GenesisState, PosError> {
        let mut genesis = GenesisState::new(self.config.params.clone());
        genesis.validators = self.get_all_validators(ctx);
        let signing_infos: BTreeMap<_, _> = self
            .get_all_signing_infos(ctx)
            .into_iter()
            .map(|info| (info.address, info))
            .collect();
        for address in signing_infos.keys() {
            let missed: Vec<MissedBlock> = self
                .get_missed_blocks(ctx, address)
                .into_iter()
                .map(|index| MissedBlock {
                    index,
                    missed: true,
                })
                .collect();
            if !missed.is_empty() {
                genesis.missed_blocks.insert(*address, missed);
            }
        }
        genesis.signing_infos = signing_infos;
        genesis.prev_state_validator_powers = self
            .get_prev_state_powers(ctx)
            .into_iter()
            .map(|(address, power)| ValidatorPower { address, power })
            .collect();
        genesis.prev_state_total_power = self.get_prev_state_total_power(ctx);
        genesis.previous_proposer = self.get_previous_proposer(ctx);
        genesis.dao_balance = self.get_dao_pool_balance(ctx);
        Ok(genesis)
    }
}
