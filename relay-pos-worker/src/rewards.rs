// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Relay rewards and block rewards

use crate::keeper::PosKeeper;
use crate::keys::{address_suffix, award_key, previous_proposer_key};
use relay_db_exports::{
    BlockContext, ADDRESS_DESER_ERROR, AWARD_DESER_ERROR, AWARD_SER_ERROR,
    AWARD_VALIDATOR_PREFIX, CRUD_ERROR,
};
use relay_ledger_exports::{DAO_POOL_NAME, FEE_COLLECTOR_NAME};
use relay_models::{Address, AddressDeserializer, Amount, Event};
use relay_pos_exports::events::{
    ATTRIBUTE_ADDRESS, ATTRIBUTE_AMOUNT, ATTRIBUTE_RECIPIENT, EVENT_DAO_ALLOCATION,
    EVENT_PROPOSER_REWARD, EVENT_RELAY_REWARD,
};
use relay_pos_exports::{PosError, Validator};
use relay_serialization::deserialize_all;
use tracing::{debug, error, info, warn};

/// `amount * numerator / denominator`, floored
fn mul_div(amount: Amount, numerator: u64, denominator: u64) -> Amount {
    if denominator == 0 {
        return Amount::zero();
    }
    let res = (amount.to_raw() as u128) * (numerator as u128) / (denominator as u128);
    Amount::from_raw(u64::try_from(res).unwrap_or(u64::MAX))
}

impl PosKeeper {
    /// Share of a relay reward kept by the node, floored.
    /// The remainder goes to the fee collector.
    pub fn node_cut_of_reward(&self, reward: Amount) -> Amount {
        let params = &self.config.params;
        let node_percentage = 100u64
            .saturating_sub(params.dao_allocation)
            .saturating_sub(params.proposer_allocation);
        mul_div(reward, node_percentage, 100)
    }

    /// Mints the reward of `relays` served relays for `address`.
    /// Returns the share paid to the node and its delegators.
    pub fn reward_for_relays(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        relays: u64,
    ) -> Amount {
        let coins = Amount::from_raw(relays)
            .saturating_mul_u64(self.config.params.relays_to_tokens_multiplier);
        self.reward_for_tokens(ctx, address, coins)
    }

    pub(crate) fn reward_for_tokens(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        coins: Amount,
    ) -> Amount {
        if coins.is_zero() {
            return Amount::zero();
        }
        let validator = match self.get_validator(ctx, address) {
            Some(validator) => validator,
            None => {
                warn!("relay reward of unknown validator {} dropped", address);
                return Amount::zero();
            }
        };
        ctx.branch();
        match self.distribute_relay_reward(ctx, &validator, coins) {
            Ok(node_cut) => {
                ctx.commit_branch();
                node_cut
            }
            Err(err) => {
                ctx.discard_branch();
                self.clear_cache();
                error!("cannot pay the relay reward of {}: {}", address, err);
                Amount::zero()
            }
        }
    }

    fn distribute_relay_reward(
        &self,
        ctx: &mut BlockContext,
        validator: &Validator,
        coins: Amount,
    ) -> Result<Amount, PosError> {
        let node_cut = self.node_cut_of_reward(coins);
        let fee_cut = coins.saturating_sub(node_cut);
        self.mint_to_module(ctx, fee_cut, FEE_COLLECTOR_NAME)?;

        let mut remaining = node_cut;
        if self
            .config
            .upgrade_heights
            .is_reward_delegators(ctx.height())
        {
            if let Some(delegators) = &validator.reward_delegators {
                for (delegator, share) in delegators {
                    let cut = mul_div(node_cut, *share, 100);
                    self.mint(ctx, cut, delegator)?;
                    remaining = remaining.saturating_sub(cut);
                }
            }
        }
        let recipient = self.payout_address(ctx, validator);
        self.mint(ctx, remaining, &recipient)?;
        ctx.emit_event(
            Event::new(EVENT_RELAY_REWARD)
                .with_attribute(ATTRIBUTE_ADDRESS, validator.address)
                .with_attribute(ATTRIBUTE_AMOUNT, node_cut)
                .with_attribute(ATTRIBUTE_RECIPIENT, recipient),
        );
        debug!(
            "relay reward of {}: {} to the node, {} to the fee collector",
            validator.address, node_cut, fee_cut
        );
        Ok(node_cut)
    }

    /// Accumulates the tokens earned by `relays` served relays, paid at the next `begin_block`
    pub fn award_relays(&self, ctx: &mut BlockContext, address: &Address, relays: u64) {
        let coins = relays.saturating_mul(self.config.params.relays_to_tokens_multiplier);
        let key = award_key(address);
        let current = ctx
            .store()
            .get(&key)
            .map(|bytes| self.decode_u64(&bytes, AWARD_DESER_ERROR))
            .unwrap_or(0);
        let bytes = self.encode_u64(current.saturating_add(coins), AWARD_SER_ERROR);
        ctx.store_mut().put(key, bytes);
    }

    /// Pending relay awards, by address
    pub fn get_relay_awards(&self, ctx: &BlockContext) -> Vec<(Address, Amount)> {
        ctx.store()
            .prefix_iter(&[AWARD_VALIDATOR_PREFIX])
            .into_iter()
            .map(|(key, bytes)| {
                let address = address_suffix(&key).expect(CRUD_ERROR);
                let tokens = self.decode_u64(&bytes, AWARD_DESER_ERROR);
                (address, Amount::from_raw(tokens))
            })
            .collect()
    }

    /// Pays and clears every pending relay award.
    /// An award whose payout fails stays pending for the next block.
    pub(crate) fn pay_relay_awards(&self, ctx: &mut BlockContext) {
        for (address, tokens) in self.get_relay_awards(ctx) {
            let validator = match self.get_validator(ctx, &address) {
                Some(validator) if !tokens.is_zero() => validator,
                Some(_) => {
                    ctx.store_mut().delete(award_key(&address));
                    continue;
                }
                None => {
                    warn!("relay award of unknown validator {} dropped", address);
                    ctx.store_mut().delete(award_key(&address));
                    continue;
                }
            };
            ctx.branch();
            ctx.store_mut().delete(award_key(&address));
            match self.distribute_relay_reward(ctx, &validator, tokens) {
                Ok(_) => ctx.commit_branch(),
                Err(err) => {
                    ctx.discard_branch();
                    self.clear_cache();
                    error!(
                        "cannot pay the relay award of {}, kept for the next block: {}",
                        address, err
                    );
                }
            }
        }
    }

    /// Proposer of the last block
    pub fn get_previous_proposer(&self, ctx: &BlockContext) -> Option<Address> {
        ctx.store()
            .get(&previous_proposer_key())
            .map(|bytes| {
                deserialize_all(&AddressDeserializer::new(), &bytes).expect(ADDRESS_DESER_ERROR)
            })
    }

    pub(crate) fn set_previous_proposer(&self, ctx: &mut BlockContext, address: &Address) {
        ctx.store_mut()
            .put(previous_proposer_key(), address.to_bytes().to_vec());
    }

    /// Splits the fees collected during the last block between the DAO and its proposer
    pub fn block_reward(&self, ctx: &mut BlockContext, proposer: &Address) {
        ctx.branch();
        match self.distribute_block_reward(ctx, proposer) {
            Ok(()) => ctx.commit_branch(),
            Err(err) => {
                ctx.discard_branch();
                self.clear_cache();
                error!("cannot pay the block reward of {}: {}", proposer, err);
            }
        }
    }

    fn distribute_block_reward(
        &self,
        ctx: &mut BlockContext,
        proposer: &Address,
    ) -> Result<(), PosError> {
        let params = &self.config.params;
        let fee_collector = self.ledger.get_module_address(FEE_COLLECTOR_NAME);
        let collected = self.ledger.get_coins(ctx, &fee_collector);
        if collected.is_zero() {
            debug!("no fees to distribute at height {}", ctx.height());
            return Ok(());
        }
        let allocations = params.dao_allocation.saturating_add(params.proposer_allocation);
        let dao_cut = mul_div(collected, params.dao_allocation, allocations);
        let proposer_cut = collected.saturating_sub(dao_cut);
        let recipient = match self.get_validator_by_consensus_address(ctx, proposer) {
            Some(validator) => self.payout_address(ctx, &validator),
            None => *proposer,
        };
        if !dao_cut.is_zero() {
            self.ledger
                .send_coins_from_module_to_module(ctx, FEE_COLLECTOR_NAME, DAO_POOL_NAME, dao_cut)?;
        }
        if !proposer_cut.is_zero() {
            self.ledger.send_coins_from_module_to_account(
                ctx,
                FEE_COLLECTOR_NAME,
                &recipient,
                proposer_cut,
            )?;
        }
        ctx.emit_event(
            Event::new(EVENT_PROPOSER_REWARD)
                .with_attribute(ATTRIBUTE_ADDRESS, proposer)
                .with_attribute(ATTRIBUTE_RECIPIENT, recipient)
                .with_attribute(ATTRIBUTE_AMOUNT, proposer_cut),
        );
        ctx.emit_event(Event::new(EVENT_DAO_ALLOCATION).with_attribute(ATTRIBUTE_AMOUNT, dao_cut));
        info!(
            "block reward of {}: {} to {}, {} to the dao",
            proposer, proposer_cut, recipient, dao_cut
        );
        Ok(())
    }
}
