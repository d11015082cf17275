// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Validator state machine: `Unstaked -> Staked -> Unstaking -> Unstaked`,
//! plus jailing and forced exits

use crate::keeper::PosKeeper;
use relay_db_exports::BlockContext;
use relay_models::{Address, Amount, Event};
use relay_pos_exports::events::{
    ATTRIBUTE_ADDRESS, ATTRIBUTE_AMOUNT, ATTRIBUTE_COMPLETION_TIME, ATTRIBUTE_HEIGHT,
    ATTRIBUTE_REASON, ATTRIBUTE_RECIPIENT, EVENT_BEGIN_UNSTAKE, EVENT_COMPLETE_UNSTAKING,
    EVENT_CREATE_VALIDATOR, EVENT_STAKE, EVENT_UNJAIL, EVENT_UNSTAKE,
};
use relay_pos_exports::{MsgStake, PosError, Validator, ValidatorStatus};
use relay_time::{RelayTime, MAX_SORTABLE_TIME};
use tracing::{debug, info, warn};

impl PosKeeper {
    /// Creates the record of a new validator, unstaked and without stake
    pub(crate) fn register_validator(&self, ctx: &mut BlockContext, validator: &Validator) {
        self.set_validator_keys(ctx, &validator.public_key);
        self.set_validator(ctx, validator);
        ctx.emit_event(
            Event::new(EVENT_CREATE_VALIDATOR).with_attribute(ATTRIBUTE_ADDRESS, validator.address),
        );
        self.notify(|hooks| hooks.after_validator_registered(ctx, &validator.address));
        info!("registered validator {}", validator.address);
    }

    fn check_minimum_stake(&self, address: &Address, value: Amount) -> Result<(), PosError> {
        let minimum = self.config.params.minimum_stake;
        if value < minimum {
            return Err(PosError::MinimumStake(format!(
                "{} stakes {}, the minimum is {}",
                address, value, minimum
            )));
        }
        Ok(())
    }

    /// Stakes a new or unstaked validator, or edits a staked one.
    ///
    /// `signer` pays the stake increase. It must be the operator, or the
    /// output address once outputs are honored.
    pub fn handle_stake(
        &self,
        ctx: &mut BlockContext,
        msg: &MsgStake,
        signer: &Address,
    ) -> Result<(), PosError> {
        let params = &self.config.params;
        let height = ctx.height();
        let address = Address::from_public_key(&msg.public_key);
        if msg.chains.len() as u64 > params.max_chains {
            return Err(PosError::TooManyChains(params.max_chains));
        }
        if msg.reward_delegators.is_some()
            && !self.config.upgrade_heights.is_reward_delegators(height)
        {
            return Err(PosError::DisallowedRewardDelegatorEdit(format!(
                "reward delegators are not accepted at height {}",
                height
            )));
        }
        let output_address = if self.is_non_custodial(ctx) {
            msg.output_address
        } else {
            None
        };
        let mut chains = msg.chains.clone();
        chains.sort();
        chains.dedup();

        let (mut validator, stake_increase) = match self.get_validator(ctx, &address) {
            None => {
                if *signer != address && output_address.as_ref() != Some(signer) {
                    return Err(PosError::UnauthorizedSigner(format!(
                        "{} cannot stake validator {}",
                        signer, address
                    )));
                }
                self.check_minimum_stake(&address, msg.value)?;
                let validator = Validator::new(
                    msg.public_key,
                    chains,
                    msg.service_url.clone(),
                    output_address,
                    msg.reward_delegators.clone(),
                );
                self.register_validator(ctx, &validator);
                (validator, msg.value)
            }
            Some(mut validator) => {
                if validator.is_unstaking() {
                    return Err(PosError::ValidatorUnstaking(address));
                }
                if validator.jailed {
                    return Err(PosError::ValidatorJailed(address));
                }
                if self.is_waiting_validator(ctx, &address) {
                    return Err(PosError::ValidatorWaitingToUnstake(address));
                }
                let current_output = validator.output_address;
                // a first output address can only be set by the operator
                if !self.is_authorized_signer(ctx, &validator, signer) {
                    return Err(PosError::UnauthorizedSigner(format!(
                        "{} cannot stake validator {}",
                        signer, address
                    )));
                }
                if let (Some(current), Some(new)) = (current_output, output_address) {
                    if current != new && *signer != current {
                        return Err(PosError::DisallowedOutputAddressEdit(format!(
                            "only {} can change the output address of {}",
                            current, address
                        )));
                    }
                }
                if let Some(delegators) = &msg.reward_delegators {
                    if validator.reward_delegators.as_ref() != Some(delegators) {
                        if let Some(current) = current_output {
                            if *signer != current {
                                return Err(PosError::DisallowedRewardDelegatorEdit(format!(
                                    "only {} can change the reward delegators of {}",
                                    current, address
                                )));
                            }
                        }
                    }
                }
                let stake_increase = if validator.is_staked() {
                    if !self.config.upgrade_heights.is_edit_stake(height) {
                        return Err(PosError::ValidatorStaked(address));
                    }
                    msg.value
                        .checked_sub(validator.staked_tokens)
                        .ok_or_else(|| {
                            PosError::InvalidStake(format!(
                                "{} cannot lower its stake from {} to {}",
                                address, validator.staked_tokens, msg.value
                            ))
                        })?
                } else {
                    self.check_minimum_stake(&address, msg.value)?;
                    msg.value
                };
                validator.chains = chains;
                validator.service_url = msg.service_url.clone();
                if output_address.is_some() {
                    validator.output_address = output_address;
                }
                if msg.reward_delegators.is_some() {
                    validator.reward_delegators = msg.reward_delegators.clone();
                }
                (validator, stake_increase)
            }
        };

        self.notify(|hooks| hooks.before_validator_staked(ctx, &address));
        self.coins_from_unstaked_to_staked(ctx, signer, stake_increase)?;
        validator.staked_tokens = msg.value;
        validator.status = ValidatorStatus::Staked;
        validator.unstaking_completion_time = RelayTime::from_millis(0);
        self.set_validator(ctx, &validator);
        self.ensure_signing_info(ctx, &address);
        ctx.emit_event(
            Event::new(EVENT_STAKE)
                .with_attribute(ATTRIBUTE_ADDRESS, address)
                .with_attribute(ATTRIBUTE_AMOUNT, msg.value),
        );
        self.notify(|hooks| hooks.after_validator_staked(ctx, &address));
        info!(
            "validator {} staked {} (+{}) at height {}",
            address, msg.value, stake_increase, height
        );
        Ok(())
    }

    /// Queues a staked validator for unstaking at the next session boundary
    pub fn begin_unstake(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        signer: &Address,
    ) -> Result<(), PosError> {
        let validator = self
            .get_validator(ctx, address)
            .ok_or(PosError::ValidatorNotFound(*address))?;
        if validator.is_unstaking() {
            return Err(PosError::ValidatorUnstaking(*address));
        }
        if !validator.is_staked() {
            return Err(PosError::ValidatorNotStaked(*address));
        }
        if !self.is_authorized_signer(ctx, &validator, signer) {
            return Err(PosError::UnauthorizedSigner(format!(
                "{} cannot unstake validator {}",
                signer, address
            )));
        }
        self.check_minimum_stake(address, validator.staked_tokens)?;
        if self.is_waiting_validator(ctx, address) {
            return Err(PosError::ValidatorWaitingToUnstake(*address));
        }
        self.notify(|hooks| hooks.before_validator_begin_unstaking(ctx, address));
        self.set_waiting_validator(ctx, address);
        ctx.emit_event(Event::new(EVENT_BEGIN_UNSTAKE).with_attribute(ATTRIBUTE_ADDRESS, address));
        self.notify(|hooks| hooks.after_validator_begin_unstaking(ctx, address));
        info!("validator {} waits for the next session to unstake", address);
        Ok(())
    }

    /// Moves every waiting validator to `Unstaking`
    pub fn release_waiting_validators(&self, ctx: &mut BlockContext) {
        let unstaking_time = self.config.params.unstaking_time;
        for address in self.get_waiting_validators(ctx) {
            self.delete_waiting_validator(ctx, &address);
            let mut validator = match self.get_validator(ctx, &address) {
                Some(validator) if validator.is_staked() => validator,
                Some(_) => {
                    warn!("waiting validator {} is no longer staked, skipped", address);
                    continue;
                }
                None => {
                    warn!("waiting validator {} not found, skipped", address);
                    continue;
                }
            };
            let completion_time = ctx
                .block_time()
                .saturating_add(unstaking_time)
                .min(MAX_SORTABLE_TIME);
            validator.status = ValidatorStatus::Unstaking;
            validator.unstaking_completion_time = completion_time;
            self.set_validator(ctx, &validator);
            ctx.emit_event(
                Event::new(EVENT_UNSTAKE)
                    .with_attribute(ATTRIBUTE_ADDRESS, address)
                    .with_attribute(ATTRIBUTE_COMPLETION_TIME, completion_time.to_millis()),
            );
            info!(
                "validator {} is unstaking until {}",
                address,
                completion_time.format_instant()
            );
        }
    }

    /// Pays back every validator of the unstaking queue whose completion time has passed
    pub fn unstake_mature_validators(&self, ctx: &mut BlockContext) {
        let mature = self.get_mature_unstaking(ctx, ctx.block_time());
        for address in mature.into_iter().flatten() {
            let validator = match self.get_validator(ctx, &address) {
                Some(validator) => validator,
                None => panic!(
                    "critical: validator {} of the unstaking queue is not in the store",
                    address
                ),
            };
            if !validator.is_unstaking() {
                panic!(
                    "critical: validator {} of the unstaking queue has status {:?}",
                    address, validator.status
                );
            }
            self.finish_unstake(ctx, validator);
        }
    }

    /// Sends the stake of an unstaking validator back to its payout address
    pub(crate) fn finish_unstake(&self, ctx: &mut BlockContext, mut validator: Validator) {
        let address = validator.address;
        self.notify(|hooks| hooks.before_validator_unstaked(ctx, &address));
        let recipient = self.payout_address(ctx, &validator);
        let amount = validator.staked_tokens;
        if let Err(err) = self.coins_from_staked_to_unstaked(ctx, &validator, &recipient) {
            panic!(
                "critical: the staked pool cannot pay back {} to {}: {}",
                amount, address, err
            );
        }
        validator.staked_tokens = Amount::zero();
        validator.status = ValidatorStatus::Unstaked;
        validator.jailed = false;
        validator.unstaking_completion_time = RelayTime::from_millis(0);
        self.set_validator(ctx, &validator);
        ctx.emit_event(
            Event::new(EVENT_COMPLETE_UNSTAKING)
                .with_attribute(ATTRIBUTE_ADDRESS, address)
                .with_attribute(ATTRIBUTE_AMOUNT, amount)
                .with_attribute(ATTRIBUTE_RECIPIENT, recipient),
        );
        self.notify(|hooks| hooks.after_validator_unstaked(ctx, &address));
        info!("validator {} unstaked, {} sent to {}", address, amount, recipient);
    }

    /// Burns the remaining stake of a validator and unstakes it
    pub(crate) fn force_unstake_validator(
        &self,
        ctx: &mut BlockContext,
        mut validator: Validator,
        reason: &str,
    ) {
        let address = validator.address;
        if validator.is_unstaked() {
            debug!("validator {} is already unstaked", address);
            return;
        }
        self.notify(|hooks| hooks.before_validator_unstaked(ctx, &address));
        let burnt = validator.staked_tokens;
        if let Err(err) = self.burn_staked_tokens(ctx, burnt) {
            panic!(
                "critical: cannot burn the {} staked by {}: {}",
                burnt, address, err
            );
        }
        validator.staked_tokens = Amount::zero();
        validator.status = ValidatorStatus::Unstaked;
        validator.jailed = false;
        validator.unstaking_completion_time = RelayTime::from_millis(0);
        self.delete_waiting_validator(ctx, &address);
        self.set_validator(ctx, &validator);
        ctx.emit_event(
            Event::new(EVENT_UNSTAKE)
                .with_attribute(ATTRIBUTE_ADDRESS, address)
                .with_attribute(ATTRIBUTE_AMOUNT, burnt)
                .with_attribute(ATTRIBUTE_REASON, reason),
        );
        self.notify(|hooks| hooks.after_validator_unstaked(ctx, &address));
        warn!(
            "validator {} force unstaked ({}), {} burnt",
            address, reason, burnt
        );
    }

    /// Removes a validator from the consensus set without changing its status
    pub(crate) fn jail_validator(&self, ctx: &mut BlockContext, address: &Address) {
        let mut validator = match self.get_validator(ctx, address) {
            Some(validator) => validator,
            None => {
                warn!("cannot jail unknown validator {}", address);
                return;
            }
        };
        if validator.jailed || validator.is_unstaked() {
            debug!("validator {} is already jailed or unstaked", address);
            return;
        }
        validator.jailed = true;
        self.set_validator(ctx, &validator);
        self.notify(|hooks| hooks.after_validator_jailed(ctx, address));
        info!("validator {} jailed at height {}", address, ctx.height());
    }

    /// Puts a jailed validator back in the consensus set once its jail time is over
    pub fn unjail(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        signer: &Address,
    ) -> Result<(), PosError> {
        let mut validator = self
            .get_validator(ctx, address)
            .ok_or(PosError::ValidatorNotFound(*address))?;
        if !validator.jailed {
            return Err(PosError::ValidatorNotJailed(*address));
        }
        if validator.is_unstaked() {
            return Err(PosError::ValidatorNotStaked(*address));
        }
        if !self.is_authorized_signer(ctx, &validator, signer) {
            return Err(PosError::UnauthorizedSigner(format!(
                "{} cannot unjail validator {}",
                signer, address
            )));
        }
        self.check_minimum_stake(address, validator.staked_tokens)?;
        let mut info = self
            .get_signing_info(ctx, address)
            .ok_or(PosError::SigningInfoNotFound(*address))?;
        if ctx.block_time() < info.jailed_until {
            return Err(PosError::ValidatorStillJailed(format!(
                "{} is jailed until {}",
                address,
                info.jailed_until.format_instant()
            )));
        }
        validator.jailed = false;
        self.set_validator(ctx, &validator);
        info.start_height = ctx.height();
        info.index_offset = 0;
        info.missed_blocks_counter = 0;
        info.jailed_blocks_counter = 0;
        self.set_signing_info(ctx, &info);
        self.clear_missed_blocks(ctx, address);
        ctx.emit_event(
            Event::new(EVENT_UNJAIL)
                .with_attribute(ATTRIBUTE_ADDRESS, address)
                .with_attribute(ATTRIBUTE_HEIGHT, ctx.height()),
        );
        info!("validator {} unjailed", address);
        Ok(())
    }
}
