// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Stake reduction for byzantine behavior and downtime

use crate::keeper::PosKeeper;
use num::rational::Ratio;
use num::Zero;
use relay_db_exports::BlockContext;
use relay_models::config::{DOUBLE_SIGN_JAIL_END_TIME, VALIDATOR_UPDATE_DELAY};
use relay_models::{Address, Amount, Event};
use relay_pos_exports::events::{
    ATTRIBUTE_ADDRESS, ATTRIBUTE_AMOUNT, ATTRIBUTE_JAILED, ATTRIBUTE_POWER, ATTRIBUTE_REASON,
    EVENT_SLASH, REASON_DOUBLE_SIGN, REASON_MINIMUM_STAKE,
};
use relay_pos_exports::Evidence;
use tracing::{debug, info, warn};

impl PosKeeper {
    /// Burns `fraction` of the tokens backing `power` from the stake of `address`.
    ///
    /// The burnt amount is clamped to the stake. A validator left below the
    /// minimum stake is force unstaked. Invalid requests are logged and ignored.
    /// Returns the burnt amount.
    pub fn slash(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        infraction_height: u64,
        power: u64,
        fraction: Ratio<u64>,
    ) -> Amount {
        if fraction.denom().is_zero() || fraction.numer() > fraction.denom() {
            warn!(
                "slash of {} ignored: invalid fraction {}/{}",
                address,
                fraction.numer(),
                fraction.denom()
            );
            return Amount::zero();
        }
        if infraction_height > ctx.height() {
            warn!(
                "slash of {} ignored: infraction height {} is in the future (height {})",
                address,
                infraction_height,
                ctx.height()
            );
            return Amount::zero();
        }
        let mut validator = match self.get_validator(ctx, address) {
            Some(validator) if !validator.is_unstaked() => validator,
            Some(_) => {
                info!("slash of {} ignored: validator is unstaked", address);
                return Amount::zero();
            }
            None => {
                info!("slash of {} ignored: validator not found", address);
                return Amount::zero();
            }
        };

        let slash_amount = self
            .config
            .tokens_from_consensus_power(power)
            .checked_mul_ratio(fraction)
            .unwrap_or(validator.staked_tokens);
        let burnt = std::cmp::min(slash_amount, validator.staked_tokens);

        self.notify(|hooks| hooks.before_validator_slashed(ctx, address, fraction));
        validator.staked_tokens = validator.staked_tokens.saturating_sub(burnt);
        if let Err(err) = self.burn_staked_tokens(ctx, burnt) {
            panic!(
                "critical: cannot burn the {} slashed from {}: {}",
                burnt, address, err
            );
        }
        self.set_validator(ctx, &validator);
        info!(
            "validator {} slashed by {} at infraction height {}, remaining stake {}",
            address, burnt, infraction_height, validator.staked_tokens
        );
        if validator.staked_tokens < self.config.params.minimum_stake {
            self.force_unstake_validator(ctx, validator, REASON_MINIMUM_STAKE);
        }
        self.notify(|hooks| hooks.after_validator_slashed(ctx, address, fraction));
        burnt
    }

    /// Slashes and permanently jails the author of conflicting votes.
    ///
    /// Evidence older than `max_evidence_age` is dropped.
    pub fn handle_double_sign(&self, ctx: &mut BlockContext, evidence: &Evidence) {
        let params = &self.config.params;
        let address = evidence.address;
        let age = ctx.block_time().saturating_sub(evidence.time);
        if age > params.max_evidence_age {
            info!(
                "ignored double sign evidence of {} at height {}: age {} exceeds {}",
                address,
                evidence.height,
                age.to_millis(),
                params.max_evidence_age.to_millis()
            );
            return;
        }
        let validator = match self.get_validator_by_consensus_address(ctx, &address) {
            Some(validator) if !validator.is_unstaked() => validator,
            Some(_) => {
                info!("ignored double sign evidence of unstaked validator {}", address);
                return;
            }
            None => {
                info!("ignored double sign evidence of unknown validator {}", address);
                return;
            }
        };
        let mut info = match self.get_signing_info(ctx, &address) {
            Some(info) => info,
            None => {
                info!("ignored double sign evidence of {}: no signing info", address);
                return;
            }
        };
        if info.jailed_until == DOUBLE_SIGN_JAIL_END_TIME {
            debug!("validator {} was already punished for double signing", address);
            return;
        }

        warn!(
            "confirmed double sign of {} at height {}, slashing and jailing",
            address, evidence.height
        );
        let distribution_height = evidence.height.saturating_sub(VALIDATOR_UPDATE_DELAY);
        let burnt = self.slash(
            ctx,
            &validator.address,
            distribution_height,
            evidence.power,
            params.slash_fraction_double_sign,
        );
        self.jail_validator(ctx, &validator.address);
        let jailed = self
            .get_validator(ctx, &validator.address)
            .map(|validator| validator.jailed)
            .unwrap_or(false);
        info.jailed_until = DOUBLE_SIGN_JAIL_END_TIME;
        self.set_signing_info(ctx, &info);
        ctx.emit_event(
            Event::new(EVENT_SLASH)
                .with_attribute(ATTRIBUTE_ADDRESS, address)
                .with_attribute(ATTRIBUTE_POWER, evidence.power)
                .with_attribute(ATTRIBUTE_REASON, REASON_DOUBLE_SIGN)
                .with_attribute(ATTRIBUTE_JAILED, jailed)
                .with_attribute(ATTRIBUTE_AMOUNT, burnt),
        );
    }
}
