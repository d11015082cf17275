// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::PosError;
use num::rational::Ratio;
use num::Zero;
use relay_models::config::{
    build_relay_settings, DEFAULT_DAO_ALLOCATION, DEFAULT_DOWNTIME_JAIL_DURATION,
    DEFAULT_MAX_CHAINS, DEFAULT_MAX_EVIDENCE_AGE, DEFAULT_MAX_JAILED_BLOCKS,
    DEFAULT_MAX_VALIDATORS, DEFAULT_MINIMUM_STAKE, DEFAULT_MIN_SIGNED_PER_WINDOW,
    DEFAULT_PROPOSER_ALLOCATION, DEFAULT_RELAYS_TO_TOKENS_MULTIPLIER,
    DEFAULT_SESSION_BLOCK_FREQUENCY, DEFAULT_SIGNED_BLOCKS_WINDOW,
    DEFAULT_SLASH_FRACTION_DOUBLE_SIGN, DEFAULT_SLASH_FRACTION_DOWNTIME, DEFAULT_STAKE_DENOM,
    DEFAULT_TX_FEE, DEFAULT_UNSTAKING_TIME, POWER_REDUCTION, VALIDATOR_CACHE_SIZE,
};
use relay_models::Amount;
use relay_time::{RelayTime, MAX_SORTABLE_TIME};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variables starting with this prefix override the configuration file
pub const POS_ENV_PREFIX: &str = "RELAY_POS";

/// Parameters of the state machine, immutable for the duration of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosParams {
    /// time between the release of a waiting validator and the payout of its stake
    pub unstaking_time: RelayTime,
    /// maximum number of validators in the consensus set
    pub max_validators: u64,
    /// denomination of the staking token
    pub stake_denom: String,
    /// minimum stake of a validator
    pub minimum_stake: Amount,
    /// length of a session, in blocks
    pub session_block_frequency: u64,
    /// evidence older than this is dropped
    pub max_evidence_age: RelayTime,
    /// size of the liveness window, in blocks
    pub signed_blocks_window: u64,
    /// minimum share of the window a validator must sign
    pub min_signed_per_window: Ratio<u64>,
    /// jail duration after downtime
    pub downtime_jail_duration: RelayTime,
    /// share of the stake burnt on double sign
    pub slash_fraction_double_sign: Ratio<u64>,
    /// share of the stake burnt on downtime
    pub slash_fraction_downtime: Ratio<u64>,
    /// tokens minted per served relay
    pub relays_to_tokens_multiplier: u64,
    /// percentage of rewards going to the DAO
    pub dao_allocation: u64,
    /// percentage of rewards going to the block proposer
    pub proposer_allocation: u64,
    /// maximum number of chains a validator can serve
    pub max_chains: u64,
    /// number of blocks a validator can stay jailed before being force unstaked
    pub max_jailed_blocks: u64,
}

impl Default for PosParams {
    fn default() -> Self {
        PosParams {
            unstaking_time: DEFAULT_UNSTAKING_TIME,
            max_validators: DEFAULT_MAX_VALIDATORS,
            stake_denom: DEFAULT_STAKE_DENOM.to_string(),
            minimum_stake: DEFAULT_MINIMUM_STAKE,
            session_block_frequency: DEFAULT_SESSION_BLOCK_FREQUENCY,
            max_evidence_age: DEFAULT_MAX_EVIDENCE_AGE,
            signed_blocks_window: DEFAULT_SIGNED_BLOCKS_WINDOW,
            min_signed_per_window: DEFAULT_MIN_SIGNED_PER_WINDOW,
            downtime_jail_duration: DEFAULT_DOWNTIME_JAIL_DURATION,
            slash_fraction_double_sign: DEFAULT_SLASH_FRACTION_DOUBLE_SIGN,
            slash_fraction_downtime: DEFAULT_SLASH_FRACTION_DOWNTIME,
            relays_to_tokens_multiplier: DEFAULT_RELAYS_TO_TOKENS_MULTIPLIER,
            dao_allocation: DEFAULT_DAO_ALLOCATION,
            proposer_allocation: DEFAULT_PROPOSER_ALLOCATION,
            max_chains: DEFAULT_MAX_CHAINS,
            max_jailed_blocks: DEFAULT_MAX_JAILED_BLOCKS,
        }
    }
}

fn check_fraction(name: &str, fraction: &Ratio<u64>) -> Result<(), PosError> {
    if fraction.denom().is_zero() || fraction.numer() > fraction.denom() {
        return Err(PosError::InvalidParams(format!(
            "{} must be a fraction in [0, 1], got {}/{}",
            name,
            fraction.numer(),
            fraction.denom()
        )));
    }
    Ok(())
}

impl PosParams {
    /// Checks the consistency of the parameters.
    ///
    /// `power_reduction` is the number of tokens per unit of consensus power:
    /// the minimum stake must be worth at least one unit.
    pub fn validate(&self, power_reduction: u64) -> Result<(), PosError> {
        let allocations = self
            .dao_allocation
            .checked_add(self.proposer_allocation)
            .unwrap_or(u64::MAX);
        if allocations > 100 {
            return Err(PosError::InvalidParams(format!(
                "dao_allocation + proposer_allocation must be at most 100, got {}",
                allocations
            )));
        }
        if self.unstaking_time > MAX_SORTABLE_TIME {
            return Err(PosError::InvalidParams(format!(
                "unstaking_time must be at most {} ms",
                MAX_SORTABLE_TIME.to_millis()
            )));
        }
        if self.session_block_frequency < 2 {
            return Err(PosError::InvalidParams(
                "session_block_frequency must be at least 2".to_string(),
            ));
        }
        if self.max_validators == 0 {
            return Err(PosError::InvalidParams(
                "max_validators must be positive".to_string(),
            ));
        }
        if self.signed_blocks_window == 0 {
            return Err(PosError::InvalidParams(
                "signed_blocks_window must be positive".to_string(),
            ));
        }
        check_fraction("min_signed_per_window", &self.min_signed_per_window)?;
        check_fraction("slash_fraction_double_sign", &self.slash_fraction_double_sign)?;
        check_fraction("slash_fraction_downtime", &self.slash_fraction_downtime)?;
        if self.stake_denom.is_empty() {
            return Err(PosError::InvalidParams(
                "stake_denom must not be empty".to_string(),
            ));
        }
        if self.max_chains == 0 {
            return Err(PosError::InvalidParams(
                "max_chains must be positive".to_string(),
            ));
        }
        if self.max_jailed_blocks == 0 {
            return Err(PosError::InvalidParams(
                "max_jailed_blocks must be positive".to_string(),
            ));
        }
        if self.minimum_stake.to_raw() < power_reduction {
            return Err(PosError::InvalidParams(format!(
                "minimum_stake must be at least {} so that staked validators have power",
                power_reduction
            )));
        }
        Ok(())
    }

    /// Maximum number of missed blocks in the window before downtime:
    /// `window - round(min_signed_per_window * window)`
    pub fn max_missed_blocks(&self) -> u64 {
        let window = Ratio::from_integer(self.signed_blocks_window);
        let min_signed = (self.min_signed_per_window * window)
            .round()
            .to_integer();
        self.signed_blocks_window.saturating_sub(min_signed)
    }
}

/// Heights from which protocol upgrades are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UpgradeHeights {
    /// output addresses are honored from this height
    pub non_custodial_height: u64,
    /// staked validators can be edited from this height
    pub edit_stake_height: u64,
    /// reward delegators are accepted from this height
    pub reward_delegators_height: u64,
}

impl UpgradeHeights {
    /// True if output addresses are honored at `height`
    pub fn is_non_custodial(&self, height: u64) -> bool {
        height >= self.non_custodial_height
    }

    /// True if staked validators can be edited at `height`
    pub fn is_edit_stake(&self, height: u64) -> bool {
        height >= self.edit_stake_height
    }

    /// True if reward delegators are accepted at `height`
    pub fn is_reward_delegators(&self, height: u64) -> bool {
        height >= self.reward_delegators_height
    }
}

/// PoS module configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosConfig {
    /// state machine parameters
    pub params: PosParams,
    /// protocol upgrade heights
    pub upgrade_heights: UpgradeHeights,
    /// tokens per unit of consensus power
    pub power_reduction: u64,
    /// number of validators kept in the read cache
    pub validator_cache_size: u32,
    /// flat fee paid by every transaction to the fee collector
    pub tx_fee: Amount,
}

impl Default for PosConfig {
    fn default() -> Self {
        PosConfig {
            params: PosParams::default(),
            upgrade_heights: UpgradeHeights::default(),
            power_reduction: POWER_REDUCTION,
            validator_cache_size: VALIDATOR_CACHE_SIZE,
            tx_fee: DEFAULT_TX_FEE,
        }
    }
}

impl PosConfig {
    /// Reads the configuration from a file, overridden by `RELAY_POS`-prefixed
    /// environment variables, and validates it
    pub fn load(path: &Path) -> Result<PosConfig, PosError> {
        let config: PosConfig = build_relay_settings(path, POS_ENV_PREFIX)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the consistency of the configuration
    pub fn validate(&self) -> Result<(), PosError> {
        if self.power_reduction == 0 {
            return Err(PosError::InvalidParams(
                "power_reduction must be positive".to_string(),
            ));
        }
        if self.validator_cache_size == 0 {
            return Err(PosError::InvalidParams(
                "validator_cache_size must be positive".to_string(),
            ));
        }
        self.params.validate(self.power_reduction)
    }

    /// Consensus power of an amount of tokens
    pub fn tokens_to_consensus_power(&self, tokens: Amount) -> u64 {
        tokens.to_raw() / self.power_reduction
    }

    /// Amount of tokens worth `power` units of consensus power
    pub fn tokens_from_consensus_power(&self, power: u64) -> Amount {
        Amount::from_raw(power).saturating_mul_u64(self.power_reduction)
    }
}
