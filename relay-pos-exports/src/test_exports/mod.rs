// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Configurations and builders shared by the tests of the PoS crates

use crate::config::{PosConfig, PosParams, UpgradeHeights};
use crate::message::{MsgStake, PosMessage, SignedTx};
use crate::validator::{Validator, ValidatorStatus};
use num::rational::Ratio;
use relay_models::config::POWER_REDUCTION;
use relay_models::{Address, Amount, ChainId};
use relay_signature::KeyPair;
use relay_time::RelayTime;
use std::str::FromStr;

/// Service url accepted by the validation rules
pub const TEST_SERVICE_URL: &str = "https://a.example:443";

/// Small parameters: sessions of 4 blocks, liveness window of 10 blocks
pub fn test_pos_config() -> PosConfig {
    PosConfig {
        params: PosParams {
            unstaking_time: RelayTime::from_secs(3600),
            max_validators: 100,
            stake_denom: "urelay".to_string(),
            minimum_stake: Amount::from_raw(1_000_000),
            session_block_frequency: 4,
            max_evidence_age: RelayTime::from_secs(120),
            signed_blocks_window: 10,
            min_signed_per_window: Ratio::new(1, 2),
            downtime_jail_duration: RelayTime::from_secs(600),
            slash_fraction_double_sign: Ratio::new(1, 20),
            slash_fraction_downtime: Ratio::new(1, 100),
            relays_to_tokens_multiplier: 1000,
            dao_allocation: 10,
            proposer_allocation: 1,
            max_chains: 15,
            max_jailed_blocks: 20,
        },
        upgrade_heights: UpgradeHeights::default(),
        power_reduction: POWER_REDUCTION,
        validator_cache_size: 16,
        tx_fee: Amount::zero(),
    }
}

/// Chain served by test validators
pub fn test_chain() -> ChainId {
    ChainId::from_str("0001").expect("valid chain id")
}

/// Stake message of the validator owning `keypair`
pub fn test_stake_msg(keypair: &KeyPair, value: Amount) -> MsgStake {
    MsgStake {
        public_key: keypair.get_public_key(),
        chains: vec![test_chain()],
        value,
        service_url: TEST_SERVICE_URL.to_string(),
        output_address: None,
        reward_delegators: None,
    }
}

/// Staked validator record owned by `keypair`
pub fn test_validator_with_keypair(keypair: &KeyPair, staked_tokens: Amount) -> Validator {
    let mut validator = Validator::new(
        keypair.get_public_key(),
        vec![test_chain()],
        TEST_SERVICE_URL.to_string(),
        None,
        None,
    );
    validator.status = ValidatorStatus::Staked;
    validator.staked_tokens = staked_tokens;
    validator
}

/// Staked validator record with a fresh key
pub fn test_validator(staked_tokens: Amount) -> Validator {
    test_validator_with_keypair(&KeyPair::generate(), staked_tokens)
}

/// Address owned by `keypair`
pub fn address_of(keypair: &KeyPair) -> Address {
    Address::from_public_key(&keypair.get_public_key())
}

/// Transaction signed by `keypair` with the given fee
pub fn signed_tx(keypair: &KeyPair, msg: PosMessage, fee: Amount) -> SignedTx {
    SignedTx::new_signed(msg, fee, keypair).expect("test message serializes")
}
