// Copyright (c) 2022 MASSA LABS <info@massa.net>

use super::tools::{stake_tx, unjail_tx, BlockOutcome, TestUniverse};
use assert_matches::assert_matches;
use relay_ledger_exports::STAKED_POOL_NAME;
use relay_models::{Address, Amount};
use relay_pos_exports::events::{
    ATTRIBUTE_JAILED, ATTRIBUTE_REASON, EVENT_LIVENESS, EVENT_SLASH, EVENT_UNJAIL, EVENT_UNSTAKE,
    REASON_MAX_JAILED_BLOCKS, REASON_MINIMUM_STAKE, REASON_MISSING_SIGNATURE,
};
use relay_pos_exports::test_exports::{address_of, test_pos_config};
use relay_pos_exports::{BeginBlockRequest, PosError, ValidatorStatus, ValidatorUpdate, VoteInfo};
use relay_signature::KeyPair;
use relay_time::RelayTime;

fn vote(address: Address, power: u64, signed: bool) -> BeginBlockRequest {
    BeginBlockRequest {
        votes: vec![VoteInfo {
            address,
            power,
            signed,
        }],
        evidence: Vec::new(),
    }
}

/// Stakes `value` at height 1 then misses every block from height 2 until
/// the height of the downtime slash (12 with a window of 10 blocks)
fn miss_until_slashed(value: u64) -> (TestUniverse, KeyPair, BlockOutcome) {
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe = TestUniverse::new(test_pos_config(), &[(address, Amount::from_raw(value))]);
    let power = value / 1_000_000;
    universe.run_txs(&[stake_tx(&keypair, value)]);

    for height in 2..=11 {
        let outcome = universe.run_block(&vote(address, power, false), &[]);
        assert_eq!(outcome.events_of(EVENT_LIVENESS).len(), 1);
        assert!(outcome.events_of(EVENT_SLASH).is_empty());
        let info = universe
            .keeper
            .get_signing_info(&universe.view(), &address)
            .unwrap();
        assert_eq!(info.missed_blocks_counter, height - 1);
        assert_eq!(
            universe.keeper.get_missed_blocks(&universe.view(), &address).len() as u64,
            height - 1
        );
    }
    assert!(!universe
        .keeper
        .get_validator(&universe.view(), &address)
        .unwrap()
        .jailed);

    let outcome = universe.run_block(&vote(address, power, false), &[]);
    assert_eq!(universe.height, 12);
    (universe, keypair, outcome)
}

#[test]
fn test_downtime_slash_and_jail() {
    let (mut universe, keypair, outcome) = miss_until_slashed(2_000_000);
    let address = address_of(&keypair);
    let slash_events = outcome.events_of(EVENT_SLASH);
    assert_eq!(slash_events.len(), 1);
    assert_eq!(
        slash_events[0].get(ATTRIBUTE_REASON),
        Some(REASON_MISSING_SIGNATURE)
    );
    assert_eq!(slash_events[0].get(ATTRIBUTE_JAILED), Some("true"));
    assert_eq!(
        outcome.updates,
        vec![ValidatorUpdate {
            public_key: keypair.get_public_key(),
            power: 0
        }]
    );

    let view = universe.view();
    let validator = universe.keeper.get_validator(&view, &address).unwrap();
    assert!(validator.jailed);
    assert_eq!(validator.status, ValidatorStatus::Staked);
    assert_eq!(validator.staked_tokens, Amount::from_raw(1_980_000));
    assert_eq!(universe.module_balance(STAKED_POOL_NAME), Amount::from_raw(1_980_000));
    let info = universe.keeper.get_signing_info(&view, &address).unwrap();
    assert_eq!(info.missed_blocks_counter, 0);
    assert_eq!(info.index_offset, 0);
    assert_eq!(
        info.jailed_until,
        universe.time.saturating_add(RelayTime::from_secs(600))
    );
    assert!(universe.keeper.get_missed_blocks(&view, &address).is_empty());
    let jailed_until = info.jailed_until;

    // still jailed
    let outcome = universe.run_txs(&[unjail_tx(&keypair)]);
    assert_matches!(outcome.tx_results[0], Err(PosError::ValidatorStillJailed(_)));

    // jail time over
    universe.advance_time(jailed_until.saturating_sub(universe.time));
    let outcome = universe.run_txs(&[unjail_tx(&keypair)]);
    assert_matches!(outcome.tx_results[0], Ok(()));
    assert_eq!(outcome.events_of(EVENT_UNJAIL).len(), 1);
    assert_eq!(
        outcome.updates,
        vec![ValidatorUpdate {
            public_key: keypair.get_public_key(),
            power: 1
        }]
    );
    let view = universe.view();
    assert!(!universe.keeper.get_validator(&view, &address).unwrap().jailed);
    let info = universe.keeper.get_signing_info(&view, &address).unwrap();
    assert_eq!(info.start_height, universe.height);
    assert_eq!(info.jailed_blocks_counter, 0);

    // nothing left to unjail
    let outcome = universe.run_txs(&[unjail_tx(&keypair)]);
    assert_matches!(outcome.tx_results[0], Err(PosError::ValidatorNotJailed(_)));
}

#[test]
fn test_downtime_slash_below_minimum_stake_force_unstakes() {
    let (universe, keypair, outcome) = miss_until_slashed(1_000_000);
    let address = address_of(&keypair);
    let slash_events = outcome.events_of(EVENT_SLASH);
    assert_eq!(slash_events.len(), 1);
    assert_eq!(slash_events[0].get(ATTRIBUTE_JAILED), Some("false"));
    let unstake_events = outcome.events_of(EVENT_UNSTAKE);
    assert_eq!(unstake_events.len(), 1);
    assert_eq!(
        unstake_events[0].get(ATTRIBUTE_REASON),
        Some(REASON_MINIMUM_STAKE)
    );
    assert_eq!(
        outcome.updates,
        vec![ValidatorUpdate {
            public_key: keypair.get_public_key(),
            power: 0
        }]
    );

    let validator = universe.keeper.get_validator(&universe.view(), &address).unwrap();
    assert_eq!(validator.status, ValidatorStatus::Unstaked);
    assert!(!validator.jailed);
    assert_eq!(validator.staked_tokens, Amount::zero());
    assert_eq!(universe.module_balance(STAKED_POOL_NAME), Amount::zero());
    assert_eq!(universe.balance(&address), Amount::zero());
}

#[test]
fn test_signing_again_lowers_the_counter() {
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe =
        TestUniverse::new(test_pos_config(), &[(address, Amount::from_raw(1_000_000))]);
    universe.run_txs(&[stake_tx(&keypair, 1_000_000)]);
    for _ in 0..3 {
        universe.run_block(&vote(address, 1, false), &[]);
    }
    // one full window of signed blocks wipes the missed bits
    for _ in 0..10 {
        let outcome = universe.run_block(&vote(address, 1, true), &[]);
        assert!(outcome.events_of(EVENT_LIVENESS).is_empty());
    }
    let view = universe.view();
    let info = universe.keeper.get_signing_info(&view, &address).unwrap();
    assert_eq!(info.missed_blocks_counter, 0);
    assert_eq!(info.index_offset, 13);
    assert!(universe.keeper.get_missed_blocks(&view, &address).is_empty());
    assert!(!universe.keeper.get_validator(&view, &address).unwrap().jailed);
}

#[test]
fn test_votes_of_unknown_validators_are_ignored() {
    let mut universe = TestUniverse::new(test_pos_config(), &[]);
    let stranger = Address::from_module_name("stranger");
    let outcome = universe.run_block(&vote(stranger, 1, false), &[]);
    assert!(outcome.events.iter().all(|event| event.kind != EVENT_LIVENESS));
    assert!(universe
        .keeper
        .get_signing_info(&universe.view(), &stranger)
        .is_none());
}

#[test]
fn test_staying_jailed_too_long_force_unstakes() {
    let (mut universe, keypair, _) = miss_until_slashed(2_000_000);
    let address = address_of(&keypair);

    // the jail counter starts with the block after the slash
    universe.run_empty_blocks(19);
    let view = universe.view();
    let validator = universe.keeper.get_validator(&view, &address).unwrap();
    assert!(validator.jailed);
    assert_eq!(
        universe
            .keeper
            .get_signing_info(&view, &address)
            .unwrap()
            .jailed_blocks_counter,
        19
    );

    let outcome = universe.run_txs(&[]);
    let unstake_events = outcome.events_of(EVENT_UNSTAKE);
    assert_eq!(unstake_events.len(), 1);
    assert_eq!(
        unstake_events[0].get(ATTRIBUTE_REASON),
        Some(REASON_MAX_JAILED_BLOCKS)
    );
    let view = universe.view();
    let validator = universe.keeper.get_validator(&view, &address).unwrap();
    assert_eq!(validator.status, ValidatorStatus::Unstaked);
    assert!(!validator.jailed);
    assert_eq!(universe.module_balance(STAKED_POOL_NAME), Amount::zero());
    assert_eq!(
        universe
            .keeper
            .get_signing_info(&view, &address)
            .unwrap()
            .jailed_blocks_counter,
        0
    );

    // an unstaked validator is not jailed anymore
    let outcome = universe.run_txs(&[unjail_tx(&keypair)]);
    assert_matches!(outcome.tx_results[0], Err(PosError::ValidatorNotJailed(_)));
}
