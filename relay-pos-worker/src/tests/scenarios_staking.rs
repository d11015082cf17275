// Copyright (c) 2022 MASSA LABS <info@massa.net>

use super::tools::{stake_tx, unstake_tx, TestUniverse};
use assert_matches::assert_matches;
use relay_ledger_exports::{FEE_COLLECTOR_NAME, STAKED_POOL_NAME};
use relay_models::{Address, Amount};
use relay_pos_exports::events::{
    EVENT_COMPLETE_UNSTAKING, EVENT_CREATE_VALIDATOR, EVENT_STAKE, EVENT_TRANSFER, EVENT_UNSTAKE,
};
use relay_pos_exports::test_exports::{address_of, signed_tx, test_pos_config, test_stake_msg};
use relay_pos_exports::{MockPosHooks, PosError, PosMessage, ValidatorStatus, ValidatorUpdate};
use relay_signature::KeyPair;
use relay_time::MAX_SORTABLE_TIME;
use std::collections::BTreeMap;

#[test]
fn test_stake_unstake_cycle() {
    let config = test_pos_config();
    let unstaking_time = config.params.unstaking_time;
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe = TestUniverse::new(config, &[(address, Amount::from_raw(1_000_000))]);

    // block 1: stake
    let outcome = universe.run_txs(&[stake_tx(&keypair, 1_000_000)]);
    assert_matches!(outcome.tx_results[0], Ok(()));
    assert_eq!(outcome.events_of(EVENT_CREATE_VALIDATOR).len(), 1);
    assert_eq!(outcome.events_of(EVENT_STAKE).len(), 1);
    assert_eq!(
        outcome.updates,
        vec![ValidatorUpdate {
            public_key: keypair.get_public_key(),
            power: 1
        }]
    );
    let validator = universe.keeper.get_validator(&universe.view(), &address).unwrap();
    assert_eq!(validator.status, ValidatorStatus::Staked);
    assert_eq!(validator.staked_tokens, Amount::from_raw(1_000_000));
    assert_eq!(universe.module_balance(STAKED_POOL_NAME), Amount::from_raw(1_000_000));
    assert_eq!(universe.balance(&address), Amount::zero());

    // block 2: the unstake waits for the session boundary
    let outcome = universe.run_txs(&[unstake_tx(&keypair)]);
    assert_matches!(outcome.tx_results[0], Ok(()));
    assert!(outcome.updates.is_empty());
    let view = universe.view();
    assert!(universe.keeper.is_waiting_validator(&view, &address));
    assert!(universe.keeper.get_validator(&view, &address).unwrap().is_staked());

    // a second unstake is refused while waiting
    let outcome = universe.run_txs(&[unstake_tx(&keypair)]);
    assert_matches!(
        outcome.tx_results[0],
        Err(PosError::ValidatorWaitingToUnstake(_))
    );
    assert!(universe
        .keeper
        .get_validator(&universe.view(), &address)
        .unwrap()
        .is_staked());

    // block 4: released
    let outcome = universe.run_txs(&[]);
    assert_eq!(universe.height % 4, 0);
    assert_eq!(outcome.events_of(EVENT_UNSTAKE).len(), 1);
    assert_eq!(
        outcome.updates,
        vec![ValidatorUpdate {
            public_key: keypair.get_public_key(),
            power: 0
        }]
    );
    let view = universe.view();
    let validator = universe.keeper.get_validator(&view, &address).unwrap();
    assert_eq!(validator.status, ValidatorStatus::Unstaking);
    assert_eq!(
        validator.unstaking_completion_time,
        universe.time.saturating_add(unstaking_time)
    );
    assert!(!universe.keeper.is_waiting_validator(&view, &address));
    assert!(universe.keeper.get_staked_validators(&view).is_empty());
    let completion_time = validator.unstaking_completion_time;

    // not mature yet
    universe.run_empty_blocks(1);
    assert!(universe
        .keeper
        .get_validator(&universe.view(), &address)
        .unwrap()
        .is_unstaking());

    // the block at the completion time pays back the stake
    let remaining = completion_time
        .saturating_sub(universe.time)
        .saturating_sub(super::tools::BLOCK_TIME);
    universe.advance_time(remaining);
    let outcome = universe.run_txs(&[]);
    assert_eq!(universe.time, completion_time);
    assert_eq!(outcome.events_of(EVENT_COMPLETE_UNSTAKING).len(), 1);
    let validator = universe.keeper.get_validator(&universe.view(), &address).unwrap();
    assert_eq!(validator.status, ValidatorStatus::Unstaked);
    assert_eq!(validator.staked_tokens, Amount::zero());
    assert_eq!(universe.module_balance(STAKED_POOL_NAME), Amount::zero());
    assert_eq!(universe.balance(&address), Amount::from_raw(1_000_000));
    assert!(universe
        .keeper
        .get_unstaking_queue(&universe.view())
        .is_empty());

    // staking again restores the validator and keeps its signing info
    let outcome = universe.run_txs(&[stake_tx(&keypair, 1_000_000)]);
    assert_matches!(outcome.tx_results[0], Ok(()));
    assert!(outcome.events_of(EVENT_CREATE_VALIDATOR).is_empty());
    let view = universe.view();
    let validator = universe.keeper.get_validator(&view, &address).unwrap();
    assert_eq!(validator.status, ValidatorStatus::Staked);
    assert_eq!(validator.staked_tokens, Amount::from_raw(1_000_000));
    assert_eq!(
        universe
            .keeper
            .get_signing_info(&view, &address)
            .unwrap()
            .start_height,
        1
    );
}

#[test]
fn test_minimum_stake_boundary() {
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe =
        TestUniverse::new(test_pos_config(), &[(address, Amount::from_raw(2_000_000))]);
    let outcome = universe.run_txs(&[stake_tx(&keypair, 999_999), stake_tx(&keypair, 1_000_000)]);
    assert_matches!(outcome.tx_results[0], Err(PosError::MinimumStake(_)));
    assert_matches!(outcome.tx_results[1], Ok(()));
    // the failed attempt left nothing behind
    assert_eq!(outcome.events_of(EVENT_CREATE_VALIDATOR).len(), 1);
    assert_eq!(universe.balance(&address), Amount::from_raw(1_000_000));
}

#[test]
fn test_failed_stake_is_rolled_back_but_fee_is_kept() {
    let mut config = test_pos_config();
    config.tx_fee = Amount::from_raw(100);
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe = TestUniverse::new(config, &[(address, Amount::from_raw(500_000))]);
    let tx = signed_tx(
        &keypair,
        PosMessage::Stake(test_stake_msg(&keypair, Amount::from_raw(1_000_000))),
        Amount::from_raw(100),
    );
    let outcome = universe.run_txs(&[tx]);
    assert_matches!(outcome.tx_results[0], Err(PosError::NotEnoughCoins(_)));
    assert!(outcome.events_of(EVENT_CREATE_VALIDATOR).is_empty());
    let view = universe.view();
    assert!(universe.keeper.get_validator(&view, &address).is_none());
    assert!(universe.keeper.get_signing_info(&view, &address).is_none());
    assert_eq!(universe.balance(&address), Amount::from_raw(499_900));
    assert_eq!(universe.module_balance(FEE_COLLECTOR_NAME), Amount::from_raw(100));

    // below the flat fee nothing happens at all
    let tx = signed_tx(
        &keypair,
        PosMessage::Stake(test_stake_msg(&keypair, Amount::from_raw(1_000_000))),
        Amount::from_raw(99),
    );
    let outcome = universe.run_txs(&[tx]);
    assert_matches!(outcome.tx_results[0], Err(PosError::InsufficientFee(_)));
}

#[test]
fn test_edit_stake() {
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe =
        TestUniverse::new(test_pos_config(), &[(address, Amount::from_raw(5_000_000))]);
    universe.run_txs(&[stake_tx(&keypair, 2_000_000)]);

    let mut msg = test_stake_msg(&keypair, Amount::from_raw(3_000_000));
    msg.service_url = "https://b.example:8081".to_string();
    let outcome = universe.run_txs(&[
        stake_tx(&keypair, 1_500_000),
        signed_tx(&keypair, PosMessage::Stake(msg), Amount::zero()),
    ]);
    assert_matches!(outcome.tx_results[0], Err(PosError::InvalidStake(_)));
    assert_matches!(outcome.tx_results[1], Ok(()));
    assert_eq!(
        outcome.updates,
        vec![ValidatorUpdate {
            public_key: keypair.get_public_key(),
            power: 3
        }]
    );
    let validator = universe.keeper.get_validator(&universe.view(), &address).unwrap();
    assert_eq!(validator.staked_tokens, Amount::from_raw(3_000_000));
    assert_eq!(validator.service_url, "https://b.example:8081");
    assert_eq!(universe.balance(&address), Amount::from_raw(2_000_000));
    assert_eq!(universe.module_balance(STAKED_POOL_NAME), Amount::from_raw(3_000_000));

    // same stake, new url: no power change
    let mut msg = test_stake_msg(&keypair, Amount::from_raw(3_000_000));
    msg.service_url = "http://c.example:80".to_string();
    let outcome = universe.run_txs(&[signed_tx(&keypair, PosMessage::Stake(msg), Amount::zero())]);
    assert_matches!(outcome.tx_results[0], Ok(()));
    assert!(outcome.updates.is_empty());
}

#[test]
fn test_edit_stake_before_upgrade() {
    let mut config = test_pos_config();
    config.upgrade_heights.edit_stake_height = 100;
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe = TestUniverse::new(config, &[(address, Amount::from_raw(5_000_000))]);
    universe.run_txs(&[stake_tx(&keypair, 2_000_000)]);
    let outcome = universe.run_txs(&[stake_tx(&keypair, 3_000_000)]);
    assert_matches!(outcome.tx_results[0], Err(PosError::ValidatorStaked(_)));
}

#[test]
fn test_output_address_rules() {
    let operator = KeyPair::generate();
    let output = KeyPair::generate();
    let other = KeyPair::generate();
    let operator_address = address_of(&operator);
    let output_address = address_of(&output);
    let other_address = address_of(&other);
    let custodial = KeyPair::generate();
    let custodial_address = address_of(&custodial);
    let mut universe = TestUniverse::new(
        test_pos_config(),
        &[
            (output_address, Amount::from_raw(5_000_000)),
            (other_address, Amount::from_raw(5_000_000)),
            (custodial_address, Amount::from_raw(1_000_000)),
        ],
    );

    // a validator without output cannot be claimed by a third party
    universe.run_txs(&[stake_tx(&custodial, 1_000_000)]);
    let mut msg = test_stake_msg(&custodial, Amount::from_raw(1_000_000));
    msg.output_address = Some(other_address);
    let outcome = universe.run_txs(&[
        signed_tx(&other, PosMessage::Stake(msg), Amount::zero()),
        signed_tx(
            &other,
            PosMessage::BeginUnstake {
                address: custodial_address,
                signer: other_address,
            },
            Amount::zero(),
        ),
    ]);
    assert_matches!(outcome.tx_results[0], Err(PosError::UnauthorizedSigner(_)));
    assert_matches!(outcome.tx_results[1], Err(PosError::UnauthorizedSigner(_)));
    let validator = universe
        .keeper
        .get_validator(&universe.view(), &custodial_address)
        .unwrap();
    assert_eq!(validator.output_address, None);
    assert!(!universe
        .keeper
        .is_waiting_validator(&universe.view(), &custodial_address));
    assert_eq!(universe.balance(&other_address), Amount::from_raw(5_000_000));

    // the output address stakes and pays for the operator
    let mut msg = test_stake_msg(&operator, Amount::from_raw(1_000_000));
    msg.output_address = Some(output_address);
    let outcome = universe.run_txs(&[signed_tx(&output, PosMessage::Stake(msg), Amount::zero())]);
    assert_matches!(outcome.tx_results[0], Ok(()));
    assert_eq!(universe.balance(&output_address), Amount::from_raw(4_000_000));

    // the operator cannot move the output away
    let mut msg = test_stake_msg(&operator, Amount::from_raw(1_000_000));
    msg.output_address = Some(other_address);
    let outcome = universe.run_txs(&[signed_tx(&operator, PosMessage::Stake(msg), Amount::zero())]);
    assert_matches!(
        outcome.tx_results[0],
        Err(PosError::DisallowedOutputAddressEdit(_))
    );

    // a third party cannot edit the validator
    let msg = test_stake_msg(&operator, Amount::from_raw(2_000_000));
    let outcome = universe.run_txs(&[signed_tx(&other, PosMessage::Stake(msg), Amount::zero())]);
    assert_matches!(outcome.tx_results[0], Err(PosError::UnauthorizedSigner(_)));

    // nor unstake it
    let outcome = universe.run_txs(&[signed_tx(
        &other,
        PosMessage::BeginUnstake {
            address: operator_address,
            signer: other_address,
        },
        Amount::zero(),
    )]);
    assert_matches!(outcome.tx_results[0], Err(PosError::UnauthorizedSigner(_)));

    // the current output can hand over
    let mut msg = test_stake_msg(&operator, Amount::from_raw(1_000_000));
    msg.output_address = Some(other_address);
    let outcome = universe.run_txs(&[signed_tx(&output, PosMessage::Stake(msg), Amount::zero())]);
    assert_matches!(outcome.tx_results[0], Ok(()));
    let validator = universe
        .keeper
        .get_validator(&universe.view(), &operator_address)
        .unwrap();
    assert_eq!(validator.output_address, Some(other_address));
}

#[test]
fn test_output_address_ignored_before_upgrade() {
    let mut config = test_pos_config();
    config.upgrade_heights.non_custodial_height = 100;
    let operator = KeyPair::generate();
    let output = KeyPair::generate();
    let operator_address = address_of(&operator);
    let output_address = address_of(&output);
    let mut universe = TestUniverse::new(
        config,
        &[
            (operator_address, Amount::from_raw(5_000_000)),
            (output_address, Amount::from_raw(5_000_000)),
        ],
    );
    let mut msg = test_stake_msg(&operator, Amount::from_raw(1_000_000));
    msg.output_address = Some(output_address);
    let outcome = universe.run_txs(&[
        signed_tx(&output, PosMessage::Stake(msg.clone()), Amount::zero()),
        signed_tx(&operator, PosMessage::Stake(msg), Amount::zero()),
    ]);
    assert_matches!(outcome.tx_results[0], Err(PosError::UnauthorizedSigner(_)));
    assert_matches!(outcome.tx_results[1], Ok(()));
    let validator = universe
        .keeper
        .get_validator(&universe.view(), &operator_address)
        .unwrap();
    assert_eq!(validator.output_address, None);
}

#[test]
fn test_reward_delegators_gated_by_height() {
    let mut config = test_pos_config();
    config.upgrade_heights.reward_delegators_height = 3;
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe = TestUniverse::new(config, &[(address, Amount::from_raw(5_000_000))]);
    let mut msg = test_stake_msg(&keypair, Amount::from_raw(1_000_000));
    msg.reward_delegators = Some(BTreeMap::from([(Address::from_module_name("d"), 10)]));
    let tx = signed_tx(&keypair, PosMessage::Stake(msg), Amount::zero());

    let outcome = universe.run_txs(&[tx.clone()]);
    assert_matches!(
        outcome.tx_results[0],
        Err(PosError::DisallowedRewardDelegatorEdit(_))
    );
    universe.run_empty_blocks(1);
    let outcome = universe.run_txs(&[tx]);
    assert_matches!(outcome.tx_results[0], Ok(()));
    let validator = universe.keeper.get_validator(&universe.view(), &address).unwrap();
    assert_eq!(validator.delegators_share(), 10);
}

#[test]
fn test_too_many_chains() {
    let mut config = test_pos_config();
    config.params.max_chains = 1;
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe = TestUniverse::new(config, &[(address, Amount::from_raw(5_000_000))]);
    let mut msg = test_stake_msg(&keypair, Amount::from_raw(1_000_000));
    msg.chains.push("0002".parse().unwrap());
    let outcome = universe.run_txs(&[signed_tx(&keypair, PosMessage::Stake(msg), Amount::zero())]);
    assert_matches!(outcome.tx_results[0], Err(PosError::TooManyChains(1)));
}

#[test]
fn test_send() {
    let sender = KeyPair::generate();
    let from = address_of(&sender);
    let to = Address::from_module_name("receiver");
    let mut universe = TestUniverse::new(test_pos_config(), &[(from, Amount::from_raw(1_000))]);
    let send = |amount: u64| {
        signed_tx(
            &sender,
            PosMessage::Send {
                from,
                to,
                amount: Amount::from_raw(amount),
            },
            Amount::zero(),
        )
    };
    let stolen = signed_tx(
        &KeyPair::generate(),
        PosMessage::Send {
            from,
            to,
            amount: Amount::from_raw(1),
        },
        Amount::zero(),
    );
    let outcome = universe.run_txs(&[send(0), send(400), send(700), stolen]);
    assert_matches!(outcome.tx_results[0], Err(PosError::InvalidSendAmount(_)));
    assert_matches!(outcome.tx_results[1], Ok(()));
    assert_matches!(outcome.tx_results[2], Err(PosError::NotEnoughCoins(_)));
    assert_matches!(outcome.tx_results[3], Err(PosError::UnauthorizedSigner(_)));
    assert_eq!(outcome.events_of(EVENT_TRANSFER).len(), 1);
    assert_eq!(universe.balance(&from), Amount::from_raw(600));
    assert_eq!(universe.balance(&to), Amount::from_raw(400));
}

#[test]
fn test_stake_notifies_hooks() {
    let mut hooks = MockPosHooks::new();
    hooks
        .expect_after_validator_registered()
        .times(1)
        .return_const(());
    hooks.expect_before_validator_staked().times(1).return_const(());
    hooks.expect_after_validator_staked().times(1).return_const(());
    hooks
        .expect_before_validator_begin_unstaking()
        .times(1)
        .return_const(());
    hooks
        .expect_after_validator_begin_unstaking()
        .times(1)
        .return_const(());

    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe = TestUniverse::with_hooks(
        test_pos_config(),
        &[(address, Amount::from_raw(1_000_000))],
        Some(Box::new(hooks)),
    );
    universe.run_txs(&[stake_tx(&keypair, 1_000_000)]);
    universe.run_txs(&[unstake_tx(&keypair)]);
}

#[test]
fn test_unstaking_validator_cannot_stake() {
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe =
        TestUniverse::new(test_pos_config(), &[(address, Amount::from_raw(3_000_000))]);
    universe.run_txs(&[stake_tx(&keypair, 1_000_000)]);
    universe.run_txs(&[unstake_tx(&keypair)]);
    universe.run_empty_blocks(2);
    assert!(universe
        .keeper
        .get_validator(&universe.view(), &address)
        .unwrap()
        .is_unstaking());
    let outcome = universe.run_txs(&[stake_tx(&keypair, 2_000_000), unstake_tx(&keypair)]);
    assert_matches!(outcome.tx_results[0], Err(PosError::ValidatorUnstaking(_)));
    assert_matches!(outcome.tx_results[1], Err(PosError::ValidatorUnstaking(_)));
}

#[test]
fn test_delete_validator_after_draining_indices() {
    let staked = KeyPair::generate();
    let leaving = KeyPair::generate();
    let mut universe = TestUniverse::new(
        test_pos_config(),
        &[
            (address_of(&staked), Amount::from_raw(1_000_000)),
            (address_of(&leaving), Amount::from_raw(1_000_000)),
        ],
    );
    universe.run_txs(&[stake_tx(&staked, 1_000_000), stake_tx(&leaving, 1_000_000)]);
    universe.run_txs(&[unstake_tx(&leaving)]);
    universe.run_empty_blocks(2);

    let mut ctx = universe.begin();
    for keypair in [&staked, &leaving] {
        let address = address_of(keypair);
        let validator = universe.keeper.get_validator(&ctx, &address).unwrap();
        if validator.is_unstaking() {
            universe.keeper.delete_unstaking_validator(&mut ctx, &validator);
        } else {
            universe
                .keeper
                .delete_validator_from_staking_set(&mut ctx, &validator);
        }
        universe.keeper.delete_validator(&mut ctx, &address);
        assert!(universe.keeper.get_validator(&ctx, &address).is_none());
        assert!(universe.keeper.get_signing_info(&ctx, &address).is_none());
    }
    assert!(universe.keeper.get_staked_validators(&ctx).is_empty());
    assert!(universe.keeper.get_unstaking_queue(&ctx).is_empty());
    assert!(universe.keeper.get_all_validators(&ctx).is_empty());
}

#[test]
fn test_longest_unstaking_time() {
    let mut config = test_pos_config();
    config.params.unstaking_time = MAX_SORTABLE_TIME;
    config.validate().unwrap();
    let keypair = KeyPair::generate();
    let address = address_of(&keypair);
    let mut universe = TestUniverse::new(config, &[(address, Amount::from_raw(1_000_000))]);
    universe.run_txs(&[stake_tx(&keypair, 1_000_000)]);
    universe.run_txs(&[unstake_tx(&keypair)]);
    universe.run_empty_blocks(4);

    let validator = universe.keeper.get_validator(&universe.view(), &address).unwrap();
    assert!(validator.is_unstaking());
    assert_eq!(validator.unstaking_completion_time, MAX_SORTABLE_TIME);
    assert_eq!(
        universe.keeper.get_unstaking_queue(&universe.view()),
        vec![(MAX_SORTABLE_TIME, vec![address])]
    );
    assert_eq!(universe.balance(&address), Amount::zero());
}
