// Copyright (c) 2022 MASSA LABS <info@massa.net>

use super::tools::{stake_tx, unstake_tx, TestUniverse};
use assert_matches::assert_matches;
use relay_ledger_exports::{DAO_POOL_NAME, STAKED_POOL_NAME};
use relay_models::Amount;
use relay_pos_exports::test_exports::{
    address_of, test_pos_config, test_validator_with_keypair,
};
use relay_pos_exports::{
    BeginBlockRequest, GenesisState, PosError, ValidatorStatus, ValidatorUpdate, VoteInfo,
};
use relay_signature::KeyPair;
use std::io::Write;

#[test]
fn test_init_genesis() {
    let config = test_pos_config();
    let small = KeyPair::generate();
    let big = KeyPair::generate();
    let mut genesis = GenesisState::new(config.params.clone());
    genesis.validators = vec![
        test_validator_with_keypair(&small, Amount::from_raw(2_000_000)),
        test_validator_with_keypair(&big, Amount::from_raw(3_000_000)),
    ];
    genesis.dao_balance = Amount::from_raw(500);

    let universe = TestUniverse::new(config, &[]);
    let mut ctx = universe.view();
    let updates = universe.keeper.init_genesis(&mut ctx, &genesis).unwrap();
    assert_eq!(
        updates,
        vec![
            ValidatorUpdate {
                public_key: big.get_public_key(),
                power: 3
            },
            ValidatorUpdate {
                public_key: small.get_public_key(),
                power: 2
            },
        ]
    );
    assert_eq!(universe.keeper.get_prev_state_total_power(&ctx), 5);
    for keypair in [&small, &big] {
        let info = universe
            .keeper
            .get_signing_info(&ctx, &address_of(keypair))
            .unwrap();
        assert_eq!(info.start_height, 0);
    }
    universe.commit(ctx);
    assert_eq!(
        universe.module_balance(STAKED_POOL_NAME),
        Amount::from_raw(5_000_000)
    );
    assert_eq!(universe.module_balance(DAO_POOL_NAME), Amount::from_raw(500));
}

#[test]
fn test_init_genesis_rejects_inconsistent_states() {
    let config = test_pos_config();
    let universe = TestUniverse::new(config.clone(), &[]);

    let mut params = config.params.clone();
    params.max_validators = 7;
    let mut ctx = universe.view();
    assert_matches!(
        universe
            .keeper
            .init_genesis(&mut ctx, &GenesisState::new(params)),
        Err(PosError::InvalidParams(_))
    );

    let mut genesis = GenesisState::new(config.params.clone());
    genesis.validators = vec![test_validator_with_keypair(
        &KeyPair::generate(),
        Amount::from_raw(999_999),
    )];
    assert_matches!(
        universe.keeper.init_genesis(&mut ctx, &genesis),
        Err(PosError::MinimumStake(_))
    );

    let keypair = KeyPair::generate();
    let mut genesis = GenesisState::new(config.params);
    genesis.validators = vec![
        test_validator_with_keypair(&keypair, Amount::from_raw(1_000_000)),
        test_validator_with_keypair(&keypair, Amount::from_raw(1_000_000)),
    ];
    assert_matches!(
        universe.keeper.init_genesis(&mut ctx, &genesis),
        Err(PosError::InvalidParams(_))
    );
}

#[test]
fn test_init_genesis_needs_module_accounts() {
    let config = test_pos_config();
    let universe = TestUniverse::empty(config.clone(), None);
    let mut ctx = universe.view();
    assert_matches!(
        universe
            .keeper
            .init_genesis(&mut ctx, &GenesisState::new(config.params)),
        Err(PosError::ModuleAccountMissing(name)) if name == STAKED_POOL_NAME
    );
}

#[test]
fn test_export_then_import() {
    let config = test_pos_config();
    let staked = KeyPair::generate();
    let leaving = KeyPair::generate();
    let mut source = TestUniverse::new(
        config.clone(),
        &[
            (address_of(&staked), Amount::from_raw(2_000_000)),
            (address_of(&leaving), Amount::from_raw(1_000_000)),
        ],
    );
    source.run_txs(&[stake_tx(&staked, 2_000_000), stake_tx(&leaving, 1_000_000)]);
    let request = BeginBlockRequest {
        votes: vec![VoteInfo {
            address: address_of(&staked),
            power: 2,
            signed: false,
        }],
        evidence: Vec::new(),
    };
    source.run_block(&request, &[]);
    source.run_block(&request, &[unstake_tx(&leaving)]);
    // released at the session boundary
    source.run_txs(&[]);

    let exported = source.keeper.export_genesis(&source.view()).unwrap();
    assert_eq!(exported.validators.len(), 2);
    assert_eq!(exported.missed_blocks[&address_of(&staked)].len(), 2);
    assert_eq!(exported.previous_proposer, Some(source.proposer));
    assert_eq!(exported.prev_state_total_power, 2);

    // through a genesis file
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string_pretty(&exported).unwrap().as_bytes())
        .unwrap();
    let loaded = GenesisState::from_file(file.path()).unwrap();
    assert_eq!(loaded, exported);

    let target = TestUniverse::new(config, &[]);
    let mut ctx = target.view();
    let updates = target.keeper.init_genesis(&mut ctx, &loaded).unwrap();
    assert!(updates.is_empty());
    target.commit(ctx);
    assert_eq!(
        target.module_balance(STAKED_POOL_NAME),
        Amount::from_raw(3_000_000)
    );
    let reexported = target.keeper.export_genesis(&target.view()).unwrap();
    assert_eq!(reexported, exported);
    let statuses: Vec<ValidatorStatus> = [&staked, &leaving]
        .iter()
        .map(|keypair| {
            target
                .keeper
                .get_validator(&target.view(), &address_of(keypair))
                .unwrap()
                .status
        })
        .collect();
    assert_eq!(
        statuses,
        vec![ValidatorStatus::Staked, ValidatorStatus::Unstaking]
    );
    assert_eq!(
        target.keeper.get_unstaking_queue(&target.view()),
        source.keeper.get_unstaking_queue(&source.view())
    );
}
