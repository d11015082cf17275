// Copyright (c) 2022 MASSA LABS <info@massa.net>

use super::tools::{stake_tx, unstake_tx, TestUniverse};
use relay_models::{Address, Amount};
use relay_pos_exports::test_exports::{address_of, test_pos_config};
use relay_pos_exports::{
    PosController, PosQuery, SigningInfo, Validator, ValidatorStatus, ValidatorsPage,
    MAX_QUERY_PAGE_LIMIT, NOT_FOUND_CODE, POS_CODESPACE,
};
use relay_signature::KeyPair;
use serde_json::json;

fn staked_universe(count: usize) -> (TestUniverse, Vec<KeyPair>) {
    let keypairs: Vec<KeyPair> = (0..count).map(|_| KeyPair::generate()).collect();
    let balances: Vec<_> = keypairs
        .iter()
        .map(|keypair| (address_of(keypair), Amount::from_raw(5_000_000)))
        .collect();
    let mut universe = TestUniverse::new(test_pos_config(), &balances);
    let txs: Vec<_> = keypairs
        .iter()
        .map(|keypair| stake_tx(keypair, 1_000_000))
        .collect();
    universe.run_txs(&txs);
    (universe, keypairs)
}

#[test]
fn test_not_found() {
    let universe = TestUniverse::new(test_pos_config(), &[]);
    let nobody = Address::from_module_name("nobody");
    for query in [PosQuery::Validator(nobody), PosQuery::SigningInfo(nobody)] {
        let err = universe.keeper.query(&universe.view(), &query).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.code, NOT_FOUND_CODE);
        assert_eq!(err.codespace, POS_CODESPACE);
    }
}

#[test]
fn test_validator_and_signing_info() {
    let (universe, keypairs) = staked_universe(1);
    let address = address_of(&keypairs[0]);
    let view = universe.view();

    let value = universe
        .keeper
        .query(&view, &PosQuery::Validator(address))
        .unwrap();
    let validator: Validator = serde_json::from_value(value).unwrap();
    assert_eq!(validator.address, address);
    assert_eq!(validator.status, ValidatorStatus::Staked);

    let value = universe
        .keeper
        .query(&view, &PosQuery::SigningInfo(address))
        .unwrap();
    let info: SigningInfo = serde_json::from_value(value).unwrap();
    assert_eq!(info.start_height, 1);

    let value = universe
        .keeper
        .query(&view, &PosQuery::StakedValidators)
        .unwrap();
    let staked: Vec<Validator> = serde_json::from_value(value).unwrap();
    assert_eq!(staked, vec![validator]);
}

#[test]
fn test_validators_pages() {
    let (mut universe, keypairs) = staked_universe(5);
    universe.run_txs(&[unstake_tx(&keypairs[0])]);
    universe.run_empty_blocks(2);
    let view = universe.view();
    let page = |status: Option<ValidatorStatus>, page: u64, limit: u64| -> ValidatorsPage {
        let value = universe
            .keeper
            .query(
                &view,
                &PosQuery::Validators {
                    status,
                    page,
                    limit,
                },
            )
            .unwrap();
        serde_json::from_value(value).unwrap()
    };

    let first = page(None, 1, 2);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.result.len(), 2);
    let last = page(None, 3, 2);
    assert_eq!(last.result.len(), 1);
    assert!(first.result[1].address < last.result[0].address);
    assert!(page(None, 4, 2).result.is_empty());

    let staked = page(Some(ValidatorStatus::Staked), 1, 10);
    assert_eq!(staked.result.len(), 4);
    assert_eq!(staked.total_pages, 1);
    let unstaking = page(Some(ValidatorStatus::Unstaking), 1, 10);
    assert_eq!(unstaking.result.len(), 1);
    assert_eq!(unstaking.result[0].address, address_of(&keypairs[0]));

    for (page, limit) in [(0, 10), (1, 0), (1, MAX_QUERY_PAGE_LIMIT + 1)] {
        let err = universe
            .keeper
            .query(
                &view,
                &PosQuery::Validators {
                    status: None,
                    page,
                    limit,
                },
            )
            .unwrap_err();
        assert!(!err.is_not_found());
    }
}

#[test]
fn test_pools_and_queues() {
    let (mut universe, keypairs) = staked_universe(2);
    let leaving = address_of(&keypairs[1]);
    let user = address_of(&keypairs[0]);

    universe.run_txs(&[unstake_tx(&keypairs[1])]);
    let view = universe.view();
    assert_eq!(
        universe
            .keeper
            .query(&view, &PosQuery::WaitingValidators)
            .unwrap(),
        json!([leaving])
    );
    assert_eq!(
        universe
            .keeper
            .query(&view, &PosQuery::StakedPoolBalance)
            .unwrap(),
        json!(Amount::from_raw(2_000_000))
    );
    assert_eq!(
        universe
            .keeper
            .query(&view, &PosQuery::AccountBalance(user))
            .unwrap(),
        json!(Amount::from_raw(4_000_000))
    );
    assert_eq!(
        universe
            .keeper
            .query(&view, &PosQuery::PrevStateTotalPower)
            .unwrap(),
        json!(2)
    );
    assert_eq!(
        universe
            .keeper
            .query(&view, &PosQuery::PreviousProposer)
            .unwrap(),
        json!(universe.proposer)
    );
    assert_eq!(
        universe
            .keeper
            .query(&view, &PosQuery::DaoPoolBalance)
            .unwrap(),
        json!(Amount::zero())
    );
    assert_eq!(
        universe.keeper.query(&view, &PosQuery::Params).unwrap(),
        json!(universe.keeper.params())
    );

    universe.run_empty_blocks(2);
    let view = universe.view();
    let completion = universe
        .keeper
        .get_validator(&view, &leaving)
        .unwrap()
        .unstaking_completion_time;
    assert_eq!(
        universe
            .keeper
            .query(&view, &PosQuery::UnstakingValidators)
            .unwrap(),
        json!([{ "completion_time": completion.to_millis(), "addresses": [leaving] }])
    );
    assert_eq!(
        universe
            .keeper
            .query(&view, &PosQuery::WaitingValidators)
            .unwrap(),
        json!([])
    );
}
