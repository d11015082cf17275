// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::config::PosParams;
use crate::error::PosError;
use crate::message::validate_reward_delegators;
use crate::signing_info::SigningInfo;
use crate::validator::{Validator, ValidatorStatus};
use relay_models::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Entry of the missed-block bit array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedBlock {
    /// index in the window
    pub index: u64,
    /// true if the block was missed
    pub missed: bool,
}

/// Power a validator contributed at the last `end_block`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorPower {
    /// validator address
    pub address: Address,
    /// consensus power
    pub power: u64,
}

/// State of the PoS module at genesis or at export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// parameters, must match the node configuration
    pub params: PosParams,
    /// validator records
    pub validators: Vec<Validator>,
    /// signing infos by consensus address
    #[serde(default)]
    pub signing_infos: BTreeMap<Address, SigningInfo>,
    /// missed-block bits by consensus address
    #[serde(default)]
    pub missed_blocks: BTreeMap<Address, Vec<MissedBlock>>,
    /// powers reported to the consensus engine at the last block
    #[serde(default)]
    pub prev_state_validator_powers: Vec<ValidatorPower>,
    /// total power reported at the last block
    #[serde(default)]
    pub prev_state_total_power: u64,
    /// proposer of the last block
    #[serde(default)]
    pub previous_proposer: Option<Address>,
    /// balance of the DAO pool
    #[serde(default)]
    pub dao_balance: Amount,
}

impl GenesisState {
    /// Empty state with the given parameters
    pub fn new(params: PosParams) -> Self {
        GenesisState {
            params,
            validators: Vec::new(),
            signing_infos: BTreeMap::new(),
            missed_blocks: BTreeMap::new(),
            prev_state_validator_powers: Vec::new(),
            prev_state_total_power: 0,
            previous_proposer: None,
            dao_balance: Amount::zero(),
        }
    }

    /// Reads a genesis state from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, PosError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            PosError::GenericError(format!("cannot read genesis file {}: {}", path.display(), err))
        })?;
        serde_json::from_str(&content).map_err(|err| {
            PosError::GenericError(format!("cannot parse genesis file {}: {}", path.display(), err))
        })
    }

    /// Sum of the stake of every staked or unstaking validator
    pub fn bonded_tokens(&self) -> Result<Amount, PosError> {
        self.validators
            .iter()
            .filter(|validator| !validator.is_unstaked())
            .try_fold(Amount::zero(), |total, validator| {
                total.checked_add(validator.staked_tokens).ok_or_else(|| {
                    PosError::InvalidParams("total bonded stake overflows".to_string())
                })
            })
    }

    /// Consistency checks that do not need the store
    pub fn validate(&self, power_reduction: u64) -> Result<(), PosError> {
        self.params.validate(power_reduction)?;
        let mut addresses = BTreeSet::new();
        for validator in &self.validators {
            if !addresses.insert(validator.address) {
                return Err(PosError::InvalidParams(format!(
                    "duplicated genesis validator {}",
                    validator.address
                )));
            }
            if validator.address != Address::from_public_key(&validator.public_key) {
                return Err(PosError::InvalidParams(format!(
                    "genesis validator {} does not match its public key",
                    validator.address
                )));
            }
            if validator.chains.is_empty() {
                return Err(PosError::NoChains);
            }
            if validator.chains.len() as u64 > self.params.max_chains {
                return Err(PosError::TooManyChains(self.params.max_chains));
            }
            if let Some(delegators) = &validator.reward_delegators {
                validate_reward_delegators(delegators)?;
            }
            match validator.status {
                ValidatorStatus::Staked | ValidatorStatus::Unstaking
                    if validator.staked_tokens < self.params.minimum_stake =>
                {
                    return Err(PosError::MinimumStake(format!(
                        "genesis validator {} is bonded with {}",
                        validator.address, validator.staked_tokens
                    )));
                }
                ValidatorStatus::Unstaked if !validator.staked_tokens.is_zero() => {
                    return Err(PosError::InvalidStake(format!(
                        "unstaked genesis validator {} holds {}",
                        validator.address, validator.staked_tokens
                    )));
                }
                _ => {}
            }
        }
        for (address, bits) in &self.missed_blocks {
            if let Some(bit) = bits
                .iter()
                .find(|bit| bit.index >= self.params.signed_blocks_window)
            {
                return Err(PosError::InvalidParams(format!(
                    "missed block index {} of {} is outside the window",
                    bit.index, address
                )));
            }
        }
        self.bonded_tokens().map(|_| ())
    }
}
