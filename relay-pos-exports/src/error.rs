// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use relay_ledger_exports::LedgerError;
use relay_models::{Address, ModelsError};
use thiserror::Error;

/// Codespace of every error raised by the PoS module
pub const POS_CODESPACE: &str = "pos";

/// pos result
pub type PosResult<T, E = PosError> = core::result::Result<T, E>;

/// pos error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum PosError {
    /// Generic error: {0}
    GenericError(String),
    /// validator {0} not found
    ValidatorNotFound(Address),
    /// signing info of {0} not found
    SigningInfoNotFound(Address),
    /// invalid stake: {0}
    InvalidStake(String),
    /// stake below the minimum: {0}
    MinimumStake(String),
    /// not enough coins: {0}
    NotEnoughCoins(String),
    /// validator {0} is already staked
    ValidatorStaked(Address),
    /// validator {0} is unstaking
    ValidatorUnstaking(Address),
    /// validator {0} is not staked
    ValidatorNotStaked(Address),
    /// validator {0} is already waiting to unstake
    ValidatorWaitingToUnstake(Address),
    /// validator {0} is jailed
    ValidatorJailed(Address),
    /// validator {0} is not jailed
    ValidatorNotJailed(Address),
    /// validator still jailed: {0}
    ValidatorStillJailed(String),
    /// too many chains, at most {0} are allowed
    TooManyChains(u64),
    /// a validator must serve at least one chain
    NoChains,
    /// invalid service url: {0}
    InvalidServiceUrl(String),
    /// invalid chain identifier: {0}
    InvalidChainId(String),
    /// unauthorized signer: {0}
    UnauthorizedSigner(String),
    /// disallowed output address edit: {0}
    DisallowedOutputAddressEdit(String),
    /// disallowed reward delegators edit: {0}
    DisallowedRewardDelegatorEdit(String),
    /// invalid reward delegators: {0}
    InvalidRewardDelegators(String),
    /// invalid send amount: {0}
    InvalidSendAmount(String),
    /// empty address: {0}
    EmptyAddress(String),
    /// invalid signature: {0}
    InvalidSignature(String),
    /// insufficient fee: {0}
    InsufficientFee(String),
    /// module account {0} is not registered
    ModuleAccountMissing(String),
    /// invalid parameters: {0}
    InvalidParams(String),
    /// invariant broken: {0}
    InvariantBroken(String),
    /// ledger error: {0}
    LedgerError(#[from] LedgerError),
    /// models error: {0}
    ModelsError(String),
    /// serialization error: {0}
    SerializationError(String),
}

impl From<ModelsError> for PosError {
    fn from(err: ModelsError) -> Self {
        match err {
            ModelsError::InvalidServiceUrl(msg) => PosError::InvalidServiceUrl(msg),
            ModelsError::InvalidChainId(msg) => PosError::InvalidChainId(msg),
            other => PosError::ModelsError(other.to_string()),
        }
    }
}

impl PosError {
    /// Stable numeric code of the error, reported to clients with `codespace`
    pub fn code(&self) -> u32 {
        match self {
            PosError::GenericError(_) => 1,
            PosError::ValidatorNotFound(_) => 101,
            PosError::SigningInfoNotFound(_) => 102,
            PosError::InvalidStake(_) => 103,
            PosError::ValidatorJailed(_) => 104,
            PosError::ValidatorNotJailed(_) => 105,
            PosError::ValidatorStillJailed(_) => 106,
            PosError::MinimumStake(_) => 112,
            PosError::NotEnoughCoins(_) => 113,
            PosError::ValidatorStaked(_) => 114,
            PosError::ValidatorUnstaking(_) => 115,
            PosError::ValidatorNotStaked(_) => 116,
            PosError::TooManyChains(_) => 117,
            PosError::NoChains => 120,
            PosError::ValidatorWaitingToUnstake(_) => 122,
            PosError::InvalidServiceUrl(_) => 123,
            PosError::InvalidChainId(_) => 124,
            PosError::UnauthorizedSigner(_) => 130,
            PosError::DisallowedOutputAddressEdit(_) => 131,
            PosError::DisallowedRewardDelegatorEdit(_) => 132,
            PosError::InvalidRewardDelegators(_) => 133,
            PosError::InvalidSendAmount(_) => 140,
            PosError::EmptyAddress(_) => 141,
            PosError::InvalidSignature(_) => 142,
            PosError::InsufficientFee(_) => 143,
            PosError::ModuleAccountMissing(_) => 150,
            PosError::InvalidParams(_) => 151,
            PosError::InvariantBroken(_) => 160,
            PosError::LedgerError(_) => 170,
            PosError::ModelsError(_) => 171,
            PosError::SerializationError(_) => 172,
        }
    }

    /// Codespace of the error
    pub fn codespace(&self) -> &'static str {
        POS_CODESPACE
    }
}
