// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! # General description
//!
//! Types shared by the proof-of-stake state machine and its callers:
//! validator records and their canonical codecs, liveness records,
//! parameters, transaction messages, consensus engine types, events, hooks,
//! queries, genesis and the `PosController` trait implemented by
//! `relay_pos_worker`.

#![warn(missing_docs)]

mod config;
mod controller;
mod error;
mod genesis;
mod hooks;
mod message;
mod query;
mod signing_info;
mod types;
mod validator;

pub mod events;

pub use config::{PosConfig, PosParams, UpgradeHeights, POS_ENV_PREFIX};
pub use controller::PosController;
pub use error::{PosError, PosResult, POS_CODESPACE};
pub use genesis::{GenesisState, MissedBlock, ValidatorPower};
pub use hooks::PosHooks;
#[cfg(any(test, feature = "test-exports"))]
pub use hooks::MockPosHooks;
pub use message::{
    signing_hash, validate_reward_delegators, MsgStake, PosMessage, PosMessageDeserializer,
    PosMessageSerializer, SignedTx, SignedTxDeserializer, SignedTxSerializer,
    MAX_MESSAGE_CHAINS,
};
pub use query::{PosQuery, QueryError, ValidatorsPage, MAX_QUERY_PAGE_LIMIT, NOT_FOUND_CODE};
pub use signing_info::{SigningInfo, SigningInfoDeserializer, SigningInfoSerializer};
pub use types::{BeginBlockRequest, Evidence, EvidenceKind, ValidatorUpdate, VoteInfo};
pub use validator::{
    RewardDelegators, RewardDelegatorsDeserializer, RewardDelegatorsSerializer, Validator,
    ValidatorDeserializer, ValidatorSerializer, ValidatorStatus,
};

#[cfg(any(test, feature = "test-exports"))]
pub mod test_exports;
