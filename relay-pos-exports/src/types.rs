// Copyright (c) 2022 MASSA LABS <info@massa.net>

use relay_models::Address;
use relay_signature::PublicKey;
use relay_time::RelayTime;
use serde::{Deserialize, Serialize};

/// Change of the consensus power of a validator, returned to the consensus engine.
/// A power of zero removes the validator from the consensus set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    /// consensus public key
    pub public_key: PublicKey,
    /// new consensus power
    pub power: u64,
}

/// Vote of a validator in the last commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    /// consensus address
    pub address: Address,
    /// power contributed by the validator
    pub power: u64,
    /// whether the validator signed the last block
    pub signed: bool,
}

/// Kind of misbehavior reported by the consensus engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceKind {
    /// two conflicting votes at the same height
    DuplicateVote,
    /// attack against light clients, not handled by this module
    LightClientAttack,
}

/// Misbehavior reported by the consensus engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// kind of misbehavior
    pub kind: EvidenceKind,
    /// consensus address of the offender
    pub address: Address,
    /// height of the infraction
    pub height: u64,
    /// time of the infraction
    pub time: RelayTime,
    /// power of the offender at the infraction
    pub power: u64,
}

/// Input of `begin_block`, the header itself is carried by the block context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginBlockRequest {
    /// votes of the last commit
    pub votes: Vec<VoteInfo>,
    /// byzantine evidence
    pub evidence: Vec<Evidence>,
}
