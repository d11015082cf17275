// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Kinds and attribute names of the events emitted by the PoS module

/// a validator record was created
pub const EVENT_CREATE_VALIDATOR: &str = "create_validator";
/// a validator was staked or edited
pub const EVENT_STAKE: &str = "stake";
/// a validator was queued for unstaking
pub const EVENT_BEGIN_UNSTAKE: &str = "begin_unstake";
/// a waiting validator started unstaking
pub const EVENT_UNSTAKE: &str = "unstake";
/// the stake of an unstaking validator was paid back
pub const EVENT_COMPLETE_UNSTAKING: &str = "complete_unstaking";
/// block reward paid to the previous proposer
pub const EVENT_PROPOSER_REWARD: &str = "proposer_reward";
/// block reward paid to the DAO
pub const EVENT_DAO_ALLOCATION: &str = "dao_allocation";
/// stake burnt for a misbehavior
pub const EVENT_SLASH: &str = "slash";
/// a validator missed a block
pub const EVENT_LIVENESS: &str = "liveness";
/// a jailed validator was put back in the consensus set
pub const EVENT_UNJAIL: &str = "unjail";
/// coins were transferred
pub const EVENT_TRANSFER: &str = "transfer";
/// relay rewards were paid
pub const EVENT_RELAY_REWARD: &str = "relay_reward";

/// validator address
pub const ATTRIBUTE_ADDRESS: &str = "address";
/// amount of tokens
pub const ATTRIBUTE_AMOUNT: &str = "amount";
/// consensus power
pub const ATTRIBUTE_POWER: &str = "power";
/// reason of a slash
pub const ATTRIBUTE_REASON: &str = "reason";
/// whether the slashed validator was jailed
pub const ATTRIBUTE_JAILED: &str = "jailed";
/// missed blocks in the window
pub const ATTRIBUTE_MISSED_BLOCKS: &str = "missed_blocks";
/// block height
pub const ATTRIBUTE_HEIGHT: &str = "height";
/// time at which the unstaking completes
pub const ATTRIBUTE_COMPLETION_TIME: &str = "completion_time";
/// sender of a transfer
pub const ATTRIBUTE_SENDER: &str = "sender";
/// receiver of a transfer or a reward
pub const ATTRIBUTE_RECIPIENT: &str = "recipient";

/// slash reason for conflicting votes
pub const REASON_DOUBLE_SIGN: &str = "double_sign";
/// slash reason for downtime
pub const REASON_MISSING_SIGNATURE: &str = "missing_signature";
/// slash reason for too many blocks spent jailed
pub const REASON_MAX_JAILED_BLOCKS: &str = "max_jailed_blocks";
/// unstake reason for a stake slashed below the minimum
pub const REASON_MINIMUM_STAKE: &str = "below_minimum_stake";
