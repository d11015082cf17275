//! DEFAULT VALUES USED TO INITIALIZE DIVERS CONFIGURATIONS STRUCTURES
//!
//! Changing one of the values marked as protocol is a breaking change for
//! a running network: replicas would compute different states.

use crate::amount::Amount;
use num::rational::Ratio;
use relay_time::RelayTime;

/// Number of tokens per unit of consensus power (protocol)
pub const POWER_REDUCTION: u64 = 1_000_000;
/// Delay between a validator set change and its effect on consensus, in blocks (protocol)
pub const VALIDATOR_UPDATE_DELAY: u64 = 1;
/// Jail end used for double signers, effectively forever (9999-12-31T23:59:59Z)
pub const DOUBLE_SIGN_JAIL_END_TIME: RelayTime = RelayTime::from_millis(253_402_300_799_000);

/// Time between the release of a waiting validator and the payout of its stake (21 days)
pub const DEFAULT_UNSTAKING_TIME: RelayTime = RelayTime::from_millis(21 * 24 * 3600 * 1000);
/// Maximum number of validators in the consensus set
pub const DEFAULT_MAX_VALIDATORS: u64 = 1000;
/// Denomination of the staking token
pub const DEFAULT_STAKE_DENOM: &str = "urelay";
/// Minimum stake of a validator
pub const DEFAULT_MINIMUM_STAKE: Amount = Amount::from_raw(15_000_000_000);
/// Length of a session in blocks
pub const DEFAULT_SESSION_BLOCK_FREQUENCY: u64 = 4;
/// Evidence older than this is dropped
pub const DEFAULT_MAX_EVIDENCE_AGE: RelayTime = RelayTime::from_millis(120_000);
/// Size of the liveness window in blocks
pub const DEFAULT_SIGNED_BLOCKS_WINDOW: u64 = 10;
/// Minimum share of the window a validator must sign
pub const DEFAULT_MIN_SIGNED_PER_WINDOW: Ratio<u64> = Ratio::new_raw(6, 10);
/// Jail duration after downtime
pub const DEFAULT_DOWNTIME_JAIL_DURATION: RelayTime = RelayTime::from_millis(3_600_000);
/// Share of the stake burnt on double sign
pub const DEFAULT_SLASH_FRACTION_DOUBLE_SIGN: Ratio<u64> = Ratio::new_raw(1, 20);
/// Share of the stake burnt on downtime
pub const DEFAULT_SLASH_FRACTION_DOWNTIME: Ratio<u64> = Ratio::new_raw(1, 100);
/// Tokens minted per served relay
pub const DEFAULT_RELAYS_TO_TOKENS_MULTIPLIER: u64 = 1000;
/// Percentage of rewards going to the DAO
pub const DEFAULT_DAO_ALLOCATION: u64 = 10;
/// Percentage of rewards going to the block proposer
pub const DEFAULT_PROPOSER_ALLOCATION: u64 = 1;
/// Maximum number of chains a validator can serve
pub const DEFAULT_MAX_CHAINS: u64 = 15;
/// Number of blocks a validator can stay jailed before being force unstaked
pub const DEFAULT_MAX_JAILED_BLOCKS: u64 = 1000;
/// Flat fee paid by every transaction
pub const DEFAULT_TX_FEE: Amount = Amount::from_raw(10_000);
/// Number of validators kept in the read cache
pub const VALIDATOR_CACHE_SIZE: u32 = 500;

/// Maximum length of a service URL in bytes
pub const MAX_SERVICE_URL_LENGTH: usize = 2048;
/// Maximum number of reward delegators of a validator
pub const MAX_REWARD_DELEGATORS: u64 = 100;
/// Version byte prefixing every persisted value
pub const STATE_VALUE_VERSION: u64 = 0;
