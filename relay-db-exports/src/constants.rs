//! Column families, store keys and critical error messages.
#![allow(missing_docs)]

// Commons
pub const METADATA_CF: &str = "metadata";
pub const STATE_CF: &str = "state";

// Change_id
pub const CHANGE_ID_KEY: &[u8; 1] = b"c";
pub const CHANGE_ID_DESER_ERROR: &str = "critical: change_id deserialization failed";
pub const CHANGE_ID_SER_ERROR: &str = "critical: change_id serialization failed";

// Errors
pub const CF_ERROR: &str = "critical: rocksdb column family operation failed";
pub const OPEN_ERROR: &str = "critical: rocksdb open operation failed";
pub const CRUD_ERROR: &str = "critical: rocksdb crud operation failed";
pub const BRANCH_ERROR: &str = "critical: no open branch in the state store";

// PoS prefixes (one byte per logical table)
pub const PREVIOUS_PROPOSER_KEY: u8 = 0x01;
pub const SIGNING_INFO_PREFIX: u8 = 0x11;
pub const MISSED_BLOCK_BIT_ARRAY_PREFIX: u8 = 0x12;
pub const ADDRESS_PUBKEY_PREFIX: u8 = 0x13;
pub const ALL_VALIDATORS_PREFIX: u8 = 0x21;
pub const VALIDATORS_BY_CONSENSUS_ADDR_PREFIX: u8 = 0x22;
pub const STAKED_VALIDATORS_PREFIX: u8 = 0x23;
pub const PREV_STATE_VALIDATORS_POWER_PREFIX: u8 = 0x31;
pub const PREV_STATE_TOTAL_POWER_KEY: u8 = 0x32;
pub const UNSTAKING_VALIDATORS_PREFIX: u8 = 0x41;
pub const WAITING_TO_BEGIN_UNSTAKING_PREFIX: u8 = 0x43;
pub const AWARD_VALIDATOR_PREFIX: u8 = 0x51;

// Ledger prefixes
pub const BALANCE_PREFIX: u8 = 0x61;
pub const MODULE_ACCOUNT_PREFIX: u8 = 0x62;
pub const SUPPLY_KEY: u8 = 0x63;

// PoS values
pub const VALIDATOR_DESER_ERROR: &str = "critical: validator deserialization failed";
pub const VALIDATOR_SER_ERROR: &str = "critical: validator serialization failed";
pub const SIGNING_INFO_DESER_ERROR: &str = "critical: signing info deserialization failed";
pub const SIGNING_INFO_SER_ERROR: &str = "critical: signing info serialization failed";
pub const ADDRESS_DESER_ERROR: &str = "critical: address deserialization failed";
pub const ADDRESS_LIST_DESER_ERROR: &str = "critical: address list deserialization failed";
pub const ADDRESS_LIST_SER_ERROR: &str = "critical: address list serialization failed";
pub const PUBLIC_KEY_DESER_ERROR: &str = "critical: public key deserialization failed";
pub const POWER_DESER_ERROR: &str = "critical: power deserialization failed";
pub const POWER_SER_ERROR: &str = "critical: power serialization failed";
pub const TIME_KEY_ERROR: &str = "critical: unstaking time key formatting failed";
pub const AWARD_DESER_ERROR: &str = "critical: relay award deserialization failed";
pub const AWARD_SER_ERROR: &str = "critical: relay award serialization failed";

// Ledger values
pub const AMOUNT_DESER_ERROR: &str = "critical: amount deserialization failed";
pub const AMOUNT_SER_ERROR: &str = "critical: amount serialization failed";
pub const MODULE_ACCOUNT_DESER_ERROR: &str = "critical: module account deserialization failed";
