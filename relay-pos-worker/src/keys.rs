// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Store keys of the PoS tables: a one-byte prefix followed by the key payload

use relay_db_exports::{
    Key, ADDRESS_PUBKEY_PREFIX, ALL_VALIDATORS_PREFIX, AWARD_VALIDATOR_PREFIX,
    MISSED_BLOCK_BIT_ARRAY_PREFIX, PREVIOUS_PROPOSER_KEY, PREV_STATE_TOTAL_POWER_KEY,
    PREV_STATE_VALIDATORS_POWER_PREFIX, SIGNING_INFO_PREFIX, STAKED_VALIDATORS_PREFIX,
    TIME_KEY_ERROR, UNSTAKING_VALIDATORS_PREFIX, VALIDATORS_BY_CONSENSUS_ADDR_PREFIX,
    WAITING_TO_BEGIN_UNSTAKING_PREFIX,
};
use relay_models::{Address, ADDRESS_SIZE_BYTES};
use relay_time::RelayTime;

fn prefixed(prefix: u8, payload: &[u8]) -> Key {
    let mut key = Vec::with_capacity(1 + payload.len());
    key.push(prefix);
    key.extend_from_slice(payload);
    key
}

/// Reads the address that follows the prefix of `key`
pub fn address_suffix(key: &[u8]) -> Option<Address> {
    let bytes: [u8; ADDRESS_SIZE_BYTES] = key.get(1..1 + ADDRESS_SIZE_BYTES)?.try_into().ok()?;
    Some(Address::from_bytes(bytes))
}

pub fn previous_proposer_key() -> Key {
    vec![PREVIOUS_PROPOSER_KEY]
}

pub fn signing_info_key(address: &Address) -> Key {
    prefixed(SIGNING_INFO_PREFIX, address.to_bytes())
}

/// Prefix of every missed-block bit of `address`
pub fn missed_blocks_prefix(address: &Address) -> Key {
    prefixed(MISSED_BLOCK_BIT_ARRAY_PREFIX, address.to_bytes())
}

/// `prefix || address || little-endian(index)`
pub fn missed_block_key(address: &Address, index: u64) -> Key {
    let mut key = missed_blocks_prefix(address);
    key.extend_from_slice(&index.to_le_bytes());
    key
}

/// Reads the window index of a missed-block key
pub fn missed_block_index(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.get(1 + ADDRESS_SIZE_BYTES..)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

pub fn public_key_key(address: &Address) -> Key {
    prefixed(ADDRESS_PUBKEY_PREFIX, address.to_bytes())
}

pub fn validator_key(address: &Address) -> Key {
    prefixed(ALL_VALIDATORS_PREFIX, address.to_bytes())
}

pub fn consensus_address_key(address: &Address) -> Key {
    prefixed(VALIDATORS_BY_CONSENSUS_ADDR_PREFIX, address.to_bytes())
}

/// `prefix || big-endian(power) || ~address`: reverse iteration yields
/// decreasing power, then increasing address
pub fn staked_validator_key(power: u64, address: &Address) -> Key {
    let mut key = Vec::with_capacity(1 + 8 + ADDRESS_SIZE_BYTES);
    key.push(STAKED_VALIDATORS_PREFIX);
    key.extend_from_slice(&power.to_be_bytes());
    key.extend_from_slice(&address.to_complement_bytes());
    key
}

/// Reads `(power, address)` back from a staked-power key
pub fn parse_staked_validator_key(key: &[u8]) -> Option<(u64, Address)> {
    let power: [u8; 8] = key.get(1..9)?.try_into().ok()?;
    let complement: [u8; ADDRESS_SIZE_BYTES] = key.get(9..)?.try_into().ok()?;
    Some((
        u64::from_be_bytes(power),
        Address::from_complement_bytes(&complement),
    ))
}

pub fn prev_state_power_key(address: &Address) -> Key {
    prefixed(PREV_STATE_VALIDATORS_POWER_PREFIX, address.to_bytes())
}

pub fn prev_state_total_power_key() -> Key {
    vec![PREV_STATE_TOTAL_POWER_KEY]
}

/// `prefix || sortable(time)`, keys sort like the times they encode
pub fn unstaking_key(time: RelayTime) -> Key {
    let formatted = time.format_sortable().expect(TIME_KEY_ERROR);
    prefixed(UNSTAKING_VALIDATORS_PREFIX, formatted.as_bytes())
}

pub fn waiting_key(address: &Address) -> Key {
    prefixed(WAITING_TO_BEGIN_UNSTAKING_PREFIX, address.to_bytes())
}

pub fn award_key(address: &Address) -> Key {
    prefixed(AWARD_VALIDATOR_PREFIX, address.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staked_keys_order_by_power_then_address() {
        let low = Address::from_bytes([1u8; ADDRESS_SIZE_BYTES]);
        let high = Address::from_bytes([2u8; ADDRESS_SIZE_BYTES]);
        let mut keys = vec![
            staked_validator_key(5, &high),
            staked_validator_key(100, &low),
            staked_validator_key(5, &low),
        ];
        keys.sort();
        keys.reverse();
        let parsed: Vec<(u64, Address)> = keys
            .iter()
            .map(|key| parse_staked_validator_key(key).unwrap())
            .collect();
        assert_eq!(parsed, vec![(100, low), (5, low), (5, high)]);
    }

    #[test]
    fn test_unstaking_keys_sort_by_time() {
        let early = unstaking_key(RelayTime::from_millis(999));
        let late = unstaking_key(RelayTime::from_millis(1_000_000_000));
        assert!(early < late);
        assert_eq!(early.len(), late.len());
    }

    #[test]
    fn test_missed_block_key() {
        let address = Address::from_module_name("validator");
        let key = missed_block_key(&address, 7);
        assert!(key.starts_with(&missed_blocks_prefix(&address)));
        assert_eq!(missed_block_index(&key), Some(7));
        assert_eq!(address_suffix(&key), Some(address));
    }
}
