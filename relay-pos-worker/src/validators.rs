// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Validator records and their secondary indices

use crate::keeper::PosKeeper;
use crate::keys::{
    address_suffix, consensus_address_key, parse_staked_validator_key, prev_state_power_key,
    prev_state_total_power_key, public_key_key, signing_info_key, staked_validator_key,
    unstaking_key, validator_key, waiting_key,
};
use nom::multi::length_count;
use relay_db_exports::{
    BlockContext, ADDRESS_DESER_ERROR, ADDRESS_LIST_DESER_ERROR, ADDRESS_LIST_SER_ERROR,
    ALL_VALIDATORS_PREFIX, CRUD_ERROR, POWER_DESER_ERROR, POWER_SER_ERROR,
    PREV_STATE_VALIDATORS_POWER_PREFIX, PUBLIC_KEY_DESER_ERROR, STAKED_VALIDATORS_PREFIX,
    UNSTAKING_VALIDATORS_PREFIX, VALIDATOR_DESER_ERROR, VALIDATOR_SER_ERROR,
    WAITING_TO_BEGIN_UNSTAKING_PREFIX,
};
use relay_models::{Address, AddressDeserializer, AddressSerializer, ADDRESS_SIZE_BYTES};
use relay_pos_exports::Validator;
use relay_serialization::{deserialize_all, DeserializeError, Deserializer, Serializer};
use relay_signature::{PublicKey, PublicKeyDeserializer};
use relay_time::{RelayTime, MAX_SORTABLE_TIME};
use std::collections::BTreeMap;

impl PosKeeper {
    /// Validator record of `address`, from the cache or the store
    pub fn get_validator(&self, ctx: &BlockContext, address: &Address) -> Option<Validator> {
        if let Some(validator) = self.validator_cache.lock().get(address) {
            return Some(validator.clone());
        }
        let validator = self.read_validator(ctx, address)?;
        self.validator_cache
            .lock()
            .insert(*address, validator.clone());
        Some(validator)
    }

    /// Validator record of `address`, bypassing the cache
    fn read_validator(&self, ctx: &BlockContext, address: &Address) -> Option<Validator> {
        ctx.store()
            .get(&validator_key(address))
            .map(|bytes| self.decode_validator(&bytes))
    }

    pub(crate) fn decode_validator(&self, bytes: &[u8]) -> Validator {
        deserialize_all(&self.validator_deserializer, bytes).expect(VALIDATOR_DESER_ERROR)
    }

    /// Operator address of the validator signing with the consensus address `address`
    pub fn get_validator_by_consensus_address(
        &self,
        ctx: &BlockContext,
        address: &Address,
    ) -> Option<Validator> {
        let bytes = ctx.store().get(&consensus_address_key(address))?;
        let operator =
            deserialize_all(&AddressDeserializer::new(), &bytes).expect(ADDRESS_DESER_ERROR);
        self.get_validator(ctx, &operator)
    }

    /// Writes a validator record and reconciles the staked-power index and
    /// the unstaking queue with its status and jail flag
    pub fn set_validator(&self, ctx: &mut BlockContext, validator: &Validator) {
        let previous = self.read_validator(ctx, &validator.address);
        if let Some(previous) = &previous {
            self.remove_from_indices(ctx, previous);
        }
        let mut bytes = Vec::new();
        self.validator_serializer
            .serialize(validator, &mut bytes)
            .expect(VALIDATOR_SER_ERROR);
        ctx.store_mut()
            .put(validator_key(&validator.address), bytes);
        self.add_to_indices(ctx, validator);
        self.validator_cache
            .lock()
            .insert(validator.address, validator.clone());
    }

    /// Removes the record, the signing info and the index entries of a validator.
    /// The public key binding and the previous-state power are kept so that
    /// the next `end_block` reports the removal to the consensus engine.
    pub fn delete_validator(&self, ctx: &mut BlockContext, address: &Address) {
        if let Some(validator) = self.read_validator(ctx, address) {
            self.remove_from_indices(ctx, &validator);
        }
        ctx.store_mut().delete(validator_key(address));
        ctx.store_mut().delete(consensus_address_key(address));
        ctx.store_mut().delete(waiting_key(address));
        ctx.store_mut().delete(signing_info_key(address));
        self.clear_missed_blocks(ctx, address);
        self.validator_cache.lock().remove(address);
    }

    fn add_to_indices(&self, ctx: &mut BlockContext, validator: &Validator) {
        if validator.is_staked() && !validator.jailed {
            let power = validator.consensus_power(self.config.power_reduction);
            ctx.store_mut().put(
                staked_validator_key(power, &validator.address),
                validator.address.to_bytes().to_vec(),
            );
        }
        if validator.is_unstaking() {
            let time = validator.unstaking_completion_time;
            let mut addresses = self.get_unstaking_addresses(ctx, time);
            if !addresses.contains(&validator.address) {
                addresses.push(validator.address);
            }
            self.set_unstaking_addresses(ctx, time, &addresses);
        }
    }

    fn remove_from_indices(&self, ctx: &mut BlockContext, validator: &Validator) {
        if validator.is_staked() && !validator.jailed {
            self.delete_validator_from_staking_set(ctx, validator);
        }
        if validator.is_unstaking() {
            self.delete_unstaking_validator(ctx, validator);
        }
    }

    /// Drops the staked-power index entry of a validator, keyed by its current power
    pub fn delete_validator_from_staking_set(&self, ctx: &mut BlockContext, validator: &Validator) {
        let power = validator.consensus_power(self.config.power_reduction);
        ctx.store_mut()
            .delete(staked_validator_key(power, &validator.address));
    }

    /// Drops a validator from the unstaking queue bucket of its completion time
    pub fn delete_unstaking_validator(&self, ctx: &mut BlockContext, validator: &Validator) {
        let time = validator.unstaking_completion_time;
        let mut addresses = self.get_unstaking_addresses(ctx, time);
        addresses.retain(|address| *address != validator.address);
        self.set_unstaking_addresses(ctx, time, &addresses);
    }

    /// Binds the consensus address and the public key of a new validator
    pub(crate) fn set_validator_keys(&self, ctx: &mut BlockContext, public_key: &PublicKey) {
        let address = Address::from_public_key(public_key);
        ctx.store_mut()
            .put(public_key_key(&address), public_key.to_bytes().to_vec());
        ctx.store_mut().put(
            consensus_address_key(&address),
            address.to_bytes().to_vec(),
        );
    }

    /// Public key bound to `address`
    pub fn get_public_key(&self, ctx: &BlockContext, address: &Address) -> Option<PublicKey> {
        let bytes = ctx.store().get(&public_key_key(address))?;
        Some(deserialize_all(&PublicKeyDeserializer::new(), &bytes).expect(PUBLIC_KEY_DESER_ERROR))
    }

    /// Every validator record, by address
    pub fn get_all_validators(&self, ctx: &BlockContext) -> Vec<Validator> {
        ctx.store()
            .prefix_iter(&[ALL_VALIDATORS_PREFIX])
            .into_iter()
            .map(|(_, bytes)| self.decode_validator(&bytes))
            .collect()
    }

    /// Staked and unjailed validators by decreasing power, ties by increasing address
    pub fn get_staked_validators(&self, ctx: &BlockContext) -> Vec<(u64, Address)> {
        ctx.store()
            .reverse_prefix_iter(&[STAKED_VALIDATORS_PREFIX])
            .into_iter()
            .map(|(key, _)| parse_staked_validator_key(&key).expect(CRUD_ERROR))
            .collect()
    }

    /// Addresses queued in the unstaking queue at `time`
    pub(crate) fn get_unstaking_addresses(
        &self,
        ctx: &BlockContext,
        time: RelayTime,
    ) -> Vec<Address> {
        match ctx.store().get(&unstaking_key(time)) {
            Some(bytes) => self.decode_address_list(&bytes),
            None => Vec::new(),
        }
    }

    fn set_unstaking_addresses(
        &self,
        ctx: &mut BlockContext,
        time: RelayTime,
        addresses: &[Address],
    ) {
        let key = unstaking_key(time);
        if addresses.is_empty() {
            ctx.store_mut().delete(key);
            return;
        }
        let mut bytes = Vec::new();
        self.u64_serializer
            .serialize(&(addresses.len() as u64), &mut bytes)
            .expect(ADDRESS_LIST_SER_ERROR);
        for address in addresses {
            AddressSerializer::new()
                .serialize(address, &mut bytes)
                .expect(ADDRESS_LIST_SER_ERROR);
        }
        ctx.store_mut().put(key, bytes);
    }

    pub(crate) fn decode_address_list(&self, bytes: &[u8]) -> Vec<Address> {
        let address_deserializer = AddressDeserializer::new();
        let (rest, addresses) = length_count::<_, _, _, DeserializeError, _, _>(
            |input| self.u64_deserializer.deserialize(input),
            |input| address_deserializer.deserialize(input),
        )(bytes)
        .expect(ADDRESS_LIST_DESER_ERROR);
        if !rest.is_empty() {
            panic!("{}", ADDRESS_LIST_DESER_ERROR);
        }
        addresses
    }

    /// Unstaking queue entries with a completion time at or before `time`, by time
    pub(crate) fn get_mature_unstaking(
        &self,
        ctx: &BlockContext,
        time: RelayTime,
    ) -> Vec<Vec<Address>> {
        let end = if time < MAX_SORTABLE_TIME {
            unstaking_key(time.saturating_add(RelayTime::EPSILON))
        } else {
            vec![UNSTAKING_VALIDATORS_PREFIX + 1]
        };
        ctx.store()
            .range_iter(&[UNSTAKING_VALIDATORS_PREFIX], &end)
            .into_iter()
            .map(|(_, bytes)| self.decode_address_list(&bytes))
            .collect()
    }

    /// Every unstaking queue entry, by time
    pub fn get_unstaking_queue(&self, ctx: &BlockContext) -> Vec<(RelayTime, Vec<Address>)> {
        ctx.store()
            .prefix_iter(&[UNSTAKING_VALIDATORS_PREFIX])
            .into_iter()
            .map(|(key, bytes)| {
                let formatted = std::str::from_utf8(&key[1..]).expect(CRUD_ERROR);
                let time = RelayTime::parse_sortable(formatted).expect(CRUD_ERROR);
                (time, self.decode_address_list(&bytes))
            })
            .collect()
    }

    /// True if `address` waits for the next session to unstake
    pub fn is_waiting_validator(&self, ctx: &BlockContext, address: &Address) -> bool {
        ctx.store().has(&waiting_key(address))
    }

    /// Validators waiting for the next session to unstake, by address
    pub fn get_waiting_validators(&self, ctx: &BlockContext) -> Vec<Address> {
        ctx.store()
            .prefix_iter(&[WAITING_TO_BEGIN_UNSTAKING_PREFIX])
            .into_iter()
            .map(|(key, _)| address_suffix(&key).expect(CRUD_ERROR))
            .collect()
    }

    pub(crate) fn set_waiting_validator(&self, ctx: &mut BlockContext, address: &Address) {
        ctx.store_mut()
            .put(waiting_key(address), address.to_bytes().to_vec());
    }

    pub(crate) fn delete_waiting_validator(&self, ctx: &mut BlockContext, address: &Address) {
        ctx.store_mut().delete(waiting_key(address));
    }

    /// Powers reported to the consensus engine at the last `end_block`, by address
    pub fn get_prev_state_powers(&self, ctx: &BlockContext) -> BTreeMap<Address, u64> {
        ctx.store()
            .prefix_iter(&[PREV_STATE_VALIDATORS_POWER_PREFIX])
            .into_iter()
            .map(|(key, bytes)| {
                if key.len() != 1 + ADDRESS_SIZE_BYTES {
                    panic!("{}", ADDRESS_DESER_ERROR);
                }
                let address = address_suffix(&key).expect(ADDRESS_DESER_ERROR);
                (address, self.decode_u64(&bytes, POWER_DESER_ERROR))
            })
            .collect()
    }

    pub(crate) fn set_prev_state_power(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        power: u64,
    ) {
        let bytes = self.encode_u64(power, POWER_SER_ERROR);
        ctx.store_mut().put(prev_state_power_key(address), bytes);
    }

    pub(crate) fn delete_prev_state_power(&self, ctx: &mut BlockContext, address: &Address) {
        ctx.store_mut().delete(prev_state_power_key(address));
    }

    /// Total power reported to the consensus engine at the last update
    pub fn get_prev_state_total_power(&self, ctx: &BlockContext) -> u64 {
        ctx.store()
            .get(&prev_state_total_power_key())
            .map(|bytes| self.decode_u64(&bytes, POWER_DESER_ERROR))
            .unwrap_or(0)
    }

    pub(crate) fn set_prev_state_total_power(&self, ctx: &mut BlockContext, power: u64) {
        let bytes = self.encode_u64(power, POWER_SER_ERROR);
        ctx.store_mut().put(prev_state_total_power_key(), bytes);
    }

    pub(crate) fn encode_u64(&self, value: u64, error: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.u64_serializer
            .serialize(&value, &mut bytes)
            .expect(error);
        bytes
    }

    pub(crate) fn decode_u64(&self, bytes: &[u8], error: &str) -> u64 {
        deserialize_all(&self.u64_deserializer, bytes).expect(error)
    }
}
