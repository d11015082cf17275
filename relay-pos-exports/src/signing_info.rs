// Copyright (c) 2022 MASSA LABS <info@massa.net>

use nom::{
    error::{context, ContextError, ParseError},
    sequence::tuple,
    IResult, Parser,
};
use relay_models::config::STATE_VALUE_VERSION;
use relay_models::{Address, AddressDeserializer, AddressSerializer};
use relay_serialization::{
    Deserializer, SerializeError, Serializer, U64VarIntDeserializer, U64VarIntSerializer,
};
use relay_time::{RelayTime, RelayTimeDeserializer, RelayTimeSerializer};
use serde::{Deserialize, Serialize};
use std::ops::Bound::Included;

/// Liveness record of a validator, keyed by its consensus address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningInfo {
    /// consensus address
    pub address: Address,
    /// height from which the liveness window is evaluated
    pub start_height: u64,
    /// number of signatures accounted so far, the window index is `index_offset % window`
    pub index_offset: u64,
    /// the validator cannot unjail before this time
    pub jailed_until: RelayTime,
    /// number of missed blocks in the current window
    pub missed_blocks_counter: u64,
    /// number of blocks spent jailed
    pub jailed_blocks_counter: u64,
}

impl SigningInfo {
    /// Fresh record starting at `start_height`
    pub fn new(address: Address, start_height: u64) -> Self {
        SigningInfo {
            address,
            start_height,
            index_offset: 0,
            jailed_until: RelayTime::from_millis(0),
            missed_blocks_counter: 0,
            jailed_blocks_counter: 0,
        }
    }
}

/// Serializer for `SigningInfo`
#[derive(Clone)]
pub struct SigningInfoSerializer {
    u64_serializer: U64VarIntSerializer,
    address_serializer: AddressSerializer,
    time_serializer: RelayTimeSerializer,
}

impl SigningInfoSerializer {
    /// Creates a new `SigningInfoSerializer`
    pub const fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
            address_serializer: AddressSerializer::new(),
            time_serializer: RelayTimeSerializer::new(),
        }
    }
}

impl Default for SigningInfoSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<SigningInfo> for SigningInfoSerializer {
    fn serialize(&self, value: &SigningInfo, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.u64_serializer.serialize(&STATE_VALUE_VERSION, buffer)?;
        self.address_serializer.serialize(&value.address, buffer)?;
        self.u64_serializer.serialize(&value.start_height, buffer)?;
        self.u64_serializer.serialize(&value.index_offset, buffer)?;
        self.time_serializer.serialize(&value.jailed_until, buffer)?;
        self.u64_serializer
            .serialize(&value.missed_blocks_counter, buffer)?;
        self.u64_serializer
            .serialize(&value.jailed_blocks_counter, buffer)
    }
}

/// Deserializer for `SigningInfo`
#[derive(Clone)]
pub struct SigningInfoDeserializer {
    version_deserializer: U64VarIntDeserializer,
    u64_deserializer: U64VarIntDeserializer,
    address_deserializer: AddressDeserializer,
    time_deserializer: RelayTimeDeserializer,
}

impl SigningInfoDeserializer {
    /// Creates a new `SigningInfoDeserializer`
    pub fn new() -> Self {
        Self {
            version_deserializer: U64VarIntDeserializer::new(
                Included(STATE_VALUE_VERSION),
                Included(STATE_VALUE_VERSION),
            ),
            u64_deserializer: U64VarIntDeserializer::new(Included(0), Included(u64::MAX)),
            address_deserializer: AddressDeserializer::new(),
            time_deserializer: RelayTimeDeserializer::new((
                Included(RelayTime::from_millis(0)),
                Included(RelayTime::max()),
            )),
        }
    }
}

impl Default for SigningInfoDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<SigningInfo> for SigningInfoDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], SigningInfo, E> {
        context(
            "Failed SigningInfo deserialization",
            tuple((
                context("Failed version deserialization", |input| {
                    self.version_deserializer.deserialize(input)
                }),
                context("Failed address deserialization", |input| {
                    self.address_deserializer.deserialize(input)
                }),
                context("Failed start_height deserialization", |input| {
                    self.u64_deserializer.deserialize(input)
                }),
                context("Failed index_offset deserialization", |input| {
                    self.u64_deserializer.deserialize(input)
                }),
                context("Failed jailed_until deserialization", |input| {
                    self.time_deserializer.deserialize(input)
                }),
                context("Failed missed_blocks_counter deserialization", |input| {
                    self.u64_deserializer.deserialize(input)
                }),
                context("Failed jailed_blocks_counter deserialization", |input| {
                    self.u64_deserializer.deserialize(input)
                }),
            )),
        )
        .map(
            |(
                _version,
                address,
                start_height,
                index_offset,
                jailed_until,
                missed_blocks_counter,
                jailed_blocks_counter,
            )| SigningInfo {
                address,
                start_height,
                index_offset,
                jailed_until,
                missed_blocks_counter,
                jailed_blocks_counter,
            },
        )
        .parse(buffer)
    }
}
