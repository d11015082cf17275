// Copyright (c) 2022 MASSA LABS <info@massa.net>

use nom::{
    error::{context, ContextError, ParseError},
    multi::length_count,
    sequence::tuple,
    IResult, Parser,
};
use relay_models::config::{MAX_REWARD_DELEGATORS, MAX_SERVICE_URL_LENGTH, STATE_VALUE_VERSION};
use relay_models::{
    Address, AddressDeserializer, AddressSerializer, Amount, AmountDeserializer,
    AmountSerializer, ChainId, ChainIdDeserializer, ChainIdSerializer,
};
use relay_serialization::{
    BoolDeserializer, BoolSerializer, Deserializer, OptionDeserializer, OptionSerializer,
    SerializeError, Serializer, StringDeserializer, StringSerializer, U64VarIntDeserializer,
    U64VarIntSerializer,
};
use relay_signature::{PublicKey, PublicKeyDeserializer};
use relay_time::{RelayTime, RelayTimeDeserializer, RelayTimeSerializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included};

/// Reward delegators of a validator: address -> percentage of the node reward
pub type RewardDelegators = BTreeMap<Address, u64>;

/// Bonding status of a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValidatorStatus {
    /// no bonded stake
    Unstaked,
    /// leaving: stake is paid back at `unstaking_completion_time`
    Unstaking,
    /// bonded
    Staked,
}

impl ValidatorStatus {
    fn to_u64(self) -> u64 {
        match self {
            ValidatorStatus::Unstaked => 0,
            ValidatorStatus::Unstaking => 1,
            ValidatorStatus::Staked => 2,
        }
    }

    fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(ValidatorStatus::Unstaked),
            1 => Some(ValidatorStatus::Unstaking),
            2 => Some(ValidatorStatus::Staked),
            _ => None,
        }
    }
}

/// Validator record, keyed by its operator address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// operator address, derived from `public_key`
    pub address: Address,
    /// consensus public key
    pub public_key: PublicKey,
    /// jailed validators stay staked but are out of the consensus set
    pub jailed: bool,
    /// bonding status
    pub status: ValidatorStatus,
    /// served chains, strictly increasing
    pub chains: Vec<ChainId>,
    /// url where the validator serves relays
    pub service_url: String,
    /// bonded stake
    pub staked_tokens: Amount,
    /// time at which an unstaking validator is paid back, zero otherwise
    pub unstaking_completion_time: RelayTime,
    /// reward and unstake destination once set
    pub output_address: Option<Address>,
    /// share of the node rewards redirected to other addresses
    pub reward_delegators: Option<RewardDelegators>,
}

impl Validator {
    /// Creates a new unstaked validator record
    pub fn new(
        public_key: PublicKey,
        chains: Vec<ChainId>,
        service_url: String,
        output_address: Option<Address>,
        reward_delegators: Option<RewardDelegators>,
    ) -> Self {
        let mut chains = chains;
        chains.sort();
        chains.dedup();
        Validator {
            address: Address::from_public_key(&public_key),
            public_key,
            jailed: false,
            status: ValidatorStatus::Unstaked,
            chains,
            service_url,
            staked_tokens: Amount::zero(),
            unstaking_completion_time: RelayTime::from_millis(0),
            output_address,
            reward_delegators,
        }
    }

    /// True if the validator is staked
    pub fn is_staked(&self) -> bool {
        self.status == ValidatorStatus::Staked
    }

    /// True if the validator is unstaking
    pub fn is_unstaking(&self) -> bool {
        self.status == ValidatorStatus::Unstaking
    }

    /// True if the validator is unstaked
    pub fn is_unstaked(&self) -> bool {
        self.status == ValidatorStatus::Unstaked
    }

    /// Consensus power of the validator
    pub fn consensus_power(&self, power_reduction: u64) -> u64 {
        self.staked_tokens.to_raw() / power_reduction
    }

    /// Sum of the delegator percentages, zero without delegators
    pub fn delegators_share(&self) -> u64 {
        self.reward_delegators
            .as_ref()
            .map(|delegators| {
                delegators
                    .values()
                    .fold(0u64, |sum, share| sum.saturating_add(*share))
            })
            .unwrap_or(0)
    }
}

/// Serializer for optional reward delegators: presence flag, count, then
/// `(address, share)` pairs in increasing address order
pub struct RewardDelegatorsSerializer {
    bool_serializer: BoolSerializer,
    u64_serializer: U64VarIntSerializer,
    address_serializer: AddressSerializer,
}

impl RewardDelegatorsSerializer {
    /// Creates a new `RewardDelegatorsSerializer`
    pub const fn new() -> Self {
        Self {
            bool_serializer: BoolSerializer::new(),
            u64_serializer: U64VarIntSerializer::new(),
            address_serializer: AddressSerializer::new(),
        }
    }
}

impl Default for RewardDelegatorsSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<Option<RewardDelegators>> for RewardDelegatorsSerializer {
    fn serialize(
        &self,
        value: &Option<RewardDelegators>,
        buffer: &mut Vec<u8>,
    ) -> Result<(), SerializeError> {
        match value {
            None => self.bool_serializer.serialize(&false, buffer),
            Some(delegators) => {
                self.bool_serializer.serialize(&true, buffer)?;
                self.u64_serializer
                    .serialize(&(delegators.len() as u64), buffer)?;
                for (address, share) in delegators {
                    self.address_serializer.serialize(address, buffer)?;
                    self.u64_serializer.serialize(share, buffer)?;
                }
                Ok(())
            }
        }
    }
}

/// Deserializer for optional reward delegators, rejects unsorted or duplicated addresses
pub struct RewardDelegatorsDeserializer {
    bool_deserializer: BoolDeserializer,
    len_deserializer: U64VarIntDeserializer,
    address_deserializer: AddressDeserializer,
    share_deserializer: U64VarIntDeserializer,
}

impl RewardDelegatorsDeserializer {
    /// Creates a new `RewardDelegatorsDeserializer`
    pub const fn new() -> Self {
        Self {
            bool_deserializer: BoolDeserializer::new(),
            len_deserializer: U64VarIntDeserializer::new(
                Included(0),
                Included(MAX_REWARD_DELEGATORS),
            ),
            address_deserializer: AddressDeserializer::new(),
            share_deserializer: U64VarIntDeserializer::new(Included(0), Excluded(101)),
        }
    }
}

impl Default for RewardDelegatorsDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<Option<RewardDelegators>> for RewardDelegatorsDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Option<RewardDelegators>, E> {
        let (rest, present) = self.bool_deserializer.deserialize(buffer)?;
        if !present {
            return Ok((rest, None));
        }
        let (rest, entries) = length_count(
            |input| self.len_deserializer.deserialize(input),
            tuple((
                |input| self.address_deserializer.deserialize(input),
                |input| self.share_deserializer.deserialize(input),
            )),
        )(rest)?;
        if entries.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(nom::Err::Error(ParseError::from_error_kind(
                buffer,
                nom::error::ErrorKind::Verify,
            )));
        }
        Ok((rest, Some(entries.into_iter().collect())))
    }
}

/// Serializer for the key-value payload of a `Validator`
pub struct ValidatorSerializer {
    u64_serializer: U64VarIntSerializer,
    address_serializer: AddressSerializer,
    bool_serializer: BoolSerializer,
    chain_serializer: ChainIdSerializer,
    string_serializer: StringSerializer,
    amount_serializer: AmountSerializer,
    time_serializer: RelayTimeSerializer,
    output_serializer: OptionSerializer<Address, AddressSerializer>,
    delegators_serializer: RewardDelegatorsSerializer,
}

impl ValidatorSerializer {
    /// Creates a new `ValidatorSerializer`
    pub fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
            address_serializer: AddressSerializer::new(),
            bool_serializer: BoolSerializer::new(),
            chain_serializer: ChainIdSerializer::new(),
            string_serializer: StringSerializer::new(),
            amount_serializer: AmountSerializer::new(),
            time_serializer: RelayTimeSerializer::new(),
            output_serializer: OptionSerializer::new(AddressSerializer::new()),
            delegators_serializer: RewardDelegatorsSerializer::new(),
        }
    }
}

impl Default for ValidatorSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<Validator> for ValidatorSerializer {
    fn serialize(&self, value: &Validator, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        if value.chains.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(SerializeError::GeneralError(
                "validator chains must be strictly increasing".to_string(),
            ));
        }
        self.u64_serializer.serialize(&STATE_VALUE_VERSION, buffer)?;
        self.address_serializer.serialize(&value.address, buffer)?;
        buffer.extend_from_slice(&value.public_key.to_bytes());
        self.bool_serializer.serialize(&value.jailed, buffer)?;
        self.u64_serializer
            .serialize(&value.status.to_u64(), buffer)?;
        self.u64_serializer
            .serialize(&(value.chains.len() as u64), buffer)?;
        for chain in &value.chains {
            self.chain_serializer.serialize(chain, buffer)?;
        }
        self.string_serializer
            .serialize(&value.service_url, buffer)?;
        self.amount_serializer
            .serialize(&value.staked_tokens, buffer)?;
        self.time_serializer
            .serialize(&value.unstaking_completion_time, buffer)?;
        self.output_serializer
            .serialize(&value.output_address, buffer)?;
        self.delegators_serializer
            .serialize(&value.reward_delegators, buffer)
    }
}

/// Deserializer for `Validator`.
///
/// Only accepts the canonical form: known version, chains and delegators
/// strictly increasing, address matching the public key.
pub struct ValidatorDeserializer {
    version_deserializer: U64VarIntDeserializer,
    status_deserializer: U64VarIntDeserializer,
    address_deserializer: AddressDeserializer,
    public_key_deserializer: PublicKeyDeserializer,
    bool_deserializer: BoolDeserializer,
    chains_len_deserializer: U64VarIntDeserializer,
    chain_deserializer: ChainIdDeserializer,
    service_url_deserializer: StringDeserializer,
    amount_deserializer: AmountDeserializer,
    time_deserializer: RelayTimeDeserializer,
    output_deserializer: OptionDeserializer<Address, AddressDeserializer>,
    delegators_deserializer: RewardDelegatorsDeserializer,
}

impl ValidatorDeserializer {
    /// Creates a new `ValidatorDeserializer`
    ///
    /// Arguments:
    /// * `max_chains`: maximum number of chains in a record
    pub fn new(max_chains: u64) -> Self {
        Self {
            version_deserializer: U64VarIntDeserializer::new(
                Included(STATE_VALUE_VERSION),
                Included(STATE_VALUE_VERSION),
            ),
            status_deserializer: U64VarIntDeserializer::new(Included(0), Included(2)),
            address_deserializer: AddressDeserializer::new(),
            public_key_deserializer: PublicKeyDeserializer::new(),
            bool_deserializer: BoolDeserializer::new(),
            chains_len_deserializer: U64VarIntDeserializer::new(Included(0), Included(max_chains)),
            chain_deserializer: ChainIdDeserializer::new(),
            service_url_deserializer: StringDeserializer::new(
                Included(0),
                Included(MAX_SERVICE_URL_LENGTH as u64),
            ),
            amount_deserializer: AmountDeserializer::default(),
            time_deserializer: RelayTimeDeserializer::new((
                Included(RelayTime::from_millis(0)),
                Included(RelayTime::max()),
            )),
            output_deserializer: OptionDeserializer::new(AddressDeserializer::new()),
            delegators_deserializer: RewardDelegatorsDeserializer::new(),
        }
    }
}

impl Deserializer<Validator> for ValidatorDeserializer {
    /// ```
    /// use relay_models::{Amount, ChainId};
    /// use relay_pos_exports::{Validator, ValidatorSerializer, ValidatorDeserializer};
    /// use relay_serialization::{deserialize_all, Serializer};
    /// use relay_signature::KeyPair;
    /// use std::str::FromStr;
    ///
    /// let keypair = KeyPair::generate();
    /// let mut validator = Validator::new(
    ///     keypair.get_public_key(),
    ///     vec![ChainId::from_str("0001").unwrap()],
    ///     "https://a.example:443".to_string(),
    ///     None,
    ///     None,
    /// );
    /// validator.staked_tokens = Amount::from_raw(1_000_000);
    /// let mut buffer = Vec::new();
    /// ValidatorSerializer::new().serialize(&validator, &mut buffer).unwrap();
    /// let deserialized = deserialize_all(&ValidatorDeserializer::new(15), &buffer).unwrap();
    /// assert_eq!(validator, deserialized);
    /// ```
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Validator, E> {
        let (rest, validator) = context(
            "Failed Validator deserialization",
            tuple((
                context("Failed version deserialization", |input| {
                    self.version_deserializer.deserialize(input)
                }),
                context("Failed address deserialization", |input| {
                    self.address_deserializer.deserialize(input)
                }),
                context("Failed public_key deserialization", |input| {
                    self.public_key_deserializer.deserialize(input)
                }),
                context("Failed jailed deserialization", |input| {
                    self.bool_deserializer.deserialize(input)
                }),
                context("Failed status deserialization", |input| {
                    self.status_deserializer.deserialize(input)
                }),
                context(
                    "Failed chains deserialization",
                    length_count(
                        |input| self.chains_len_deserializer.deserialize(input),
                        |input| self.chain_deserializer.deserialize(input),
                    ),
                ),
                context("Failed service_url deserialization", |input| {
                    self.service_url_deserializer.deserialize(input)
                }),
                context("Failed staked_tokens deserialization", |input| {
                    self.amount_deserializer.deserialize(input)
                }),
                context("Failed unstaking_completion_time deserialization", |input| {
                    self.time_deserializer.deserialize(input)
                }),
                context("Failed output_address deserialization", |input| {
                    self.output_deserializer.deserialize(input)
                }),
                context("Failed reward_delegators deserialization", |input| {
                    self.delegators_deserializer.deserialize(input)
                }),
            )),
        )
        .map(
            |(
                _version,
                address,
                public_key,
                jailed,
                status,
                chains,
                service_url,
                staked_tokens,
                unstaking_completion_time,
                output_address,
                reward_delegators,
            )| {
                Validator {
                    address,
                    public_key,
                    jailed,
                    // bounded by the deserializer
                    status: ValidatorStatus::from_u64(status).unwrap_or(ValidatorStatus::Unstaked),
                    chains,
                    service_url,
                    staked_tokens,
                    unstaking_completion_time,
                    output_address,
                    reward_delegators,
                }
            },
        )
        .parse(buffer)?;
        if validator.address != Address::from_public_key(&validator.public_key)
            || validator.chains.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(nom::Err::Error(ParseError::from_error_kind(
                buffer,
                nom::error::ErrorKind::Verify,
            )));
        }
        Ok((rest, validator))
    }
}
