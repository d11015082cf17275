// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::PosError;
use crate::validator::{RewardDelegators, RewardDelegatorsDeserializer, RewardDelegatorsSerializer};
use nom::{
    error::{context, ContextError, ParseError},
    multi::length_count,
    sequence::tuple,
    IResult, Parser,
};
use relay_hash::Hash;
use relay_models::config::{MAX_REWARD_DELEGATORS, MAX_SERVICE_URL_LENGTH};
use relay_models::{
    validate_service_url, Address, AddressDeserializer, AddressSerializer, Amount,
    AmountDeserializer, AmountSerializer, ChainId, ChainIdDeserializer, ChainIdSerializer,
};
use relay_serialization::{
    Deserializer, OptionDeserializer, OptionSerializer, SerializeError, Serializer,
    StringDeserializer, StringSerializer, U64VarIntDeserializer, U64VarIntSerializer,
};
use relay_signature::{KeyPair, PublicKey, PublicKeyDeserializer, Signature, SignatureDeserializer};
use serde::{Deserialize, Serialize};
use std::ops::Bound::{Excluded, Included};

/// Upper bound on the number of chains carried by a message, the
/// effective limit is the `max_chains` parameter
pub const MAX_MESSAGE_CHAINS: u64 = 256;

/// Registers, stakes or edits a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgStake {
    /// consensus public key of the validator
    pub public_key: PublicKey,
    /// chains served by the validator
    pub chains: Vec<ChainId>,
    /// stake of the validator after the message
    pub value: Amount,
    /// url where relays are served
    pub service_url: String,
    /// output address
    pub output_address: Option<Address>,
    /// reward delegators
    pub reward_delegators: Option<RewardDelegators>,
}

/// Messages handled by the PoS module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PosMessage {
    /// stake or edit a validator
    Stake(MsgStake),
    /// queue a validator for unstaking at the next session boundary
    BeginUnstake {
        /// validator
        address: Address,
        /// operator or output address of the validator
        signer: Address,
    },
    /// put a jailed validator back in the consensus set
    Unjail {
        /// validator
        address: Address,
        /// operator or output address of the validator
        signer: Address,
    },
    /// coin transfer
    Send {
        /// sender
        from: Address,
        /// receiver
        to: Address,
        /// transferred amount
        amount: Amount,
    },
}

/// Checks the percentages of reward delegators
pub fn validate_reward_delegators(delegators: &RewardDelegators) -> Result<(), PosError> {
    if delegators.len() as u64 > MAX_REWARD_DELEGATORS {
        return Err(PosError::InvalidRewardDelegators(format!(
            "at most {} delegators are allowed",
            MAX_REWARD_DELEGATORS
        )));
    }
    let mut total: u64 = 0;
    for (address, share) in delegators {
        if address.is_empty() {
            return Err(PosError::InvalidRewardDelegators(
                "empty delegator address".to_string(),
            ));
        }
        if *share == 0 || *share > 100 {
            return Err(PosError::InvalidRewardDelegators(format!(
                "share of {} must be in 1..=100, got {}",
                address, share
            )));
        }
        total += share;
    }
    if total > 100 {
        return Err(PosError::InvalidRewardDelegators(format!(
            "total share must be at most 100, got {}",
            total
        )));
    }
    Ok(())
}

impl PosMessage {
    /// Stateless checks, run before the message reaches the keeper
    pub fn validate_basic(&self) -> Result<(), PosError> {
        match self {
            PosMessage::Stake(msg) => {
                if msg.value.is_zero() {
                    return Err(PosError::InvalidStake("stake value must be positive".to_string()));
                }
                if msg.chains.is_empty() {
                    return Err(PosError::NoChains);
                }
                validate_service_url(&msg.service_url)?;
                if let Some(output) = &msg.output_address {
                    if output.is_empty() {
                        return Err(PosError::EmptyAddress("output address".to_string()));
                    }
                }
                if let Some(delegators) = &msg.reward_delegators {
                    validate_reward_delegators(delegators)?;
                }
                Ok(())
            }
            PosMessage::BeginUnstake { address, signer }
            | PosMessage::Unjail { address, signer } => {
                if address.is_empty() {
                    return Err(PosError::EmptyAddress("validator address".to_string()));
                }
                if signer.is_empty() {
                    return Err(PosError::EmptyAddress("signer address".to_string()));
                }
                Ok(())
            }
            PosMessage::Send { from, to, amount } => {
                if from.is_empty() || to.is_empty() {
                    return Err(PosError::EmptyAddress("send address".to_string()));
                }
                if amount.is_zero() {
                    return Err(PosError::InvalidSendAmount(
                        "amount must be positive".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Address that must sign the message, `None` when the keeper decides
    /// (a stake may be signed by the operator or by the output address)
    pub fn expected_signer(&self) -> Option<Address> {
        match self {
            PosMessage::Stake(_) => None,
            PosMessage::BeginUnstake { signer, .. } | PosMessage::Unjail { signer, .. } => {
                Some(*signer)
            }
            PosMessage::Send { from, .. } => Some(*from),
        }
    }

    /// Name of the message, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            PosMessage::Stake(_) => "stake",
            PosMessage::BeginUnstake { .. } => "begin_unstake",
            PosMessage::Unjail { .. } => "unjail",
            PosMessage::Send { .. } => "send",
        }
    }
}

const STAKE_TAG: u64 = 0;
const BEGIN_UNSTAKE_TAG: u64 = 1;
const UNJAIL_TAG: u64 = 2;
const SEND_TAG: u64 = 3;

/// Serializer for `PosMessage`: a varint tag followed by the message fields
pub struct PosMessageSerializer {
    u64_serializer: U64VarIntSerializer,
    address_serializer: AddressSerializer,
    amount_serializer: AmountSerializer,
    chain_serializer: ChainIdSerializer,
    string_serializer: StringSerializer,
    output_serializer: OptionSerializer<Address, AddressSerializer>,
    delegators_serializer: RewardDelegatorsSerializer,
}

impl PosMessageSerializer {
    /// Creates a new `PosMessageSerializer`
    pub fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
            address_serializer: AddressSerializer::new(),
            amount_serializer: AmountSerializer::new(),
            chain_serializer: ChainIdSerializer::new(),
            string_serializer: StringSerializer::new(),
            output_serializer: OptionSerializer::new(AddressSerializer::new()),
            delegators_serializer: RewardDelegatorsSerializer::new(),
        }
    }
}

impl Default for PosMessageSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<PosMessage> for PosMessageSerializer {
    fn serialize(&self, value: &PosMessage, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        match value {
            PosMessage::Stake(msg) => {
                self.u64_serializer.serialize(&STAKE_TAG, buffer)?;
                buffer.extend_from_slice(&msg.public_key.to_bytes());
                self.u64_serializer
                    .serialize(&(msg.chains.len() as u64), buffer)?;
                for chain in &msg.chains {
                    self.chain_serializer.serialize(chain, buffer)?;
                }
                self.amount_serializer.serialize(&msg.value, buffer)?;
                self.string_serializer.serialize(&msg.service_url, buffer)?;
                self.output_serializer
                    .serialize(&msg.output_address, buffer)?;
                self.delegators_serializer
                    .serialize(&msg.reward_delegators, buffer)
            }
            PosMessage::BeginUnstake { address, signer } => {
                self.u64_serializer.serialize(&BEGIN_UNSTAKE_TAG, buffer)?;
                self.address_serializer.serialize(address, buffer)?;
                self.address_serializer.serialize(signer, buffer)
            }
            PosMessage::Unjail { address, signer } => {
                self.u64_serializer.serialize(&UNJAIL_TAG, buffer)?;
                self.address_serializer.serialize(address, buffer)?;
                self.address_serializer.serialize(signer, buffer)
            }
            PosMessage::Send { from, to, amount } => {
                self.u64_serializer.serialize(&SEND_TAG, buffer)?;
                self.address_serializer.serialize(from, buffer)?;
                self.address_serializer.serialize(to, buffer)?;
                self.amount_serializer.serialize(amount, buffer)
            }
        }
    }
}

/// Deserializer for `PosMessage`
pub struct PosMessageDeserializer {
    tag_deserializer: U64VarIntDeserializer,
    chains_len_deserializer: U64VarIntDeserializer,
    public_key_deserializer: PublicKeyDeserializer,
    address_deserializer: AddressDeserializer,
    amount_deserializer: AmountDeserializer,
    chain_deserializer: ChainIdDeserializer,
    string_deserializer: StringDeserializer,
    output_deserializer: OptionDeserializer<Address, AddressDeserializer>,
    delegators_deserializer: RewardDelegatorsDeserializer,
}

impl PosMessageDeserializer {
    /// Creates a new `PosMessageDeserializer`
    pub fn new() -> Self {
        Self {
            tag_deserializer: U64VarIntDeserializer::new(Included(STAKE_TAG), Included(SEND_TAG)),
            chains_len_deserializer: U64VarIntDeserializer::new(
                Included(0),
                Included(MAX_MESSAGE_CHAINS),
            ),
            public_key_deserializer: PublicKeyDeserializer::new(),
            address_deserializer: AddressDeserializer::new(),
            amount_deserializer: AmountDeserializer::default(),
            chain_deserializer: ChainIdDeserializer::new(),
            string_deserializer: StringDeserializer::new(
                Included(0),
                Excluded(MAX_SERVICE_URL_LENGTH as u64 + 1),
            ),
            output_deserializer: OptionDeserializer::new(AddressDeserializer::new()),
            delegators_deserializer: RewardDelegatorsDeserializer::new(),
        }
    }

    fn deserialize_stake<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], PosMessage, E> {
        context(
            "Failed MsgStake deserialization",
            tuple((
                |input| self.public_key_deserializer.deserialize(input),
                length_count(
                    |input| self.chains_len_deserializer.deserialize(input),
                    |input| self.chain_deserializer.deserialize(input),
                ),
                |input| self.amount_deserializer.deserialize(input),
                |input| self.string_deserializer.deserialize(input),
                |input| self.output_deserializer.deserialize(input),
                |input| self.delegators_deserializer.deserialize(input),
            )),
        )
        .map(
            |(public_key, chains, value, service_url, output_address, reward_delegators)| {
                PosMessage::Stake(MsgStake {
                    public_key,
                    chains,
                    value,
                    service_url,
                    output_address,
                    reward_delegators,
                })
            },
        )
        .parse(buffer)
    }

    fn deserialize_address_pair<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], (Address, Address), E> {
        tuple((
            |input| self.address_deserializer.deserialize(input),
            |input| self.address_deserializer.deserialize(input),
        ))
        .parse(buffer)
    }
}

impl Default for PosMessageDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<PosMessage> for PosMessageDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], PosMessage, E> {
        let (rest, tag) = context("Failed message tag deserialization", |input| {
            self.tag_deserializer.deserialize(input)
        })
        .parse(buffer)?;
        match tag {
            STAKE_TAG => self.deserialize_stake(rest),
            BEGIN_UNSTAKE_TAG => context("Failed BeginUnstake deserialization", |input| {
                self.deserialize_address_pair(input)
            })
            .map(|(address, signer)| PosMessage::BeginUnstake { address, signer })
            .parse(rest),
            UNJAIL_TAG => context("Failed Unjail deserialization", |input| {
                self.deserialize_address_pair(input)
            })
            .map(|(address, signer)| PosMessage::Unjail { address, signer })
            .parse(rest),
            _ => context(
                "Failed Send deserialization",
                tuple((
                    |input| self.address_deserializer.deserialize(input),
                    |input| self.address_deserializer.deserialize(input),
                    |input| self.amount_deserializer.deserialize(input),
                )),
            )
            .map(|(from, to, amount)| PosMessage::Send { from, to, amount })
            .parse(rest),
        }
    }
}

/// Message signed by its sender, with the fee it pays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTx {
    /// message
    pub msg: PosMessage,
    /// fee paid to the fee collector
    pub fee: Amount,
    /// public key of the sender
    pub public_key: PublicKey,
    /// signature of `signing_hash(msg, fee)`
    pub signature: Signature,
}

/// Hash signed by the sender of a transaction
pub fn signing_hash(msg: &PosMessage, fee: &Amount) -> Result<Hash, PosError> {
    let mut buffer = Vec::new();
    PosMessageSerializer::new()
        .serialize(msg, &mut buffer)
        .map_err(|err| PosError::SerializationError(err.to_string()))?;
    AmountSerializer::new()
        .serialize(fee, &mut buffer)
        .map_err(|err| PosError::SerializationError(err.to_string()))?;
    Ok(Hash::compute_from(&buffer))
}

impl SignedTx {
    /// Signs `msg` with `keypair`
    pub fn new_signed(msg: PosMessage, fee: Amount, keypair: &KeyPair) -> Result<Self, PosError> {
        let hash = signing_hash(&msg, &fee)?;
        Ok(SignedTx {
            msg,
            fee,
            public_key: keypair.get_public_key(),
            signature: keypair.sign(&hash),
        })
    }

    /// Address of the sender
    pub fn signer(&self) -> Address {
        Address::from_public_key(&self.public_key)
    }

    /// Checks the signature of the transaction
    pub fn verify_signature(&self) -> Result<(), PosError> {
        let hash = signing_hash(&self.msg, &self.fee)?;
        self.public_key
            .verify_signature(&hash, &self.signature)
            .map_err(|err| PosError::InvalidSignature(err.to_string()))
    }
}

/// Serializer for `SignedTx`
pub struct SignedTxSerializer {
    msg_serializer: PosMessageSerializer,
    amount_serializer: AmountSerializer,
}

impl SignedTxSerializer {
    /// Creates a new `SignedTxSerializer`
    pub fn new() -> Self {
        Self {
            msg_serializer: PosMessageSerializer::new(),
            amount_serializer: AmountSerializer::new(),
        }
    }
}

impl Default for SignedTxSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<SignedTx> for SignedTxSerializer {
    fn serialize(&self, value: &SignedTx, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.msg_serializer.serialize(&value.msg, buffer)?;
        self.amount_serializer.serialize(&value.fee, buffer)?;
        buffer.extend_from_slice(&value.public_key.to_bytes());
        buffer.extend_from_slice(&value.signature.to_bytes());
        Ok(())
    }
}

/// Deserializer for `SignedTx`
pub struct SignedTxDeserializer {
    msg_deserializer: PosMessageDeserializer,
    amount_deserializer: AmountDeserializer,
    public_key_deserializer: PublicKeyDeserializer,
    signature_deserializer: SignatureDeserializer,
}

impl SignedTxDeserializer {
    /// Creates a new `SignedTxDeserializer`
    pub fn new() -> Self {
        Self {
            msg_deserializer: PosMessageDeserializer::new(),
            amount_deserializer: AmountDeserializer::default(),
            public_key_deserializer: PublicKeyDeserializer::new(),
            signature_deserializer: SignatureDeserializer::new(),
        }
    }
}

impl Default for SignedTxDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<SignedTx> for SignedTxDeserializer {
    /// ```
    /// use relay_models::{Address, Amount};
    /// use relay_pos_exports::{PosMessage, SignedTx, SignedTxDeserializer, SignedTxSerializer};
    /// use relay_serialization::{deserialize_all, Serializer};
    /// use relay_signature::KeyPair;
    ///
    /// let keypair = KeyPair::generate();
    /// let from = Address::from_public_key(&keypair.get_public_key());
    /// let msg = PosMessage::Send { from, to: Address::from_module_name("to"), amount: Amount::from_raw(5) };
    /// let tx = SignedTx::new_signed(msg, Amount::from_raw(1), &keypair).unwrap();
    /// let mut buffer = Vec::new();
    /// SignedTxSerializer::new().serialize(&tx, &mut buffer).unwrap();
    /// let decoded = deserialize_all(&SignedTxDeserializer::new(), &buffer).unwrap();
    /// assert_eq!(tx, decoded);
    /// decoded.verify_signature().unwrap();
    /// ```
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], SignedTx, E> {
        context(
            "Failed SignedTx deserialization",
            tuple((
                |input| self.msg_deserializer.deserialize(input),
                |input| self.amount_deserializer.deserialize(input),
                |input| self.public_key_deserializer.deserialize(input),
                |input| self.signature_deserializer.deserialize(input),
            )),
        )
        .map(|(msg, fee, public_key, signature)| SignedTx {
            msg,
            fee,
            public_key,
            signature,
        })
        .parse(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use relay_serialization::deserialize_all;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    fn stake_msg() -> MsgStake {
        MsgStake {
            public_key: KeyPair::generate().get_public_key(),
            chains: vec![ChainId::from_str("0001").unwrap()],
            value: Amount::from_raw(1_000_000),
            service_url: "https://a.example:443".to_string(),
            output_address: None,
            reward_delegators: None,
        }
    }

    #[test]
    fn test_stake_validate_basic() {
        PosMessage::Stake(stake_msg()).validate_basic().unwrap();

        let mut msg = stake_msg();
        msg.value = Amount::zero();
        assert_matches!(
            PosMessage::Stake(msg).validate_basic(),
            Err(PosError::InvalidStake(_))
        );

        let mut msg = stake_msg();
        msg.chains.clear();
        assert_matches!(PosMessage::Stake(msg).validate_basic(), Err(PosError::NoChains));

        let mut msg = stake_msg();
        msg.service_url = "https://a.example".to_string();
        assert_matches!(
            PosMessage::Stake(msg).validate_basic(),
            Err(PosError::InvalidServiceUrl(_))
        );

        let mut msg = stake_msg();
        msg.reward_delegators = Some(BTreeMap::from([
            (Address::from_module_name("d1"), 60),
            (Address::from_module_name("d2"), 41),
        ]));
        assert_matches!(
            PosMessage::Stake(msg).validate_basic(),
            Err(PosError::InvalidRewardDelegators(_))
        );
    }

    #[test]
    fn test_send_validate_basic() {
        let from = Address::from_module_name("from");
        let to = Address::from_module_name("to");
        assert_matches!(
            PosMessage::Send { from, to, amount: Amount::zero() }.validate_basic(),
            Err(PosError::InvalidSendAmount(_))
        );
        assert_matches!(
            PosMessage::Send { from: Address::default(), to, amount: Amount::from_raw(1) }
                .validate_basic(),
            Err(PosError::EmptyAddress(_))
        );
        PosMessage::Send { from, to, amount: Amount::from_raw(1) }
            .validate_basic()
            .unwrap();
    }

    #[test]
    fn test_message_codec() {
        let mut msg = stake_msg();
        msg.output_address = Some(Address::from_module_name("output"));
        msg.reward_delegators = Some(BTreeMap::from([(Address::from_module_name("d1"), 10)]));
        let messages = vec![
            PosMessage::Stake(msg),
            PosMessage::BeginUnstake {
                address: Address::from_module_name("a"),
                signer: Address::from_module_name("b"),
            },
            PosMessage::Unjail {
                address: Address::from_module_name("a"),
                signer: Address::from_module_name("a"),
            },
        ];
        for message in messages {
            let mut buffer = Vec::new();
            PosMessageSerializer::new()
                .serialize(&message, &mut buffer)
                .unwrap();
            assert_eq!(
                deserialize_all(&PosMessageDeserializer::new(), &buffer).unwrap(),
                message
            );
        }
        assert!(deserialize_all(&PosMessageDeserializer::new(), &[4u8]).is_err());
    }

    #[test]
    fn test_tampered_tx_is_rejected() {
        let keypair = KeyPair::generate();
        let from = Address::from_public_key(&keypair.get_public_key());
        let msg = PosMessage::Send {
            from,
            to: Address::from_module_name("to"),
            amount: Amount::from_raw(5),
        };
        let mut tx = SignedTx::new_signed(msg, Amount::from_raw(1), &keypair).unwrap();
        tx.verify_signature().unwrap();
        assert_eq!(tx.signer(), from);
        tx.fee = Amount::from_raw(0);
        assert_matches!(tx.verify_signature(), Err(PosError::InvalidSignature(_)));
    }
}
