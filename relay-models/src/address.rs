// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use relay_hash::Hash;
use relay_serialization::{Deserializer, SerializeError, Serializer};
use relay_signature::PublicKey;
use serde::de::Unexpected;
use std::fmt;
use std::str::FromStr;

/// Size of an address in bytes
pub const ADDRESS_SIZE_BYTES: usize = 20;

/// Account, operator and consensus address.
///
/// Derived from the first `ADDRESS_SIZE_BYTES` bytes of the SHA-256 digest of a
/// public key, or of a module name for module-owned accounts.
/// The all-zero address is the empty address and is never a valid account.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_SIZE_BYTES]);

impl Address {
    /// Computes the address controlled by a public key
    ///
    /// ```
    /// # use relay_signature::KeyPair;
    /// # use relay_models::Address;
    /// let keypair = KeyPair::generate();
    /// let address = Address::from_public_key(&keypair.get_public_key());
    /// assert!(!address.is_empty());
    /// ```
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self::truncate_hash(&Hash::compute_from(&public_key.to_bytes()))
    }

    /// Computes the address of the module account with the given name
    pub fn from_module_name(name: &str) -> Self {
        Self::truncate_hash(&Hash::compute_from(name.as_bytes()))
    }

    fn truncate_hash(hash: &Hash) -> Self {
        let mut bytes = [0u8; ADDRESS_SIZE_BYTES];
        bytes.copy_from_slice(&hash.to_bytes()[..ADDRESS_SIZE_BYTES]);
        Address(bytes)
    }

    /// Builds an address from raw bytes
    pub const fn from_bytes(bytes: [u8; ADDRESS_SIZE_BYTES]) -> Self {
        Address(bytes)
    }

    /// Returns a reference to the raw bytes
    pub fn to_bytes(&self) -> &[u8; ADDRESS_SIZE_BYTES] {
        &self.0
    }

    /// Returns the bitwise complement of the address bytes.
    ///
    /// Used in power index keys so that a reverse scan breaks power ties by ascending address.
    pub fn to_complement_bytes(&self) -> [u8; ADDRESS_SIZE_BYTES] {
        let mut bytes = self.0;
        for byte in bytes.iter_mut() {
            *byte = !*byte;
        }
        bytes
    }

    /// Rebuilds an address from its bitwise complement
    pub fn from_complement_bytes(bytes: &[u8; ADDRESS_SIZE_BYTES]) -> Self {
        let mut address = *bytes;
        for byte in address.iter_mut() {
            *byte = !*byte;
        }
        Address(address)
    }

    /// True for the all-zero address
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|byte| *byte == 0)
    }

    /// Encodes the address using bs58 with checksum
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.0).with_check().into_string()
    }

    /// Decodes an address encoded with `to_bs58_check`
    pub fn from_bs58_check(data: &str) -> Result<Self, ModelsError> {
        let decoded = bs58::decode(data)
            .with_check(None)
            .into_vec()
            .map_err(|err| ModelsError::InvalidAddress(format!("{}", err)))?;
        let bytes: [u8; ADDRESS_SIZE_BYTES] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| ModelsError::InvalidAddress(format!("wrong length for {}", data)))?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl FromStr for Address {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_bs58_check(s)
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&self.to_bs58_check())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Address, D::Error> {
        let s = String::deserialize(d)?;
        Address::from_str(&s)
            .map_err(|_| serde::de::Error::invalid_value(Unexpected::Str(&s), &"a bs58 address"))
    }
}

/// Serializer for `Address`, raw bytes
#[derive(Default, Clone)]
pub struct AddressSerializer;

impl AddressSerializer {
    /// Creates a new `AddressSerializer`
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer<Address> for AddressSerializer {
    fn serialize(&self, value: &Address, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        buffer.extend_from_slice(value.to_bytes());
        Ok(())
    }
}

/// Deserializer for `Address`
#[derive(Default, Clone)]
pub struct AddressDeserializer;

impl AddressDeserializer {
    /// Creates a new `AddressDeserializer`
    pub const fn new() -> Self {
        Self
    }
}

impl Deserializer<Address> for AddressDeserializer {
    /// ```
    /// use relay_models::{Address, AddressSerializer, AddressDeserializer};
    /// use relay_serialization::{Serializer, Deserializer, DeserializeError};
    ///
    /// let address = Address::from_module_name("dao");
    /// let mut buffer = Vec::new();
    /// AddressSerializer::new().serialize(&address, &mut buffer).unwrap();
    /// let (rest, deserialized) = AddressDeserializer::new().deserialize::<DeserializeError>(&buffer).unwrap();
    /// assert!(rest.is_empty());
    /// assert_eq!(address, deserialized);
    /// ```
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Address, E> {
        context("Failed Address deserialization", |input: &'a [u8]| {
            if input.len() < ADDRESS_SIZE_BYTES {
                return Err(nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::LengthValue,
                )));
            }
            let mut bytes = [0u8; ADDRESS_SIZE_BYTES];
            bytes.copy_from_slice(&input[..ADDRESS_SIZE_BYTES]);
            Ok((&input[ADDRESS_SIZE_BYTES..], Address(bytes)))
        })(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_reverses_order() {
        let low = Address::from_bytes([1u8; ADDRESS_SIZE_BYTES]);
        let high = Address::from_bytes([2u8; ADDRESS_SIZE_BYTES]);
        assert!(low < high);
        assert!(low.to_complement_bytes() > high.to_complement_bytes());
        assert_eq!(Address::from_complement_bytes(&low.to_complement_bytes()), low);
    }

    #[test]
    fn test_module_addresses_are_distinct() {
        let staked = Address::from_module_name("staked_tokens_pool");
        let dao = Address::from_module_name("dao");
        assert_ne!(staked, dao);
        assert!(!staked.is_empty());
        assert!(Address::default().is_empty());
    }

    #[test]
    fn test_text_form() {
        let address = Address::from_module_name("fee_collector");
        let text = address.to_string();
        assert_eq!(Address::from_str(&text).unwrap(), address);
        assert!(Address::from_str("not-an-address").is_err());
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);
    }
}
