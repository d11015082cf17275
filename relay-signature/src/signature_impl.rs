// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::SignatureError;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use nom::{
    error::{context, ContextError, ParseError},
    IResult,
};
use relay_hash::Hash;
use relay_serialization::Deserializer;
use std::{cmp::Ordering, str::FromStr};

/// Size of a public key
pub const PUBLIC_KEY_SIZE_BYTES: usize = 32;
/// Size of a secret key
pub const SECRET_KEY_BYTES_SIZE: usize = 32;
/// Size of a signature
pub const SIGNATURE_SIZE_BYTES: usize = 64;

fn decode_bs58_check<const N: usize>(data: &str) -> Result<[u8; N], SignatureError> {
    let decoded = bs58::decode(data)
        .with_check(None)
        .into_vec()
        .map_err(|err| SignatureError::ParsingError(format!("{}", err)))?;
    decoded
        .as_slice()
        .try_into()
        .map_err(|err| SignatureError::ParsingError(format!("{}", err)))
}

/// `KeyPair` is used to sign transactions
#[derive(Clone)]
pub struct KeyPair(SigningKey);

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "KeyPair({})", self.get_public_key())
    }
}

impl KeyPair {
    /// Generate a new `KeyPair`
    ///
    /// # Example
    /// ```
    /// # use relay_signature::KeyPair;
    /// # use relay_hash::Hash;
    /// let keypair = KeyPair::generate();
    /// let data = Hash::compute_from("Hello World!".as_bytes());
    /// let signature = keypair.sign(&data);
    /// assert!(keypair.get_public_key().verify_signature(&data, &signature).is_ok());
    /// ```
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        KeyPair(SigningKey::generate(&mut rng))
    }

    /// Returns the Signature produced by signing the given hash with this keypair
    pub fn sign(&self, hash: &Hash) -> Signature {
        Signature(self.0.sign(hash.to_bytes()))
    }

    /// Return the bytes of the secret key
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_BYTES_SIZE] {
        self.0.to_bytes()
    }

    /// Build a keypair from the bytes of its secret key
    pub fn from_bytes(data: &[u8; SECRET_KEY_BYTES_SIZE]) -> Self {
        KeyPair(SigningKey::from_bytes(data))
    }

    /// Get the public key of the keypair
    pub fn get_public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Encode the secret key using bs58 with checksum
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Decode a secret key encoded using bs58 with checksum
    pub fn from_bs58_check(data: &str) -> Result<Self, SignatureError> {
        Ok(KeyPair::from_bytes(&decode_bs58_check(data)?))
    }
}

impl FromStr for KeyPair {
    type Err = SignatureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPair::from_bs58_check(s)
    }
}

/// Public key used to check signatures and to derive addresses
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_bytes().hash(state);
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl FromStr for PublicKey {
    type Err = SignatureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PublicKey::from_bs58_check(s)
    }
}

impl PublicKey {
    /// Checks if the `Signature` associated with data bytes
    /// was produced with the `KeyPair` associated to this `PublicKey`
    pub fn verify_signature(
        &self,
        hash: &Hash,
        signature: &Signature,
    ) -> Result<(), SignatureError> {
        self.0
            .verify_strict(hash.to_bytes(), &signature.0)
            .map_err(|err| SignatureError::SignatureVerificationError(err.to_string()))
    }

    /// Serialize a `PublicKey` using bs58 encoding with checksum.
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Serialize a `PublicKey` as bytes.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// Deserialize a `PublicKey` using bs58 encoding with checksum.
    pub fn from_bs58_check(data: &str) -> Result<PublicKey, SignatureError> {
        PublicKey::from_bytes(&decode_bs58_check(data)?)
    }

    /// Deserialize a `PublicKey` from bytes, rejecting points that are not on the curve.
    pub fn from_bytes(data: &[u8; PUBLIC_KEY_SIZE_BYTES]) -> Result<PublicKey, SignatureError> {
        Ok(PublicKey(VerifyingKey::from_bytes(data)?))
    }
}

/// Deserializer for `PublicKey`, reads exactly `PUBLIC_KEY_SIZE_BYTES` bytes
#[derive(Default, Clone)]
pub struct PublicKeyDeserializer;

impl PublicKeyDeserializer {
    /// Creates a `PublicKeyDeserializer`
    pub const fn new() -> Self {
        Self
    }
}

impl Deserializer<PublicKey> for PublicKeyDeserializer {
    /// ```
    /// use relay_signature::{PublicKey, PublicKeyDeserializer, KeyPair};
    /// use relay_serialization::{DeserializeError, Deserializer};
    ///
    /// let keypair = KeyPair::generate();
    /// let public_key = keypair.get_public_key();
    /// let serialized = public_key.to_bytes();
    /// let (rest, deser_public_key) = PublicKeyDeserializer::new().deserialize::<DeserializeError>(&serialized).unwrap();
    /// assert!(rest.is_empty());
    /// assert_eq!(public_key, deser_public_key);
    /// ```
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], PublicKey, E> {
        context("Failed PublicKey deserialization", |input: &'a [u8]| {
            if input.len() < PUBLIC_KEY_SIZE_BYTES {
                return Err(nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::LengthValue,
                )));
            }
            let mut bytes = [0u8; PUBLIC_KEY_SIZE_BYTES];
            bytes.copy_from_slice(&input[..PUBLIC_KEY_SIZE_BYTES]);
            let key = PublicKey::from_bytes(&bytes).map_err(|_| {
                nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::Verify,
                ))
            })?;
            Ok((&input[PUBLIC_KEY_SIZE_BYTES..], key))
        })(buffer)
    }
}

/// Signature generated from a message and a `KeyPair`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl FromStr for Signature {
    type Err = SignatureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signature::from_bs58_check(s)
    }
}

impl Signature {
    /// Serialize a `Signature` using bs58 encoding with checksum.
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Serialize a Signature as bytes.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// Deserialize a `Signature` using bs58 encoding with checksum.
    pub fn from_bs58_check(data: &str) -> Result<Signature, SignatureError> {
        Ok(Signature::from_bytes(&decode_bs58_check(data)?))
    }

    /// Deserialize a Signature from bytes.
    pub fn from_bytes(data: &[u8; SIGNATURE_SIZE_BYTES]) -> Signature {
        Signature(ed25519_dalek::Signature::from_bytes(data))
    }
}

/// Deserializer for `Signature`, reads exactly `SIGNATURE_SIZE_BYTES` bytes
#[derive(Default, Clone)]
pub struct SignatureDeserializer;

impl SignatureDeserializer {
    /// Creates a `SignatureDeserializer`
    pub const fn new() -> Self {
        Self
    }
}

impl Deserializer<Signature> for SignatureDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Signature, E> {
        context("Failed Signature deserialization", |input: &'a [u8]| {
            if input.len() < SIGNATURE_SIZE_BYTES {
                return Err(nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::LengthValue,
                )));
            }
            let mut bytes = [0u8; SIGNATURE_SIZE_BYTES];
            bytes.copy_from_slice(&input[..SIGNATURE_SIZE_BYTES]);
            Ok((
                &input[SIGNATURE_SIZE_BYTES..],
                Signature::from_bytes(&bytes),
            ))
        })(buffer)
    }
}

macro_rules! bs58_serde {
    ($type:ident) => {
        impl ::serde::Serialize for $type {
            fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.collect_str(&self.to_bs58_check())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $type {
            fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<$type, D::Error> {
                let s = <String as ::serde::Deserialize>::deserialize(d)?;
                $type::from_bs58_check(&s).map_err(::serde::de::Error::custom)
            }
        }
    };
}

bs58_serde!(PublicKey);
bs58_serde!(Signature);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let hash = Hash::compute_from(b"stake");
        let signature = keypair.sign(&hash);
        let public_key = keypair.get_public_key();
        assert!(public_key.verify_signature(&hash, &signature).is_ok());

        let other = Hash::compute_from(b"unstake");
        assert!(public_key.verify_signature(&other, &signature).is_err());
    }

    #[test]
    fn test_keypair_restored_from_bytes() {
        let keypair = KeyPair::generate();
        let restored = KeyPair::from_bs58_check(&keypair.to_bs58_check()).unwrap();
        assert_eq!(keypair.get_public_key(), restored.get_public_key());
    }

    #[test]
    fn test_public_key_serde_json() {
        let public_key = KeyPair::generate().get_public_key();
        let serialized = serde_json::to_string(&public_key).unwrap();
        let deserialized: PublicKey = serde_json::from_str(&serialized).unwrap();
        assert_eq!(public_key, deserialized);
    }

    #[test]
    fn test_public_key_deserializer_needs_full_key() {
        let public_key = KeyPair::generate().get_public_key();
        let bytes = public_key.to_bytes();
        assert!(PublicKeyDeserializer::new()
            .deserialize::<relay_serialization::DeserializeError>(&bytes[..31])
            .is_err());
    }
}
