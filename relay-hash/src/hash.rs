// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::HashError;
use crate::settings::HASH_SIZE_BYTES;
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// SHA-256 digest
#[derive(Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Hash)]
pub struct Hash([u8; HASH_SIZE_BYTES]);

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl Hash {
    /// Compute a hash from data.
    ///
    /// # Example
    ///  ```
    /// # use relay_hash::Hash;
    /// let hash = Hash::compute_from(&"hello world".as_bytes());
    /// ```
    pub fn compute_from(data: &[u8]) -> Self {
        Self::compute_from_tuple(&[data])
    }

    /// Compute a hash from several byte slices, as if they were concatenated
    pub fn compute_from_tuple(data: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for chunk in data {
            hasher.update(chunk);
        }
        let mut bytes = [0u8; HASH_SIZE_BYTES];
        bytes.copy_from_slice(&hasher.finalize());
        Hash(bytes)
    }

    /// Serialize a Hash using bs58 encoding with checksum.
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Returns a reference to the underlying bytes
    pub fn to_bytes(&self) -> &[u8; HASH_SIZE_BYTES] {
        &self.0
    }

    /// Convert into bytes.
    pub fn into_bytes(self) -> [u8; HASH_SIZE_BYTES] {
        self.0
    }

    /// Deserialize using bs58 encoding with checksum.
    ///
    /// # Example
    ///  ```
    /// # use relay_hash::Hash;
    /// let hash = Hash::compute_from(&"hello world".as_bytes());
    /// let serialized: String = hash.to_bs58_check();
    /// let deserialized: Hash = Hash::from_bs58_check(&serialized).unwrap();
    /// assert_eq!(hash, deserialized);
    /// ```
    pub fn from_bs58_check(data: &str) -> Result<Hash, HashError> {
        let decoded_bs58_check = bs58::decode(data)
            .with_check(None)
            .into_vec()
            .map_err(|err| HashError::ParsingError(format!("{}", err)))?;
        let bytes: [u8; HASH_SIZE_BYTES] = decoded_bs58_check
            .as_slice()
            .try_into()
            .map_err(|err| HashError::ParsingError(format!("{}", err)))?;
        Ok(Hash::from_bytes(&bytes))
    }

    /// Build a Hash from raw bytes.
    pub fn from_bytes(data: &[u8; HASH_SIZE_BYTES]) -> Hash {
        Hash(*data)
    }
}

impl ::serde::Serialize for Hash {
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.collect_str(&self.to_bs58_check())
        } else {
            s.serialize_bytes(self.to_bytes())
        }
    }
}

impl<'de> ::serde::Deserialize<'de> for Hash {
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<Hash, D::Error> {
        if d.is_human_readable() {
            let s = String::deserialize(d)?;
            Hash::from_bs58_check(&s).map_err(::serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(d)?;
            let bytes: [u8; HASH_SIZE_BYTES] = bytes
                .as_slice()
                .try_into()
                .map_err(::serde::de::Error::custom)?;
            Ok(Hash::from_bytes(&bytes))
        }
    }
}

impl FromStr for Hash {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_bs58_check(s)
    }
}
