// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use relay_serialization::{
    Deserializer, SerializeError, Serializer, StringDeserializer, StringSerializer,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Bound::Included;
use std::str::FromStr;

/// Number of characters of a chain identifier
pub const CHAIN_ID_LENGTH: usize = 4;

/// Identifier of a hosted network served by a validator, four hexadecimal characters (ex: "0001")
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChainId {
    type Error = ModelsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.len() != CHAIN_ID_LENGTH {
            return Err(ModelsError::InvalidChainId(format!(
                "{} must be {} characters long",
                value, CHAIN_ID_LENGTH
            )));
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ModelsError::InvalidChainId(format!(
                "{} is not hexadecimal",
                value
            )));
        }
        Ok(ChainId(value))
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.0
    }
}

impl FromStr for ChainId {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChainId::try_from(s.to_string())
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializer for `ChainId`
#[derive(Clone, Default)]
pub struct ChainIdSerializer {
    string_serializer: StringSerializer,
}

impl ChainIdSerializer {
    /// Creates a new `ChainIdSerializer`
    pub const fn new() -> Self {
        Self {
            string_serializer: StringSerializer::new(),
        }
    }
}

impl Serializer<ChainId> for ChainIdSerializer {
    fn serialize(&self, value: &ChainId, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.string_serializer.serialize(&value.0, buffer)
    }
}

/// Deserializer for `ChainId`, checks the identifier format
#[derive(Clone)]
pub struct ChainIdDeserializer {
    string_deserializer: StringDeserializer,
}

impl ChainIdDeserializer {
    /// Creates a new `ChainIdDeserializer`
    pub const fn new() -> Self {
        Self {
            string_deserializer: StringDeserializer::new(
                Included(CHAIN_ID_LENGTH as u64),
                Included(CHAIN_ID_LENGTH as u64),
            ),
        }
    }
}

impl Default for ChainIdDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<ChainId> for ChainIdDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], ChainId, E> {
        context("Failed ChainId deserialization", |input: &'a [u8]| {
            let (rest, value) = self.string_deserializer.deserialize(input)?;
            let chain = ChainId::try_from(value).map_err(|_| {
                nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::Verify,
                ))
            })?;
            Ok((rest, chain))
        })(buffer)
    }
}
