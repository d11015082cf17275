// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Binary serialization primitives shared by every relay crate.
//!
//! Values are written with `Serializer` implementations into a caller-owned
//! buffer and read back with `Deserializer` implementations built on `nom`.
//! Every encoding produced here is canonical: varints are minimal, lengths are
//! bounded and booleans only accept `0` or `1`.

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

use displaydoc::Display;
use nom::error::{context, ContextError, ErrorKind, ParseError};
use nom::multi::length_data;
use nom::{IResult, Parser};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Bound, RangeBounds};
use thiserror::Error;


/// Errors raised while serializing
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum SerializeError {
    /// Number {0} is too big to be serialized
    NumberTooBig(String),
    /// General error {0}
    GeneralError(String),
}

/// Error type accumulated by deserializers.
///
/// Keeps the `nom` error kinds and every context pushed by the parsers
/// so that the final message reads from outermost to innermost parser.
#[derive(Debug)]
pub struct DeserializeError<'a> {
    errors: Vec<(&'a [u8], ErrorKind)>,
    contexts: Vec<&'static str>,
}

impl<'a> ParseError<&'a [u8]> for DeserializeError<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        Self {
            errors: vec![(input, kind)],
            contexts: Vec::new(),
        }
    }

    fn append(input: &'a [u8], kind: ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, kind));
        other
    }
}

impl<'a> ContextError<&'a [u8]> for DeserializeError<'a> {
    fn add_context(_input: &'a [u8], ctx: &'static str, mut other: Self) -> Self {
        other.contexts.push(ctx);
        other
    }
}

impl<'a> fmt::Display for DeserializeError<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contexts: Vec<&str> = self.contexts.iter().rev().copied().collect();
        if contexts.is_empty() {
            if let Some((_, kind)) = self.errors.first() {
                return write!(f, "{}", kind.description());
            }
            return write!(f, "unknown deserialization error");
        }
        write!(f, "{}", contexts.join(" / "))
    }
}

/// Trait implemented by every value deserializer
pub trait Deserializer<T> {
    /// Deserialize a value `T` from the start of `buffer`.
    ///
    /// Returns the rest of the buffer and the value.
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], T, E>;
}

/// Trait implemented by every value serializer
pub trait Serializer<T> {
    /// Append the binary representation of `value` to `buffer`.
    fn serialize(&self, value: &T, buffer: &mut Vec<u8>) -> Result<(), SerializeError>;
}

macro_rules! gen_varint {
    ($($type:ident, $ser:ident, $deser:ident, $encode:path, $buf:path, $decode:path);*) => {
        $(
            #[doc = concat!("Serializer for `", stringify!($type), "` as a minimal unsigned varint")]
            #[derive(Clone, Default)]
            pub struct $ser;

            impl $ser {
                #[doc = concat!("Creates a new `", stringify!($ser), "`")]
                pub const fn new() -> Self {
                    Self
                }
            }

            impl Serializer<$type> for $ser {
                fn serialize(
                    &self,
                    value: &$type,
                    buffer: &mut Vec<u8>,
                ) -> Result<(), SerializeError> {
                    buffer.extend_from_slice($encode(*value, &mut $buf()));
                    Ok(())
                }
            }

            #[doc = concat!("Bounded deserializer for varint encoded `", stringify!($type), "`")]
            #[derive(Clone)]
            pub struct $deser {
                range: (Bound<$type>, Bound<$type>),
            }

            impl $deser {
                #[doc = concat!("Creates a new `", stringify!($deser), "` accepting values in the given bounds")]
                pub const fn new(min: Bound<$type>, max: Bound<$type>) -> Self {
                    Self { range: (min, max) }
                }
            }

            impl Deserializer<$type> for $deser {
                fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
                    &self,
                    buffer: &'a [u8],
                ) -> IResult<&'a [u8], $type, E> {
                    context(
                        concat!("Failed ", stringify!($type), " deserialization"),
                        |input: &'a [u8]| {
                            let (value, rest) = $decode(input).map_err(|_| {
                                nom::Err::Error(ParseError::from_error_kind(input, ErrorKind::Fail))
                            })?;
                            if !self.range.contains(&value) {
                                return Err(nom::Err::Error(ParseError::from_error_kind(
                                    input,
                                    ErrorKind::Verify,
                                )));
                            }
                            Ok((rest, value))
                        },
                    )(buffer)
                }
            }
        )*
    };
}

gen_varint! {
    u16, U16VarIntSerializer, U16VarIntDeserializer, unsigned_varint::encode::u16, unsigned_varint::encode::u16_buffer, unsigned_varint::decode::u16;
    u32, U32VarIntSerializer, U32VarIntDeserializer, unsigned_varint::encode::u32, unsigned_varint::encode::u32_buffer, unsigned_varint::decode::u32;
    u64, U64VarIntSerializer, U64VarIntDeserializer, unsigned_varint::encode::u64, unsigned_varint::encode::u64_buffer, unsigned_varint::decode::u64
}

/// Serializer for `bool`, written as a single `0` or `1` byte
#[derive(Clone, Default)]
pub struct BoolSerializer;

impl BoolSerializer {
    /// Creates a new `BoolSerializer`
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer<bool> for BoolSerializer {
    fn serialize(&self, value: &bool, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        buffer.push(u8::from(*value));
        Ok(())
    }
}

/// Deserializer for `bool`, any byte other than `0` or `1` is rejected
#[derive(Clone, Default)]
pub struct BoolDeserializer;

impl BoolDeserializer {
    /// Creates a new `BoolDeserializer`
    pub const fn new() -> Self {
        Self
    }
}

impl Deserializer<bool> for BoolDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], bool, E> {
        context("Failed bool deserialization", |input: &'a [u8]| {
            match input.first() {
                Some(0) => Ok((&input[1..], false)),
                Some(1) => Ok((&input[1..], true)),
                _ => Err(nom::Err::Error(ParseError::from_error_kind(
                    input,
                    ErrorKind::Verify,
                ))),
            }
        })(buffer)
    }
}

/// Serializer for `Option<T>`: a presence flag followed by the value when present
pub struct OptionSerializer<T, ST>
where
    ST: Serializer<T>,
{
    data_serializer: ST,
    phantom_t: PhantomData<T>,
}

impl<T, ST> OptionSerializer<T, ST>
where
    ST: Serializer<T>,
{
    /// Creates a new `OptionSerializer` wrapping the given value serializer
    pub fn new(data_serializer: ST) -> Self {
        Self {
            data_serializer,
            phantom_t: PhantomData,
        }
    }
}

impl<T, ST> Serializer<Option<T>> for OptionSerializer<T, ST>
where
    ST: Serializer<T>,
{
    fn serialize(&self, value: &Option<T>, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        match value {
            Some(data) => {
                buffer.push(1u8);
                self.data_serializer.serialize(data, buffer)
            }
            None => {
                buffer.push(0u8);
                Ok(())
            }
        }
    }
}

/// Deserializer for `Option<T>`
pub struct OptionDeserializer<T, DT>
where
    DT: Deserializer<T>,
{
    presence_deserializer: BoolDeserializer,
    data_deserializer: DT,
    phantom_t: PhantomData<T>,
}

impl<T, DT> OptionDeserializer<T, DT>
where
    DT: Deserializer<T>,
{
    /// Creates a new `OptionDeserializer` wrapping the given value deserializer
    pub fn new(data_deserializer: DT) -> Self {
        Self {
            presence_deserializer: BoolDeserializer::new(),
            data_deserializer,
            phantom_t: PhantomData,
        }
    }
}

impl<T, DT> Deserializer<Option<T>> for OptionDeserializer<T, DT>
where
    DT: Deserializer<T>,
{
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Option<T>, E> {
        context("Failed Option<_> deserialization", |input: &'a [u8]| {
            let (rest, present) = self.presence_deserializer.deserialize(input)?;
            if present {
                self.data_deserializer
                    .deserialize(rest)
                    .map(|(rest, data)| (rest, Some(data)))
            } else {
                Ok((rest, None))
            }
        })(buffer)
    }
}

/// Serializer for length-prefixed byte vectors
#[derive(Clone, Default)]
pub struct VecU8Serializer {
    len_serializer: U64VarIntSerializer,
}

impl VecU8Serializer {
    /// Creates a new `VecU8Serializer`
    pub const fn new() -> Self {
        Self {
            len_serializer: U64VarIntSerializer::new(),
        }
    }
}

impl Serializer<Vec<u8>> for VecU8Serializer {
    fn serialize(&self, value: &Vec<u8>, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        let len: u64 = value.len().try_into().map_err(|err| {
            SerializeError::NumberTooBig(format!("too many bytes in Vec<u8>: {}", err))
        })?;
        self.len_serializer.serialize(&len, buffer)?;
        buffer.extend(value);
        Ok(())
    }
}

/// Deserializer for length-prefixed byte vectors with bounded length
#[derive(Clone)]
pub struct VecU8Deserializer {
    len_deserializer: U64VarIntDeserializer,
}

impl VecU8Deserializer {
    /// Creates a new `VecU8Deserializer` accepting lengths in the given bounds
    pub const fn new(min_length: Bound<u64>, max_length: Bound<u64>) -> Self {
        Self {
            len_deserializer: U64VarIntDeserializer::new(min_length, max_length),
        }
    }
}

impl Deserializer<Vec<u8>> for VecU8Deserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Vec<u8>, E> {
        context("Failed Vec<u8> deserialization", |input| {
            length_data(|input| self.len_deserializer.deserialize(input))(input)
        })
        .map(|res: &[u8]| res.to_vec())
        .parse(buffer)
    }
}

/// Serializer for length-prefixed UTF-8 strings
#[derive(Clone, Default)]
pub struct StringSerializer {
    bytes_serializer: VecU8Serializer,
}

impl StringSerializer {
    /// Creates a new `StringSerializer`
    pub const fn new() -> Self {
        Self {
            bytes_serializer: VecU8Serializer::new(),
        }
    }
}

impl Serializer<String> for StringSerializer {
    fn serialize(&self, value: &String, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.bytes_serializer
            .serialize(&value.as_bytes().to_vec(), buffer)
    }
}

/// Deserializer for length-prefixed UTF-8 strings with bounded length
#[derive(Clone)]
pub struct StringDeserializer {
    len_deserializer: U64VarIntDeserializer,
}

impl StringDeserializer {
    /// Creates a new `StringDeserializer` accepting byte lengths in the given bounds
    pub const fn new(min_length: Bound<u64>, max_length: Bound<u64>) -> Self {
        Self {
            len_deserializer: U64VarIntDeserializer::new(min_length, max_length),
        }
    }
}

impl Deserializer<String> for StringDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], String, E> {
        context("Failed String deserialization", |input: &'a [u8]| {
            let (rest, bytes) =
                length_data(|input| self.len_deserializer.deserialize(input))(input)?;
            let value = std::str::from_utf8(bytes).map_err(|_| {
                nom::Err::Error(ParseError::from_error_kind(input, ErrorKind::Verify))
            })?;
            Ok((rest, value.to_string()))
        })(buffer)
    }
}

/// Runs `deserializer` on `buffer` and requires the whole buffer to be consumed.
///
/// Trailing bytes (for instance fields unknown to this version) are an error.
pub fn deserialize_all<T, D: Deserializer<T>>(
    deserializer: &D,
    buffer: &[u8],
) -> Result<T, String> {
    match deserializer.deserialize::<DeserializeError>(buffer) {
        Ok((rest, value)) if rest.is_empty() => Ok(value),
        Ok((rest, _)) => Err(format!("{} trailing bytes after value", rest.len())),
        Err(err) => Err(format!("{}", err)),
    }
}
