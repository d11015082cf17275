// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::ModelsError;
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use num::rational::Ratio;
use relay_serialization::{
    Deserializer, SerializeError, Serializer, U64VarIntDeserializer, U64VarIntSerializer,
};
use serde::de::Unexpected;
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;

/// A non-negative integer quantity of the staking denomination.
///
/// All arithmetic is explicit: checked operations return `None` on overflow or underflow,
/// saturating ones clamp. Fractional operations always truncate toward zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Ord, PartialOrd, Default, Hash)]
pub struct Amount(u64);

impl Amount {
    /// Create a zero Amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Obtains the underlying `u64` number of tokens
    pub const fn to_raw(&self) -> u64 {
        self.0
    }

    /// constructs an `Amount` from a number of tokens
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// safely add self to another amount, saturating the result on overflow
    #[must_use]
    pub fn saturating_add(self, amount: Amount) -> Self {
        Amount(self.0.saturating_add(amount.0))
    }

    /// safely subtract another amount from self, saturating the result on underflow
    #[must_use]
    pub fn saturating_sub(self, amount: Amount) -> Self {
        Amount(self.0.saturating_sub(amount.0))
    }

    /// returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// safely subtract another amount from self, returning None on underflow
    /// ```
    /// # use relay_models::Amount;
    /// let res = Amount::from_raw(42).checked_sub(Amount::from_raw(7)).unwrap();
    /// assert_eq!(res, Amount::from_raw(35));
    /// assert!(Amount::from_raw(7).checked_sub(Amount::from_raw(42)).is_none());
    /// ```
    pub fn checked_sub(self, amount: Amount) -> Option<Self> {
        self.0.checked_sub(amount.0).map(Amount)
    }

    /// safely add self to another amount, returning None on overflow
    pub fn checked_add(self, amount: Amount) -> Option<Self> {
        self.0.checked_add(amount.0).map(Amount)
    }

    /// safely multiply self with a `u64`, returning None on overflow
    pub fn checked_mul_u64(self, factor: u64) -> Option<Self> {
        self.0.checked_mul(factor).map(Amount)
    }

    /// safely multiply self with a `u64`, saturating the result on overflow
    #[must_use]
    pub fn saturating_mul_u64(self, factor: u64) -> Self {
        Amount(self.0.saturating_mul(factor))
    }

    /// safely divide self by a `u64`, returning None if the factor is zero
    pub fn checked_div_u64(self, factor: u64) -> Option<Self> {
        self.0.checked_div(factor).map(Amount)
    }

    /// Multiplies by a fraction, truncating the result.
    ///
    /// Returns None if the fraction has a zero denominator or the result does not fit.
    /// ```
    /// # use relay_models::Amount;
    /// # use num::rational::Ratio;
    /// let amount = Amount::from_raw(1_000_000);
    /// assert_eq!(amount.checked_mul_ratio(Ratio::new_raw(1, 100)), Some(Amount::from_raw(10_000)));
    /// assert_eq!(Amount::from_raw(1100).checked_mul_ratio(Ratio::new_raw(10, 11)), Some(Amount::from_raw(1000)));
    /// ```
    pub fn checked_mul_ratio(self, ratio: Ratio<u64>) -> Option<Self> {
        if *ratio.denom() == 0 {
            return None;
        }
        let res = (self.0 as u128) * (*ratio.numer() as u128) / (*ratio.denom() as u128);
        u64::try_from(res).ok().map(Amount)
    }
}

/// display an Amount as its integer number of tokens
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// build an Amount from its decimal integer form (like "1000000")
///
/// ```
/// # use relay_models::Amount;
/// # use std::str::FromStr;
/// assert_eq!(Amount::from_str("11").unwrap(), Amount::from_raw(11));
/// assert!(Amount::from_str("11.1").is_err());
/// assert!(Amount::from_str("-11").is_err());
/// assert!(Amount::from_str("99999999999999999999999").is_err());
/// ```
impl FromStr for Amount {
    type Err = ModelsError;

    fn from_str(str_amount: &str) -> Result<Self, Self::Err> {
        if str_amount.starts_with('-') {
            return Err(ModelsError::AmountParseError(
                "amounts cannot be negative".to_string(),
            ));
        }
        str_amount
            .parse::<u64>()
            .map(Amount)
            .map_err(|err| ModelsError::AmountParseError(err.to_string()))
    }
}

impl<'de> serde::Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> serde::de::Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn visit_str<E>(self, value: &str) -> Result<Amount, E>
    where
        E: serde::de::Error,
    {
        Amount::from_str(value).map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Amount, E>
    where
        E: serde::de::Error,
    {
        Ok(Amount(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Amount, E>
    where
        E: serde::de::Error,
    {
        u64::try_from(value)
            .map(Amount)
            .map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
    }

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a non-negative integer amount of tokens")
    }
}

impl serde::Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Serializer for `Amount`
#[derive(Clone, Default)]
pub struct AmountSerializer {
    u64_serializer: U64VarIntSerializer,
}

impl AmountSerializer {
    /// Create a new `AmountSerializer`
    pub const fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
        }
    }
}

impl Serializer<Amount> for AmountSerializer {
    fn serialize(&self, value: &Amount, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.u64_serializer.serialize(&value.0, buffer)
    }
}

/// Deserializer for `Amount`
#[derive(Clone)]
pub struct AmountDeserializer {
    u64_deserializer: U64VarIntDeserializer,
}

impl AmountDeserializer {
    /// Create a new `AmountDeserializer` accepting amounts in the given bounds
    pub const fn new(min_amount: Bound<Amount>, max_amount: Bound<Amount>) -> Self {
        let min = match min_amount {
            Bound::Included(amount) => Bound::Included(amount.0),
            Bound::Excluded(amount) => Bound::Excluded(amount.0),
            Bound::Unbounded => Bound::Unbounded,
        };
        let max = match max_amount {
            Bound::Included(amount) => Bound::Included(amount.0),
            Bound::Excluded(amount) => Bound::Excluded(amount.0),
            Bound::Unbounded => Bound::Unbounded,
        };
        Self {
            u64_deserializer: U64VarIntDeserializer::new(min, max),
        }
    }
}

impl Default for AmountDeserializer {
    fn default() -> Self {
        Self::new(Bound::Included(Amount::zero()), Bound::Unbounded)
    }
}

impl Deserializer<Amount> for AmountDeserializer {
    /// ```
    /// use relay_models::{Amount, AmountSerializer, AmountDeserializer};
    /// use relay_serialization::{Serializer, Deserializer, DeserializeError};
    ///
    /// let amount = Amount::from_raw(11_111);
    /// let mut serialized = Vec::new();
    /// AmountSerializer::new().serialize(&amount, &mut serialized).unwrap();
    /// let (rest, amount_deser) = AmountDeserializer::default()
    ///     .deserialize::<DeserializeError>(&serialized)
    ///     .unwrap();
    /// assert!(rest.is_empty());
    /// assert_eq!(amount_deser, amount);
    /// ```
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Amount, E> {
        context("Failed Amount deserialization", |input| {
            self.u64_deserializer.deserialize(input)
        })(buffer)
        .map(|(rest, raw)| (rest, Amount(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_truncates() {
        let amount = Amount::from_raw(999);
        assert_eq!(
            amount.checked_mul_ratio(Ratio::new_raw(1, 10)),
            Some(Amount::from_raw(99))
        );
        assert_eq!(amount.checked_mul_ratio(Ratio::new_raw(1, 0)), None);
        assert_eq!(
            Amount::from_raw(u64::MAX).checked_mul_ratio(Ratio::new_raw(2, 1)),
            None
        );
        assert_eq!(
            Amount::from_raw(u64::MAX).checked_mul_ratio(Ratio::new_raw(1, 1)),
            Some(Amount::from_raw(u64::MAX))
        );
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let from_str: Amount = serde_json::from_str("\"1000\"").unwrap();
        let from_num: Amount = serde_json::from_str("1000").unwrap();
        assert_eq!(from_str, from_num);
        assert!(serde_json::from_str::<Amount>("-5").is_err());
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"1000\"");
    }
}
