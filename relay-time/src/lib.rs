// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Unsigned time management
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod error;
pub use error::TimeError;
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use relay_serialization::{Deserializer, Serializer, U64VarIntDeserializer, U64VarIntSerializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Fixed width layout used for time-ordered store keys.
/// Every instant formats to the same number of bytes so that byte order equals time order.
const SORTABLE_FORMAT: &str =
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]";

/// Length in bytes of a time formatted with `RelayTime::format_sortable`
pub const SORTABLE_TIME_LEN: usize = 29;

/// Latest time `RelayTime::format_sortable` can encode: 9999-12-31T23:59:59.999
pub const MAX_SORTABLE_TIME: RelayTime = RelayTime(253_402_300_799_999);

/// Time structure used everywhere.
/// milliseconds since 01/01/1970.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct RelayTime(u64);

/// Serializer for `RelayTime`
#[derive(Default, Clone)]
pub struct RelayTimeSerializer {
    u64_serializer: U64VarIntSerializer,
}

impl RelayTimeSerializer {
    /// Creates a `RelayTimeSerializer`
    pub const fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
        }
    }
}

impl Serializer<RelayTime> for RelayTimeSerializer {
    /// ```
    /// use relay_serialization::Serializer;
    /// use relay_time::{RelayTime, RelayTimeSerializer};
    ///
    /// let time: RelayTime = RelayTime::from_millis(30);
    /// let mut serialized = Vec::new();
    /// let serializer = RelayTimeSerializer::new();
    /// serializer.serialize(&time, &mut serialized).unwrap();
    /// ```
    fn serialize(
        &self,
        value: &RelayTime,
        buffer: &mut Vec<u8>,
    ) -> Result<(), relay_serialization::SerializeError> {
        self.u64_serializer.serialize(&value.to_millis(), buffer)
    }
}

/// Deserializer for `RelayTime`
#[derive(Clone)]
pub struct RelayTimeDeserializer {
    u64_deserializer: U64VarIntDeserializer,
}

impl RelayTimeDeserializer {
    /// Creates a `RelayTimeDeserializer`
    ///
    /// Arguments:
    /// * range: accepted bounds for the time to deserialize
    pub fn new(range: (Bound<RelayTime>, Bound<RelayTime>)) -> Self {
        Self {
            u64_deserializer: U64VarIntDeserializer::new(
                range.0.map(|time| time.to_millis()),
                range.1.map(|time| time.to_millis()),
            ),
        }
    }
}

impl Deserializer<RelayTime> for RelayTimeDeserializer {
    /// ```
    /// use std::ops::Bound::Included;
    /// use relay_serialization::{Serializer, Deserializer, DeserializeError};
    /// use relay_time::{RelayTime, RelayTimeSerializer, RelayTimeDeserializer};
    ///
    /// let time: RelayTime = RelayTime::from_millis(30);
    /// let mut serialized = Vec::new();
    /// let serializer = RelayTimeSerializer::new();
    /// let deserializer = RelayTimeDeserializer::new((Included(RelayTime::from_millis(0)), Included(RelayTime::max())));
    /// serializer.serialize(&time, &mut serialized).unwrap();
    /// let (rest, time_deser) = deserializer.deserialize::<DeserializeError>(&serialized).unwrap();
    /// assert!(rest.is_empty());
    /// assert_eq!(time, time_deser);
    /// ```
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], RelayTime, E> {
        context("Failed RelayTime deserialization", |input| {
            self.u64_deserializer
                .deserialize(input)
                .map(|(rest, res)| (rest, RelayTime::from_millis(res)))
        })(buffer)
    }
}

impl fmt::Display for RelayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_millis())
    }
}

impl TryFrom<Duration> for RelayTime {
    type Error = TimeError;

    /// Conversion from `std::time::Duration`.
    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Ok(RelayTime(
            value
                .as_millis()
                .try_into()
                .map_err(|_| TimeError::ConversionError)?,
        ))
    }
}

impl From<RelayTime> for Duration {
    fn from(value: RelayTime) -> Self {
        value.to_duration()
    }
}

impl FromStr for RelayTime {
    type Err = crate::TimeError;

    /// Conversion from `&str` holding milliseconds.
    ///
    /// ```
    /// # use relay_time::*;
    /// # use std::str::FromStr;
    /// assert_eq!(RelayTime::from_millis(42), RelayTime::from_str("42").unwrap());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RelayTime(
            u64::from_str(s).map_err(|_| Self::Err::ConversionError)?,
        ))
    }
}

impl RelayTime {
    /// Conversion from `u64`, representing timestamp in milliseconds.
    pub const fn from_millis(value: u64) -> Self {
        RelayTime(value)
    }

    /// Conversion from seconds
    pub const fn from_secs(value: u64) -> Self {
        RelayTime(value.saturating_mul(1000))
    }

    /// Smallest time interval
    pub const EPSILON: RelayTime = RelayTime(1);

    /// Gets current UNIX timestamp (resolution: milliseconds).
    pub fn now() -> Result<Self, TimeError> {
        let now: u64 = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TimeError::TimeOverflowError)?
            .as_millis()
            .try_into()
            .map_err(|_| TimeError::TimeOverflowError)?;
        Ok(RelayTime(now))
    }

    /// Conversion to `std::time::Duration`.
    pub fn to_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Conversion to `u64`, representing milliseconds.
    pub const fn to_millis(&self) -> u64 {
        self.0
    }

    /// ```
    /// # use relay_time::*;
    /// let res = RelayTime::from_millis(42).saturating_sub(RelayTime::from_millis(50));
    /// assert_eq!(res, RelayTime::from_millis(0))
    /// ```
    #[must_use]
    pub fn saturating_sub(self, t: RelayTime) -> Self {
        RelayTime(self.0.saturating_sub(t.0))
    }

    /// ```
    /// # use relay_time::*;
    /// let res = RelayTime::from_millis(42).saturating_add(RelayTime::from_millis(7));
    /// assert_eq!(res, RelayTime::from_millis(49))
    /// ```
    #[must_use]
    pub fn saturating_add(self, t: RelayTime) -> Self {
        RelayTime(self.0.saturating_add(t.0))
    }

    /// Subtraction failing on underflow
    pub fn checked_sub(self, t: RelayTime) -> Result<Self, TimeError> {
        self.0
            .checked_sub(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("subtraction error".to_string()))
            .map(RelayTime)
    }

    /// Addition failing on overflow
    pub fn checked_add(self, t: RelayTime) -> Result<Self, TimeError> {
        self.0
            .checked_add(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("addition error".to_string()))
            .map(RelayTime)
    }

    /// ```
    /// # use relay_time::*;
    /// assert_eq!(RelayTime::from_millis(42).saturating_mul(7), RelayTime::from_millis(294))
    /// ```
    #[must_use]
    pub const fn saturating_mul(self, n: u64) -> RelayTime {
        RelayTime(self.0.saturating_mul(n))
    }

    /// ```
    /// # use relay_time::*;
    /// let relay_time : RelayTime = RelayTime::from_millis(1_640_995_200_000);
    /// assert_eq!(relay_time.format_instant(), String::from("2022-01-01T00:00:00Z"))
    /// ```
    pub fn format_instant(&self) -> String {
        OffsetDateTime::from_unix_timestamp((self.to_millis() / 1000) as i64)
            .ok()
            .and_then(|date_time| date_time.format(&Rfc3339).ok())
            .unwrap_or_else(|| format!("{}ms", self.to_millis()))
    }

    /// Formats the instant with a fixed width, nanosecond precision layout.
    ///
    /// Lexicographic order of the produced strings equals chronological order,
    /// which makes the output suitable as a store key suffix.
    ///
    /// ```
    /// # use relay_time::*;
    /// let time = RelayTime::from_millis(1_640_995_200_123);
    /// assert_eq!(time.format_sortable().unwrap(), "2022-01-01T00:00:00.123000000");
    /// ```
    pub fn format_sortable(&self) -> Result<String, TimeError> {
        let format = time::format_description::parse(SORTABLE_FORMAT)
            .map_err(|err| TimeError::FormatError(err.to_string()))?;
        let nanos = i128::from(self.to_millis()) * 1_000_000;
        let date_time = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|_| TimeError::TimeOverflowError)?;
        date_time
            .format(&format)
            .map_err(|err| TimeError::FormatError(err.to_string()))
    }

    /// Parses a string produced by `format_sortable`
    ///
    /// ```
    /// # use relay_time::*;
    /// let time = RelayTime::from_millis(1_640_995_200_123);
    /// let formatted = time.format_sortable().unwrap();
    /// assert_eq!(RelayTime::parse_sortable(&formatted).unwrap(), time);
    /// ```
    pub fn parse_sortable(value: &str) -> Result<RelayTime, TimeError> {
        let format = time::format_description::parse(SORTABLE_FORMAT)
            .map_err(|err| TimeError::FormatError(err.to_string()))?;
        let date_time = PrimitiveDateTime::parse(value, &format)
            .map_err(|err| TimeError::FormatError(err.to_string()))?
            .assume_utc();
        let millis = date_time.unix_timestamp_nanos() / 1_000_000;
        u64::try_from(millis)
            .map(RelayTime)
            .map_err(|_| TimeError::ConversionError)
    }

    /// ```
    /// # use relay_time::*;
    /// let relay_time : RelayTime = RelayTime::from_utc_ymd_hms(2022, 2, 5, 22, 50, 40).unwrap();
    /// assert_eq!(relay_time.format_instant(), String::from("2022-02-05T22:50:40Z"))
    /// ```
    pub fn from_utc_ymd_hms(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<RelayTime, TimeError> {
        let month = month.try_into().map_err(|_| TimeError::ConversionError)?;

        let date =
            Date::from_calendar_date(year, month, day).map_err(|_| TimeError::ConversionError)?;

        let date_time = date
            .with_hms(hour, minute, second)
            .map_err(|_| TimeError::ConversionError)?
            .assume_utc();

        u64::try_from(date_time.unix_timestamp_nanos() / 1_000_000)
            .map(RelayTime::from_millis)
            .map_err(|_| TimeError::ConversionError)
    }

    /// Get max RelayTime value
    pub const fn max() -> RelayTime {
        RelayTime::from_millis(u64::MAX)
    }
}
