// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// models result
pub type ModelsResult<T, E = ModelsError> = core::result::Result<T, E>;

/// models error
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum ModelsError {
    /// Serialization error: {0}
    SerializeError(String),
    /// Deserialization error: {0}
    DeserializeError(String),
    /// invalid address: {0}
    InvalidAddress(String),
    /// amount parse error: {0}
    AmountParseError(String),
    /// Amount overflow
    AmountOverflowError,
    /// invalid chain identifier: {0}
    InvalidChainId(String),
    /// invalid service url: {0}
    InvalidServiceUrl(String),
    /// configuration error: {0}
    ConfigError(String),
    /// Time error {0}
    TimeError(#[from] relay_time::TimeError),
    /// hash error: {0}
    HashError(#[from] relay_hash::HashError),
    /// signature error: {0}
    SignatureError(#[from] relay_signature::SignatureError),
}
