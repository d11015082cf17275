// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// result of a store operation
pub type RelayDBResult<T, E = RelayDBError> = core::result::Result<T, E>;

/// store error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum RelayDBError {
    /// rocks db error: {0}
    RocksDBError(String),
    /// invalid change id: {0}
    InvalidChangeID(String),
    /// serialization error: {0}
    SerializeError(String),
    /// deserialization error: {0}
    DeserializeError(String),
}
