// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use relay_models::ModelsError;
use thiserror::Error;

/// ledger result
pub type LedgerResult<T, E = LedgerError> = core::result::Result<T, E>;

/// ledger error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum LedgerError {
    /// insufficient funds: {0}
    InsufficientFunds(String),
    /// unknown module account: {0}
    UnknownModule(String),
    /// module account {0} lacks the {1} permission
    MissingPermission(String, String),
    /// invalid amount: {0}
    InvalidAmount(String),
    /// amount overflow: {0}
    Overflow(String),
    /// module account already registered: {0}
    ModuleAlreadyRegistered(String),
    /// file error: {0}
    FileError(String),
    /// models error: {0}
    ModelsError(String),
}

impl From<ModelsError> for LedgerError {
    fn from(err: ModelsError) -> Self {
        LedgerError::ModelsError(err.to_string())
    }
}
