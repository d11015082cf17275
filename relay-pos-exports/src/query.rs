// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::{PosError, POS_CODESPACE};
use crate::validator::{Validator, ValidatorStatus};
use relay_models::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code returned when the requested validator or signing info does not exist
pub const NOT_FOUND_CODE: u32 = 2;

/// Largest page served by the `Validators` query
pub const MAX_QUERY_PAGE_LIMIT: u64 = 1000;

/// Read-only requests served by the PoS module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PosQuery {
    /// one validator
    Validator(Address),
    /// page of validators, optionally filtered by status
    Validators {
        /// status filter
        status: Option<ValidatorStatus>,
        /// page number, starting at 1
        page: u64,
        /// page size
        limit: u64,
    },
    /// consensus set candidates by descending power
    StakedValidators,
    /// liveness record of a validator
    SigningInfo(Address),
    /// current parameters
    Params,
    /// balance of the staked pool
    StakedPoolBalance,
    /// balance of the DAO pool
    DaoPoolBalance,
    /// proposer of the last block
    PreviousProposer,
    /// validators waiting for the next session to unstake
    WaitingValidators,
    /// unstaking validators by completion time
    UnstakingValidators,
    /// total power reported at the last block
    PrevStateTotalPower,
    /// balance of an account
    AccountBalance(Address),
}

/// Page of validators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorsPage {
    /// validators of the page, by address
    pub result: Vec<Validator>,
    /// page number
    pub page: u64,
    /// number of pages
    pub total_pages: u64,
}

/// Structured query failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{codespace} error {code}: {message}")]
pub struct QueryError {
    /// numeric code
    pub code: u32,
    /// module that raised the error
    pub codespace: String,
    /// human readable message
    pub message: String,
}

impl QueryError {
    /// True if the error reports a missing object
    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND_CODE
    }
}

impl From<PosError> for QueryError {
    fn from(err: PosError) -> Self {
        let code = match err {
            PosError::ValidatorNotFound(_) | PosError::SigningInfoNotFound(_) => NOT_FOUND_CODE,
            ref other => other.code(),
        };
        QueryError {
            code,
            codespace: POS_CODESPACE.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinct() {
        let err: QueryError = PosError::ValidatorNotFound(Address::from_module_name("v")).into();
        assert!(err.is_not_found());
        let err: QueryError = PosError::SigningInfoNotFound(Address::from_module_name("v")).into();
        assert!(err.is_not_found());
        let err: QueryError = PosError::InvalidParams("page".to_string()).into();
        assert!(!err.is_not_found());
        assert_eq!(err.code, 151);
        assert_eq!(err.codespace, "pos");
    }
}
