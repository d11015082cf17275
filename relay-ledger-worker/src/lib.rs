// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! # General description
//!
//! Store-backed implementation of the account keeper.
//!
//! Balances live in the state column under `BALANCE_PREFIX || address`,
//! module accounts under `MODULE_ACCOUNT_PREFIX || name` and the total
//! supply under `SUPPLY_KEY`. A zero balance is stored as an absent key.

#![warn(missing_docs)]

mod ledger;

pub use ledger::FinalLedger;
