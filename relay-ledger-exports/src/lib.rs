//! # General description
//!
//! Account keeper contract consumed by the state machine: balances of
//! accounts and module-owned accounts, minting and burning, total supply.
//! The implementation lives in `relay_ledger_worker`.

#![warn(missing_docs)]

mod config;
mod controller;
mod error;
mod module_account;

pub use config::LedgerConfig;
pub use controller::AccountKeeper;
pub use error::{LedgerError, LedgerResult};
pub use module_account::{
    ModuleAccount, ModulePermission, DAO_POOL_NAME, FEE_COLLECTOR_NAME, STAKED_POOL_NAME,
};
