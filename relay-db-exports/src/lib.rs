// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Store contract of the relay state machine.
//!
//! The committed store is a `RelayDBController`. During a block, every read
//! and write goes through a `BlockContext`, which layers a `StateStore`
//! overlay above the committed store so that a failed message can be rolled
//! back and the block written as a single batch.

#![warn(missing_docs)]

mod block_context;
mod constants;
mod controller;
mod db_batch;
mod error;
mod settings;
mod state_store;

pub use block_context::*;
pub use constants::*;
pub use controller::*;
pub use db_batch::*;
pub use error::*;
pub use settings::*;
pub use state_store::*;
