// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! # General description
//!
//! `PosKeeper` is the proof-of-stake state machine of a relay network:
//! validator records and their power index, the bonded-stake pool, liveness
//! tracking, slashing, rewards and the per-block pipeline that reports
//! validator set changes to the consensus engine.
//!
//! The keeper holds no state of its own. Every read and write goes through
//! the `BlockContext` of the block being executed, so a block is committed
//! as a single batch and a failed message is rolled back with its branch.
//!
//! # Block pipeline
//!
//! * `begin_block` pays the pending relay awards and the reward of the
//!   previous proposer, accounts the votes of the last commit and handles
//!   byzantine evidence;
//! * `deliver_tx` runs the stake, unstake, unjail and send messages;
//! * `end_block` releases the validators waiting to unstake at session
//!   boundaries, diffs the consensus set and pays back mature unstakings.

#![warn(missing_docs)]

mod controller;
mod genesis;
mod handler;
mod invariants;
mod keeper;
mod keys;
mod pipeline;
mod pools;
mod queries;
mod rewards;
mod signing;
mod slashing;
mod transitions;
mod validators;

pub use keeper::PosKeeper;

#[cfg(test)]
mod tests;
