// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! # General description
//!
//! RelayDB is a wrapper around a RocksDB database (on disk) holding the
//! committed state of the relay state machine.
//!
//! We use 2 rocksdb columns:
//! * state: every table of the state machine, each one under its own one-byte prefix
//!   (see constants.rs in relay-db-exports)
//! * metadata: the change id (height of the last written block)
//!
//! A block is written with a single `write_batch` call, which maps to a
//! single RocksDB `WriteBatch`: either the whole block is persisted or none of it.

mod relay_db;

pub use crate::relay_db::*;
