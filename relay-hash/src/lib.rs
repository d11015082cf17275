// Copyright (c) 2022 MASSA LABS <info@massa.net>

#![warn(missing_docs)]
//! SHA-256 hashing used for addresses and transaction digests
pub use error::HashError;
pub use hash::Hash;
pub use settings::HASH_SIZE_BYTES;

mod error;
mod hash;
mod settings;
