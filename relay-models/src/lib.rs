// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! All the structures that are used everywhere
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

/// address related structures
pub mod address;
/// amount related structures
pub mod amount;
/// block header given by the consensus engine
pub mod block;
/// hosted chain identifiers
pub mod chain;
/// configuration
pub mod config;
/// error management
pub mod error;
/// deterministic events emitted during block execution
pub mod event;
/// service URL validation
pub mod service_url;

pub use address::{Address, AddressDeserializer, AddressSerializer, ADDRESS_SIZE_BYTES};
pub use amount::{Amount, AmountDeserializer, AmountSerializer};
pub use block::BlockHeader;
pub use chain::{ChainId, ChainIdDeserializer, ChainIdSerializer};
pub use error::{ModelsError, ModelsResult};
pub use event::{Event, EventAttribute};
pub use service_url::validate_service_url;
