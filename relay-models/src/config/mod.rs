//! Default values and settings loading
//!
//! The constants are the hard-coded defaults used to build the `Default`
//! implementation of the configuration objects of each crate. They are not
//! meant to be read directly by the state machine: workers receive their
//! values through their `cfg` parameter, which keeps unit tests free to
//! inject other values.

pub mod constants;
pub use constants::*;

// Export tool to read user setting file
mod relay_settings;
pub use relay_settings::build_relay_settings;
