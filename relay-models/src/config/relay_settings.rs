//! Build a settings object from a configuration file and environment variables.
//!
//! Values are read in this order, later sources overriding earlier ones:
//! 1. the TOML file at `path`
//! 2. environment variables starting with `env_prefix` (ex: `RELAY_POS_MAX_VALIDATORS`)

use crate::error::ModelsError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Reads `T` from the file at `path` (any extension handled by `config`) overridden by
/// `env_prefix`-prefixed environment variables.
pub fn build_relay_settings<T: DeserializeOwned>(
    path: &Path,
    env_prefix: &str,
) -> Result<T, ModelsError> {
    let path_str = path.to_str().ok_or_else(|| {
        ModelsError::ConfigError(format!("non utf-8 config path {}", path.display()))
    })?;
    config::Config::builder()
        .add_source(config::File::with_name(path_str))
        .add_source(config::Environment::with_prefix(env_prefix).separator("__"))
        .build()
        .map_err(|err| ModelsError::ConfigError(format!("failed to read {}: {}", path_str, err)))?
        .try_deserialize::<T>()
        .map_err(|err| {
            ModelsError::ConfigError(format!("invalid settings in {}: {}", path_str, err))
        })
}
