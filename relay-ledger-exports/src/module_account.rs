// Copyright (c) 2022 MASSA LABS <info@massa.net>

use relay_models::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the module account holding the bonded stake of every validator
pub const STAKED_POOL_NAME: &str = "staked_tokens_pool";
/// Name of the module account accumulating the DAO share of rewards
pub const DAO_POOL_NAME: &str = "dao";
/// Name of the module account collecting transaction fees
pub const FEE_COLLECTOR_NAME: &str = "fee_collector";

/// Capability granted to a module account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModulePermission {
    /// may create coins
    Minter = 1,
    /// may destroy coins
    Burner = 2,
    /// holds bonded stake
    Staking = 4,
}

impl ModulePermission {
    /// All permissions
    pub const ALL: [ModulePermission; 3] = [
        ModulePermission::Minter,
        ModulePermission::Burner,
        ModulePermission::Staking,
    ];
}

impl fmt::Display for ModulePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModulePermission::Minter => write!(f, "minter"),
            ModulePermission::Burner => write!(f, "burner"),
            ModulePermission::Staking => write!(f, "staking"),
        }
    }
}

/// Account owned by a module rather than by a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAccount {
    /// module name
    pub name: String,
    /// address, derived from the name
    pub address: Address,
    /// granted capabilities
    pub permissions: Vec<ModulePermission>,
}

impl ModuleAccount {
    /// Creates the module account `name` with the given permissions
    pub fn new(name: &str, permissions: &[ModulePermission]) -> Self {
        ModuleAccount {
            name: name.to_string(),
            address: Address::from_module_name(name),
            permissions: permissions.to_vec(),
        }
    }

    /// True if the account was granted `permission`
    pub fn has_permission(&self, permission: ModulePermission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Permissions as a bit mask
    pub fn permission_mask(&self) -> u8 {
        self.permissions
            .iter()
            .fold(0u8, |mask, permission| mask | *permission as u8)
    }

    /// Rebuilds a module account from its name and permission mask
    pub fn from_mask(name: &str, mask: u8) -> Self {
        let permissions: Vec<ModulePermission> = ModulePermission::ALL
            .iter()
            .copied()
            .filter(|permission| mask & (*permission as u8) != 0)
            .collect();
        ModuleAccount::new(name, &permissions)
    }
}
