// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::{LedgerError, ModuleAccount};
use relay_db_exports::BlockContext;
use relay_models::{Address, Amount};
use std::fmt::Debug;

/// Balances of accounts and module accounts, in the staking denomination.
///
/// Every method reads and writes through the block context, so balance
/// changes are rolled back with the branch that made them.
/// Transfers are all or nothing: on error no balance was modified.
pub trait AccountKeeper: Send + Sync + Debug {
    /// Balance of an address, zero for unknown addresses
    fn get_coins(&self, ctx: &BlockContext, address: &Address) -> Amount;

    /// Overwrites the balance of an address, without touching the total supply
    fn set_coins(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// True if the address holds at least `amount`
    fn has_coins(&self, ctx: &BlockContext, address: &Address, amount: Amount) -> bool {
        self.get_coins(ctx, address) >= amount
    }

    /// Moves `amount` from `from` to `to`
    fn send_coins(
        &self,
        ctx: &mut BlockContext,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Creates `amount` new coins on the module account, which needs the minter permission
    fn mint_coins(
        &self,
        ctx: &mut BlockContext,
        module: &str,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Destroys `amount` coins of the module account, which needs the burner permission
    fn burn_coins(
        &self,
        ctx: &mut BlockContext,
        module: &str,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Moves coins from a module account to an account
    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut BlockContext,
        module: &str,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Moves coins from an account to a module account
    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut BlockContext,
        from: &Address,
        module: &str,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Moves coins between two module accounts
    fn send_coins_from_module_to_module(
        &self,
        ctx: &mut BlockContext,
        from_module: &str,
        to_module: &str,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Registered module account, if any
    fn get_module_account(&self, ctx: &BlockContext, name: &str) -> Option<ModuleAccount>;

    /// Address of a module account, registered or not
    fn get_module_address(&self, name: &str) -> Address {
        Address::from_module_name(name)
    }

    /// Registers a module account, at genesis
    fn register_module_account(
        &self,
        ctx: &mut BlockContext,
        account: ModuleAccount,
    ) -> Result<(), LedgerError>;

    /// Total amount of coins in existence
    fn get_supply(&self, ctx: &BlockContext) -> Amount;
}
