// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Coin flows between accounts and the module pools

use crate::keeper::PosKeeper;
use relay_db_exports::BlockContext;
use relay_ledger_exports::{DAO_POOL_NAME, STAKED_POOL_NAME};
use relay_models::{Address, Amount};
use relay_pos_exports::{PosError, Validator};
use tracing::debug;

impl PosKeeper {
    /// Moves `amount` from the account of `address` to the staked pool
    pub fn coins_from_unstaked_to_staked(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        amount: Amount,
    ) -> Result<(), PosError> {
        if !self.ledger.has_coins(ctx, address, amount) {
            return Err(PosError::NotEnoughCoins(format!(
                "{} holds {} and cannot stake {}",
                address,
                self.ledger.get_coins(ctx, address),
                amount
            )));
        }
        self.ledger
            .send_coins_from_account_to_module(ctx, address, STAKED_POOL_NAME, amount)?;
        Ok(())
    }

    /// Pays the whole stake of `validator` back from the staked pool to `recipient`
    pub fn coins_from_staked_to_unstaked(
        &self,
        ctx: &mut BlockContext,
        validator: &Validator,
        recipient: &Address,
    ) -> Result<(), PosError> {
        if validator.staked_tokens.is_zero() {
            return Ok(());
        }
        self.ledger.send_coins_from_module_to_account(
            ctx,
            STAKED_POOL_NAME,
            recipient,
            validator.staked_tokens,
        )?;
        Ok(())
    }

    /// Destroys `amount` of the staked pool, zero is a no-op
    pub fn burn_staked_tokens(
        &self,
        ctx: &mut BlockContext,
        amount: Amount,
    ) -> Result<(), PosError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.ledger.burn_coins(ctx, STAKED_POOL_NAME, amount)?;
        debug!("burnt {} staked tokens", amount);
        Ok(())
    }

    /// Creates `amount` in the staked pool and forwards it to `address`
    pub fn mint(
        &self,
        ctx: &mut BlockContext,
        amount: Amount,
        address: &Address,
    ) -> Result<(), PosError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.ledger.mint_coins(ctx, STAKED_POOL_NAME, amount)?;
        self.ledger
            .send_coins_from_module_to_account(ctx, STAKED_POOL_NAME, address, amount)?;
        Ok(())
    }

    /// Creates `amount` in the staked pool and forwards it to the module account `module`
    pub fn mint_to_module(
        &self,
        ctx: &mut BlockContext,
        amount: Amount,
        module: &str,
    ) -> Result<(), PosError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.ledger.mint_coins(ctx, STAKED_POOL_NAME, amount)?;
        self.ledger
            .send_coins_from_module_to_module(ctx, STAKED_POOL_NAME, module, amount)?;
        Ok(())
    }

    /// Balance of the staked pool
    pub fn get_staked_pool_balance(&self, ctx: &BlockContext) -> Amount {
        let address = self.ledger.get_module_address(STAKED_POOL_NAME);
        self.ledger.get_coins(ctx, &address)
    }

    /// Balance of the DAO pool
    pub fn get_dao_pool_balance(&self, ctx: &BlockContext) -> Amount {
        let address = self.ledger.get_module_address(DAO_POOL_NAME);
        self.ledger.get_coins(ctx, &address)
    }
}
