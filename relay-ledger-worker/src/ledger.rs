// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This file defines the final ledger associating addresses to their balances.

use relay_db_exports::{
    BlockContext, Key, AMOUNT_DESER_ERROR, AMOUNT_SER_ERROR, BALANCE_PREFIX,
    MODULE_ACCOUNT_DESER_ERROR, MODULE_ACCOUNT_PREFIX, SUPPLY_KEY,
};
use relay_ledger_exports::{
    AccountKeeper, LedgerConfig, LedgerError, ModuleAccount, ModulePermission,
};
use relay_models::{Address, Amount, AmountDeserializer, AmountSerializer};
use relay_serialization::{deserialize_all, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Ledger associating addresses to their balances.
///
/// Holds no state of its own: every read and write goes through the block context.
pub struct FinalLedger {
    /// ledger configuration
    pub(crate) config: LedgerConfig,
    amount_serializer: AmountSerializer,
    amount_deserializer: AmountDeserializer,
}

impl std::fmt::Debug for FinalLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalLedger")
            .field("config", &self.config)
            .finish()
    }
}

fn balance_key(address: &Address) -> Key {
    let mut key = vec![BALANCE_PREFIX];
    key.extend_from_slice(address.to_bytes());
    key
}

fn module_account_key(name: &str) -> Key {
    let mut key = vec![MODULE_ACCOUNT_PREFIX];
    key.extend_from_slice(name.as_bytes());
    key
}

impl FinalLedger {
    /// Creates a ledger with the given configuration
    pub fn new(config: LedgerConfig) -> Self {
        FinalLedger {
            config,
            amount_serializer: AmountSerializer::new(),
            amount_deserializer: AmountDeserializer::default(),
        }
    }

    /// Credits the balances read from the initial ledger file, if one is configured
    pub fn load_initial_ledger(&self, ctx: &mut BlockContext) -> Result<(), LedgerError> {
        let Some(path) = &self.config.initial_ledger_path else {
            return Ok(());
        };
        let initial_ledger: BTreeMap<Address, Amount> = serde_json::from_str(
            &std::fs::read_to_string(path).map_err(|err| {
                LedgerError::FileError(format!(
                    "error loading initial ledger file {}: {}",
                    path.to_str().unwrap_or("(non-utf8 path)"),
                    err
                ))
            })?,
        )
        .map_err(|err| {
            LedgerError::FileError(format!(
                "error parsing initial ledger file {}: {}",
                path.to_str().unwrap_or("(non-utf8 path)"),
                err
            ))
        })?;
        self.load_initial_balances(ctx, &initial_ledger)
    }

    /// Credits genesis balances, creating the corresponding supply
    pub fn load_initial_balances(
        &self,
        ctx: &mut BlockContext,
        balances: &BTreeMap<Address, Amount>,
    ) -> Result<(), LedgerError> {
        let mut supply = self.get_supply(ctx);
        for (address, amount) in balances {
            let balance = self
                .get_coins(ctx, address)
                .checked_add(*amount)
                .ok_or_else(|| LedgerError::Overflow(format!("balance of {}", address)))?;
            supply = supply
                .checked_add(*amount)
                .ok_or_else(|| LedgerError::Overflow("total supply".to_string()))?;
            self.write_amount(ctx, balance_key(address), balance);
        }
        self.write_amount(ctx, vec![SUPPLY_KEY], supply);
        info!("loaded {} initial balances", balances.len());
        Ok(())
    }

    fn read_amount(&self, ctx: &BlockContext, key: &[u8]) -> Amount {
        match ctx.store().get(key) {
            Some(bytes) => {
                deserialize_all(&self.amount_deserializer, &bytes).expect(AMOUNT_DESER_ERROR)
            }
            None => Amount::zero(),
        }
    }

    fn write_amount(&self, ctx: &mut BlockContext, key: Key, amount: Amount) {
        if amount.is_zero() {
            ctx.store_mut().delete(key);
            return;
        }
        let mut bytes = Vec::new();
        self.amount_serializer
            .serialize(&amount, &mut bytes)
            .expect(AMOUNT_SER_ERROR);
        ctx.store_mut().put(key, bytes);
    }

    fn module_with_permission(
        &self,
        ctx: &BlockContext,
        module: &str,
        permission: Option<ModulePermission>,
    ) -> Result<ModuleAccount, LedgerError> {
        let account = self
            .get_module_account(ctx, module)
            .ok_or_else(|| LedgerError::UnknownModule(module.to_string()))?;
        if let Some(permission) = permission {
            if !account.has_permission(permission) {
                return Err(LedgerError::MissingPermission(
                    module.to_string(),
                    permission.to_string(),
                ));
            }
        }
        Ok(account)
    }
}

impl AccountKeeper for FinalLedger {
    fn get_coins(&self, ctx: &BlockContext, address: &Address) -> Amount {
        self.read_amount(ctx, &balance_key(address))
    }

    fn set_coins(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if address.is_empty() {
            return Err(LedgerError::InvalidAmount(
                "cannot set the balance of the empty address".to_string(),
            ));
        }
        self.write_amount(ctx, balance_key(address), amount);
        Ok(())
    }

    fn send_coins(
        &self,
        ctx: &mut BlockContext,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let from_balance = self.get_coins(ctx, from);
        let new_from_balance = from_balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::InsufficientFunds(format!(
                "{} holds {} and cannot send {}",
                from, from_balance, amount
            ))
        })?;
        if from == to {
            return Ok(());
        }
        let new_to_balance = self
            .get_coins(ctx, to)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("balance of {}", to)))?;
        self.write_amount(ctx, balance_key(from), new_from_balance);
        self.write_amount(ctx, balance_key(to), new_to_balance);
        debug!("sent {} from {} to {}", amount, from, to);
        Ok(())
    }

    fn mint_coins(
        &self,
        ctx: &mut BlockContext,
        module: &str,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let account = self.module_with_permission(ctx, module, Some(ModulePermission::Minter))?;
        let balance = self
            .get_coins(ctx, &account.address)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("balance of module {}", module)))?;
        let supply = self
            .get_supply(ctx)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow("total supply".to_string()))?;
        self.write_amount(ctx, balance_key(&account.address), balance);
        self.write_amount(ctx, vec![SUPPLY_KEY], supply);
        debug!("minted {} on module {}", amount, module);
        Ok(())
    }

    fn burn_coins(
        &self,
        ctx: &mut BlockContext,
        module: &str,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let account = self.module_with_permission(ctx, module, Some(ModulePermission::Burner))?;
        let balance = self.get_coins(ctx, &account.address);
        let new_balance = balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::InsufficientFunds(format!(
                "module {} holds {} and cannot burn {}",
                module, balance, amount
            ))
        })?;
        let supply = self.get_supply(ctx).saturating_sub(amount);
        self.write_amount(ctx, balance_key(&account.address), new_balance);
        self.write_amount(ctx, vec![SUPPLY_KEY], supply);
        debug!("burnt {} on module {}", amount, module);
        Ok(())
    }

    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut BlockContext,
        module: &str,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let account = self.module_with_permission(ctx, module, None)?;
        self.send_coins(ctx, &account.address, to, amount)
    }

    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut BlockContext,
        from: &Address,
        module: &str,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let account = self.module_with_permission(ctx, module, None)?;
        self.send_coins(ctx, from, &account.address, amount)
    }

    fn send_coins_from_module_to_module(
        &self,
        ctx: &mut BlockContext,
        from_module: &str,
        to_module: &str,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let from = self.module_with_permission(ctx, from_module, None)?;
        let to = self.module_with_permission(ctx, to_module, None)?;
        self.send_coins(ctx, &from.address, &to.address, amount)
    }

    fn get_module_account(&self, ctx: &BlockContext, name: &str) -> Option<ModuleAccount> {
        ctx.store().get(&module_account_key(name)).map(|value| {
            let mask = value.first().copied().expect(MODULE_ACCOUNT_DESER_ERROR);
            ModuleAccount::from_mask(name, mask)
        })
    }

    fn register_module_account(
        &self,
        ctx: &mut BlockContext,
        account: ModuleAccount,
    ) -> Result<(), LedgerError> {
        let key = module_account_key(&account.name);
        if ctx.store().has(&key) {
            return Err(LedgerError::ModuleAlreadyRegistered(account.name));
        }
        ctx.store_mut().put(key, vec![account.permission_mask()]);
        info!("registered module account {} at {}", account.name, account.address);
        Ok(())
    }

    fn get_supply(&self, ctx: &BlockContext) -> Amount {
        self.read_amount(ctx, &[SUPPLY_KEY])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use parking_lot::RwLock;
    use relay_db_exports::{RelayDBConfig, RelayDBController, ShareableRelayDBController};
    use relay_db_worker::RelayDB;
    use relay_ledger_exports::{DAO_POOL_NAME, FEE_COLLECTOR_NAME, STAKED_POOL_NAME};
    use relay_models::BlockHeader;
    use relay_time::RelayTime;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, BlockContext, FinalLedger) {
        let temp_dir = tempfile::tempdir().expect("Unable to create a temp folder");
        let db: ShareableRelayDBController = Arc::new(RwLock::new(Box::new(RelayDB::new(
            RelayDBConfig {
                path: temp_dir.path().to_path_buf(),
                max_open_files: None,
            },
        )) as Box<dyn RelayDBController>));
        let ctx = BlockContext::new(
            BlockHeader {
                height: 1,
                time: RelayTime::from_millis(1000),
                proposer: Address::from_module_name("proposer"),
            },
            db,
        );
        let ledger = FinalLedger::new(LedgerConfig {
            initial_ledger_path: None,
        });
        (temp_dir, ctx, ledger)
    }

    fn register_pools(ledger: &FinalLedger, ctx: &mut BlockContext) {
        ledger
            .register_module_account(
                ctx,
                ModuleAccount::new(STAKED_POOL_NAME, &ModulePermission::ALL),
            )
            .unwrap();
        ledger
            .register_module_account(ctx, ModuleAccount::new(DAO_POOL_NAME, &ModulePermission::ALL))
            .unwrap();
        ledger
            .register_module_account(ctx, ModuleAccount::new(FEE_COLLECTOR_NAME, &[]))
            .unwrap();
    }

    #[test]
    fn test_send_coins() {
        let (_dir, mut ctx, ledger) = setup();
        let alice = Address::from_module_name("alice");
        let bob = Address::from_module_name("bob");
        ledger
            .load_initial_balances(&mut ctx, &BTreeMap::from([(alice, Amount::from_raw(100))]))
            .unwrap();
        assert_eq!(ledger.get_supply(&ctx), Amount::from_raw(100));

        ledger
            .send_coins(&mut ctx, &alice, &bob, Amount::from_raw(40))
            .unwrap();
        assert_eq!(ledger.get_coins(&ctx, &alice), Amount::from_raw(60));
        assert_eq!(ledger.get_coins(&ctx, &bob), Amount::from_raw(40));
        assert!(ledger.has_coins(&ctx, &bob, Amount::from_raw(40)));
        assert_matches!(
            ledger.send_coins(&mut ctx, &bob, &alice, Amount::from_raw(41)),
            Err(LedgerError::InsufficientFunds(_))
        );
        assert_eq!(ledger.get_coins(&ctx, &bob), Amount::from_raw(40));
        assert_eq!(ledger.get_supply(&ctx), Amount::from_raw(100));
    }

    #[test]
    fn test_mint_and_burn() {
        let (_dir, mut ctx, ledger) = setup();
        register_pools(&ledger, &mut ctx);
        ledger
            .mint_coins(&mut ctx, STAKED_POOL_NAME, Amount::from_raw(500))
            .unwrap();
        assert_eq!(ledger.get_supply(&ctx), Amount::from_raw(500));
        ledger
            .burn_coins(&mut ctx, STAKED_POOL_NAME, Amount::from_raw(200))
            .unwrap();
        assert_eq!(
            ledger.get_coins(&ctx, &ledger.get_module_address(STAKED_POOL_NAME)),
            Amount::from_raw(300)
        );
        assert_eq!(ledger.get_supply(&ctx), Amount::from_raw(300));
        assert_matches!(
            ledger.burn_coins(&mut ctx, STAKED_POOL_NAME, Amount::from_raw(301)),
            Err(LedgerError::InsufficientFunds(_))
        );
        assert_matches!(
            ledger.mint_coins(&mut ctx, FEE_COLLECTOR_NAME, Amount::from_raw(1)),
            Err(LedgerError::MissingPermission(_, _))
        );
        assert_matches!(
            ledger.mint_coins(&mut ctx, "unknown", Amount::from_raw(1)),
            Err(LedgerError::UnknownModule(_))
        );
        ledger
            .send_coins_from_module_to_module(
                &mut ctx,
                STAKED_POOL_NAME,
                DAO_POOL_NAME,
                Amount::from_raw(100),
            )
            .unwrap();
        assert_eq!(
            ledger.get_coins(&ctx, &ledger.get_module_address(DAO_POOL_NAME)),
            Amount::from_raw(100)
        );
    }

    #[test]
    fn test_module_registration() {
        let (_dir, mut ctx, ledger) = setup();
        assert!(ledger.get_module_account(&ctx, DAO_POOL_NAME).is_none());
        register_pools(&ledger, &mut ctx);
        let dao = ledger.get_module_account(&ctx, DAO_POOL_NAME).unwrap();
        assert!(dao.has_permission(ModulePermission::Burner));
        assert_matches!(
            ledger.register_module_account(&mut ctx, ModuleAccount::new(DAO_POOL_NAME, &[])),
            Err(LedgerError::ModuleAlreadyRegistered(_))
        );
    }

    #[test]
    fn test_branch_rollback() {
        let (_dir, mut ctx, ledger) = setup();
        let alice = Address::from_module_name("alice");
        let bob = Address::from_module_name("bob");
        ledger
            .load_initial_balances(&mut ctx, &BTreeMap::from([(alice, Amount::from_raw(10))]))
            .unwrap();
        ctx.branch();
        ledger
            .send_coins(&mut ctx, &alice, &bob, Amount::from_raw(10))
            .unwrap();
        ctx.discard_branch();
        assert_eq!(ledger.get_coins(&ctx, &alice), Amount::from_raw(10));
        assert_eq!(ledger.get_coins(&ctx, &bob), Amount::zero());
    }

    #[test]
    fn test_load_initial_ledger_file() {
        let (_dir, mut ctx, _) = setup();
        let alice = Address::from_module_name("alice");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"{}\": \"1234\"}}", alice).unwrap();
        let ledger = FinalLedger::new(LedgerConfig {
            initial_ledger_path: Some(file.path().to_path_buf()),
        });
        ledger.load_initial_ledger(&mut ctx).unwrap();
        assert_eq!(ledger.get_coins(&ctx, &alice), Amount::from_raw(1234));
        assert_eq!(ledger.get_supply(&ctx), Amount::from_raw(1234));
    }

    #[test]
    fn test_usable_as_account_keeper() {
        let (_dir, mut ctx, ledger) = setup();
        let alice = Address::from_module_name("alice");
        let keeper: Box<dyn AccountKeeper> = Box::new(ledger);
        assert_eq!(
            format!("{:?}", keeper),
            "FinalLedger { config: LedgerConfig { initial_ledger_path: None } }"
        );
        keeper
            .set_coins(&mut ctx, &alice, Amount::from_raw(7))
            .unwrap();
        assert!(keeper.has_coins(&ctx, &alice, Amount::from_raw(7)));
    }
}
