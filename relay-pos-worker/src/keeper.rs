// Copyright (c) 2022 MASSA LABS <info@massa.net>

use parking_lot::Mutex;
use relay_db_exports::BlockContext;
use relay_ledger_exports::AccountKeeper;
use relay_models::Address;
use relay_pos_exports::{
    PosConfig, PosHooks, PosParams, SigningInfoDeserializer, SigningInfoSerializer, Validator,
    ValidatorDeserializer, ValidatorSerializer,
};
use relay_serialization::{U64VarIntDeserializer, U64VarIntSerializer};
use schnellru::{ByLength, LruMap};
use std::ops::Bound::Included;

/// The proof-of-stake state machine.
///
/// Owns no state besides its configuration and a read cache: every record
/// lives in the store and is reached through the `BlockContext` of the
/// block being executed.
pub struct PosKeeper {
    pub(crate) config: PosConfig,
    pub(crate) ledger: Box<dyn AccountKeeper>,
    pub(crate) hooks: Option<Box<dyn PosHooks>>,
    /// decoded validators by address, always equal to the store content
    pub(crate) validator_cache: Mutex<LruMap<Address, Validator>>,
    pub(crate) validator_serializer: ValidatorSerializer,
    pub(crate) validator_deserializer: ValidatorDeserializer,
    pub(crate) signing_info_serializer: SigningInfoSerializer,
    pub(crate) signing_info_deserializer: SigningInfoDeserializer,
    pub(crate) u64_serializer: U64VarIntSerializer,
    pub(crate) u64_deserializer: U64VarIntDeserializer,
}

impl std::fmt::Debug for PosKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosKeeper")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

impl PosKeeper {
    /// Creates a keeper over the given account keeper.
    /// `hooks` are notified around validator transitions, `None` disables them.
    pub fn new(
        config: PosConfig,
        ledger: Box<dyn AccountKeeper>,
        hooks: Option<Box<dyn PosHooks>>,
    ) -> Self {
        let cache_size = config.validator_cache_size;
        let max_chains = config.params.max_chains;
        PosKeeper {
            config,
            ledger,
            hooks,
            validator_cache: Mutex::new(LruMap::new(ByLength::new(cache_size))),
            validator_serializer: ValidatorSerializer::new(),
            validator_deserializer: ValidatorDeserializer::new(max_chains),
            signing_info_serializer: SigningInfoSerializer::new(),
            signing_info_deserializer: SigningInfoDeserializer::new(),
            u64_serializer: U64VarIntSerializer::new(),
            u64_deserializer: U64VarIntDeserializer::new(Included(0), Included(u64::MAX)),
        }
    }

    /// Module configuration
    pub fn config(&self) -> &PosConfig {
        &self.config
    }

    /// State machine parameters
    pub fn params(&self) -> &PosParams {
        &self.config.params
    }

    /// Account keeper used for every coin movement
    pub fn ledger(&self) -> &dyn AccountKeeper {
        self.ledger.as_ref()
    }

    /// Drops every cached validator
    pub fn clear_cache(&self) {
        self.validator_cache.lock().clear();
    }

    /// Runs `f` on the hooks, if any
    pub(crate) fn notify<F: FnOnce(&dyn PosHooks)>(&self, f: F) {
        if let Some(hooks) = &self.hooks {
            f(hooks.as_ref());
        }
    }

    /// True if output addresses are honored in the block of `ctx`
    pub(crate) fn is_non_custodial(&self, ctx: &BlockContext) -> bool {
        self.config
            .upgrade_heights
            .is_non_custodial(ctx.height())
    }

    /// Destination of the rewards and of the unstaked coins of `validator`
    pub(crate) fn payout_address(&self, ctx: &BlockContext, validator: &Validator) -> Address {
        match validator.output_address {
            Some(output) if self.is_non_custodial(ctx) => output,
            _ => validator.address,
        }
    }

    /// True if `signer` may act on behalf of `validator`: the operator always,
    /// the output address once outputs are honored
    pub(crate) fn is_authorized_signer(
        &self,
        ctx: &BlockContext,
        validator: &Validator,
        signer: &Address,
    ) -> bool {
        if *signer == validator.address {
            return true;
        }
        self.is_non_custodial(ctx) && validator.output_address.as_ref() == Some(signer)
    }
}
