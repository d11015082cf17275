// Copyright (c) 2022 MASSA LABS <info@massa.net>

use num::rational::Ratio;
use relay_db_exports::BlockContext;
use relay_models::Address;

/// Callbacks notified by the keeper around validator transitions.
///
/// Every method defaults to a no-op. Hooks observe the block context but
/// cannot write to it.
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait PosHooks: Send + Sync {
    /// a validator record was created
    fn after_validator_registered(&self, _ctx: &BlockContext, _address: &Address) {}

    /// a validator is about to be staked or edited
    fn before_validator_staked(&self, _ctx: &BlockContext, _address: &Address) {}

    /// a validator was staked or edited
    fn after_validator_staked(&self, _ctx: &BlockContext, _address: &Address) {}

    /// a validator is about to enter the waiting set
    fn before_validator_begin_unstaking(&self, _ctx: &BlockContext, _address: &Address) {}

    /// a validator entered the waiting set
    fn after_validator_begin_unstaking(&self, _ctx: &BlockContext, _address: &Address) {}

    /// a validator is about to become unstaked
    fn before_validator_unstaked(&self, _ctx: &BlockContext, _address: &Address) {}

    /// a validator became unstaked
    fn after_validator_unstaked(&self, _ctx: &BlockContext, _address: &Address) {}

    /// a validator is about to be slashed by `fraction`
    fn before_validator_slashed(
        &self,
        _ctx: &BlockContext,
        _address: &Address,
        _fraction: Ratio<u64>,
    ) {
    }

    /// a validator was slashed by `fraction`
    fn after_validator_slashed(
        &self,
        _ctx: &BlockContext,
        _address: &Address,
        _fraction: Ratio<u64>,
    ) {
    }

    /// a validator was jailed
    fn after_validator_jailed(&self, _ctx: &BlockContext, _address: &Address) {}
}
