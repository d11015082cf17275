// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Accounting invariants that hold after every committed block

use crate::keeper::PosKeeper;
use relay_db_exports::BlockContext;
use relay_models::Amount;
use relay_pos_exports::PosError;

impl PosKeeper {
    /// Returns the first broken invariant, if any
    pub fn check_invariants(&self, ctx: &BlockContext) -> Result<(), PosError> {
        let validators = self.get_all_validators(ctx);

        let bonded = validators
            .iter()
            .filter(|validator| !validator.is_unstaked())
            .fold(Amount::zero(), |total, validator| {
                total.saturating_add(validator.staked_tokens)
            });
        let pool = self.get_staked_pool_balance(ctx);
        if pool != bonded {
            return Err(PosError::InvariantBroken(format!(
                "staked pool holds {} but validators bond {}",
                pool, bonded
            )));
        }

        for (power, address) in self.get_staked_validators(ctx) {
            let validator = self.get_validator(ctx, &address).ok_or_else(|| {
                PosError::InvariantBroken(format!("indexed validator {} does not exist", address))
            })?;
            if validator.jailed {
                return Err(PosError::InvariantBroken(format!(
                    "jailed validator {} is in the staked index",
                    address
                )));
            }
            if !validator.is_staked() {
                return Err(PosError::InvariantBroken(format!(
                    "validator {} with status {:?} is in the staked index",
                    address, validator.status
                )));
            }
            if power == 0 || power != validator.consensus_power(self.config.power_reduction) {
                return Err(PosError::InvariantBroken(format!(
                    "validator {} is indexed with power {}",
                    address, power
                )));
            }
        }

        for validator in validators.iter().filter(|validator| validator.is_unstaking()) {
            let queued = self.get_unstaking_addresses(ctx, validator.unstaking_completion_time);
            if !queued.contains(&validator.address) {
                return Err(PosError::InvariantBroken(format!(
                    "unstaking validator {} is not queued at {}",
                    validator.address,
                    validator.unstaking_completion_time.to_millis()
                )));
            }
        }

        for info in self.get_all_signing_infos(ctx) {
            let missed = self.get_missed_blocks(ctx, &info.address).len() as u64;
            if missed != info.missed_blocks_counter {
                return Err(PosError::InvariantBroken(format!(
                    "{} counts {} missed blocks but its window holds {}",
                    info.address, info.missed_blocks_counter, missed
                )));
            }
        }

        for validator in &validators {
            if validator.delegators_share() > 100 {
                return Err(PosError::InvariantBroken(format!(
                    "delegators of {} share {}%",
                    validator.address,
                    validator.delegators_share()
                )));
            }
        }
        Ok(())
    }
}
