// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Block pipeline: `begin_block` and `end_block`

use crate::keeper::PosKeeper;
use relay_db_exports::BlockContext;
use relay_logging::relay_trace;
use relay_pos_exports::{BeginBlockRequest, EvidenceKind, ValidatorUpdate};
use tracing::{debug, warn};

impl PosKeeper {
    /// Pays the pending rewards, accounts the votes of the last commit and
    /// punishes the reported misbehaviors
    pub fn begin_block(&self, ctx: &mut BlockContext, request: &BeginBlockRequest) {
        self.clear_cache();
        let height = ctx.height();

        self.pay_relay_awards(ctx);
        if height > 1 {
            if let Some(previous_proposer) = self.get_previous_proposer(ctx) {
                self.block_reward(ctx, &previous_proposer);
            }
        }
        let proposer = ctx.proposer();
        self.set_previous_proposer(ctx, &proposer);

        self.increment_jailed_validators(ctx);
        for vote in &request.votes {
            self.handle_validator_signature(ctx, &vote.address, vote.power, vote.signed);
        }
        for evidence in &request.evidence {
            match evidence.kind {
                EvidenceKind::DuplicateVote => self.handle_double_sign(ctx, evidence),
                other => warn!(
                    "ignored evidence of kind {:?} against {} at height {}",
                    other, evidence.address, evidence.height
                ),
            }
        }
        relay_trace!("pos.begin_block", {
            "height": height,
            "proposer": proposer.to_string(),
            "votes": request.votes.len(),
            "evidence": request.evidence.len()
        });
    }

    /// Releases the waiting validators at session boundaries, computes the
    /// changes of the consensus set and pays back the mature unstakings
    pub fn end_block(&self, ctx: &mut BlockContext) -> Vec<ValidatorUpdate> {
        let height = ctx.height();
        if height % self.config.params.session_block_frequency == 0 {
            self.release_waiting_validators(ctx);
        }
        let updates = self.update_validator_set(ctx);
        self.unstake_mature_validators(ctx);
        relay_trace!("pos.end_block", { "height": height, "updates": updates.len() });
        updates
    }

    /// Diffs the top `max_validators` staked validators against the powers
    /// reported at the previous update.
    ///
    /// Changed or new validators come first, by decreasing power, then the
    /// removed ones with power zero, by increasing address.
    pub(crate) fn update_validator_set(&self, ctx: &mut BlockContext) -> Vec<ValidatorUpdate> {
        let max_validators =
            usize::try_from(self.config.params.max_validators).unwrap_or(usize::MAX);
        let mut previous = self.get_prev_state_powers(ctx);
        let mut updates = Vec::new();
        let mut total_power: u64 = 0;

        for (indexed_power, address) in self
            .get_staked_validators(ctx)
            .into_iter()
            .take(max_validators)
        {
            let validator = match self.get_validator(ctx, &address) {
                Some(validator) => validator,
                None => panic!(
                    "critical: validator {} of the staked index is not in the store",
                    address
                ),
            };
            if validator.jailed {
                panic!("critical: jailed validator {} in the staked index", address);
            }
            let power = validator.consensus_power(self.config.power_reduction);
            if power == 0 || power != indexed_power {
                panic!(
                    "critical: validator {} has power {} but is indexed with power {}",
                    address, power, indexed_power
                );
            }
            total_power = total_power.saturating_add(power);
            if previous.remove(&address) != Some(power) {
                updates.push(ValidatorUpdate {
                    public_key: validator.public_key,
                    power,
                });
                self.set_prev_state_power(ctx, &address, power);
            }
        }

        for address in previous.into_keys() {
            match self.get_public_key(ctx, &address) {
                Some(public_key) => updates.push(ValidatorUpdate {
                    public_key,
                    power: 0,
                }),
                None => panic!(
                    "critical: no public key bound to the previous validator {}",
                    address
                ),
            }
            self.delete_prev_state_power(ctx, &address);
        }

        if !updates.is_empty() {
            self.set_prev_state_total_power(ctx, total_power);
            debug!(
                "{} validator updates at height {}, total power {}",
                updates.len(),
                ctx.height(),
                total_power
            );
        }
        updates
    }
}
