// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Liveness tracking: signing infos and the missed-block bit arrays

use crate::keeper::PosKeeper;
use crate::keys::{missed_block_index, missed_block_key, missed_blocks_prefix, signing_info_key};
use relay_db_exports::{
    BlockContext, SIGNING_INFO_DESER_ERROR, SIGNING_INFO_PREFIX, SIGNING_INFO_SER_ERROR,
};
use relay_models::config::VALIDATOR_UPDATE_DELAY;
use relay_models::{Address, Event};
use relay_pos_exports::events::{
    ATTRIBUTE_ADDRESS, ATTRIBUTE_HEIGHT, ATTRIBUTE_JAILED, ATTRIBUTE_MISSED_BLOCKS,
    ATTRIBUTE_POWER, ATTRIBUTE_REASON, EVENT_LIVENESS, EVENT_SLASH, REASON_MAX_JAILED_BLOCKS,
    REASON_MISSING_SIGNATURE,
};
use relay_pos_exports::SigningInfo;
use relay_serialization::{deserialize_all, Serializer};
use tracing::{debug, info, warn};

const MISSED: u8 = 1;

impl PosKeeper {
    /// Signing info of the consensus address `address`
    pub fn get_signing_info(&self, ctx: &BlockContext, address: &Address) -> Option<SigningInfo> {
        ctx.store().get(&signing_info_key(address)).map(|bytes| {
            deserialize_all(&self.signing_info_deserializer, &bytes)
                .expect(SIGNING_INFO_DESER_ERROR)
        })
    }

    /// Writes a signing info
    pub fn set_signing_info(&self, ctx: &mut BlockContext, info: &SigningInfo) {
        let mut bytes = Vec::new();
        self.signing_info_serializer
            .serialize(info, &mut bytes)
            .expect(SIGNING_INFO_SER_ERROR);
        ctx.store_mut().put(signing_info_key(&info.address), bytes);
    }

    /// Every signing info, by address
    pub fn get_all_signing_infos(&self, ctx: &BlockContext) -> Vec<SigningInfo> {
        ctx.store()
            .prefix_iter(&[SIGNING_INFO_PREFIX])
            .into_iter()
            .map(|(_, bytes)| {
                deserialize_all(&self.signing_info_deserializer, &bytes)
                    .expect(SIGNING_INFO_DESER_ERROR)
            })
            .collect()
    }

    /// Creates a fresh signing info starting at the current height, unless one exists
    pub(crate) fn ensure_signing_info(&self, ctx: &mut BlockContext, address: &Address) {
        if self.get_signing_info(ctx, address).is_none() {
            let info = SigningInfo::new(*address, ctx.height());
            self.set_signing_info(ctx, &info);
        }
    }

    /// True if the block at `index` of the window was missed
    pub fn get_missed_block(&self, ctx: &BlockContext, address: &Address, index: u64) -> bool {
        ctx.store().has(&missed_block_key(address, index))
    }

    /// Sets or clears the missed flag at `index` of the window
    pub(crate) fn set_missed_block(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        index: u64,
        missed: bool,
    ) {
        let key = missed_block_key(address, index);
        if missed {
            ctx.store_mut().put(key, vec![MISSED]);
        } else {
            ctx.store_mut().delete(key);
        }
    }

    /// Indexes of the missed blocks of the window, increasing
    pub fn get_missed_blocks(&self, ctx: &BlockContext, address: &Address) -> Vec<u64> {
        ctx.store()
            .prefix_iter(&missed_blocks_prefix(address))
            .into_iter()
            .filter_map(|(key, _)| missed_block_index(&key))
            .collect()
    }

    /// Clears the whole missed-block array of `address`
    pub(crate) fn clear_missed_blocks(&self, ctx: &mut BlockContext, address: &Address) {
        let entries = ctx.store().prefix_iter(&missed_blocks_prefix(address));
        for (key, _) in entries {
            ctx.store_mut().delete(key);
        }
    }

    /// Accounts the vote of `address` in the last commit and punishes downtime.
    ///
    /// The missed counter always equals the number of set bits in the window:
    /// a bit is only written, and the counter only moved, when the flag changes.
    pub fn handle_validator_signature(
        &self,
        ctx: &mut BlockContext,
        address: &Address,
        power: u64,
        signed: bool,
    ) {
        let height = ctx.height();
        let params = &self.config.params;
        let validator = match self.get_validator_by_consensus_address(ctx, address) {
            Some(validator) => validator,
            None => {
                debug!("vote of unknown validator {} at height {} ignored", address, height);
                return;
            }
        };
        let mut info = match self.get_signing_info(ctx, address) {
            Some(info) => info,
            None => {
                debug!("validator {} has no signing info yet, vote ignored", address);
                return;
            }
        };

        let index = info.index_offset % params.signed_blocks_window;
        info.index_offset = info.index_offset.saturating_add(1);
        let previous = self.get_missed_block(ctx, address, index);
        let missed = !signed;
        if previous != missed {
            self.set_missed_block(ctx, address, index, missed);
            if missed {
                info.missed_blocks_counter = info.missed_blocks_counter.saturating_add(1);
            } else {
                info.missed_blocks_counter = info.missed_blocks_counter.saturating_sub(1);
            }
        }

        if missed {
            if info.missed_blocks_counter == 1 {
                info!(
                    "validator {} started missing blocks at height {}",
                    address, height
                );
            }
            ctx.emit_event(
                Event::new(EVENT_LIVENESS)
                    .with_attribute(ATTRIBUTE_ADDRESS, address)
                    .with_attribute(ATTRIBUTE_MISSED_BLOCKS, info.missed_blocks_counter)
                    .with_attribute(ATTRIBUTE_HEIGHT, height),
            );
        }

        let min_height = info.start_height.saturating_add(params.signed_blocks_window);
        let max_missed = params.max_missed_blocks();
        if height > min_height && info.missed_blocks_counter > max_missed {
            if !validator.jailed && !validator.is_unstaked() {
                // votes of the last commit were cast by the set of height - 1 - delay
                let distribution_height = height.saturating_sub(VALIDATOR_UPDATE_DELAY + 1);
                warn!(
                    "validator {} missed {} blocks out of {}, slashing and jailing",
                    address, info.missed_blocks_counter, params.signed_blocks_window
                );
                self.slash(
                    ctx,
                    &validator.address,
                    distribution_height,
                    power,
                    params.slash_fraction_downtime,
                );
                self.jail_validator(ctx, &validator.address);
                let jailed = self
                    .get_validator(ctx, &validator.address)
                    .map(|validator| validator.jailed)
                    .unwrap_or(false);
                ctx.emit_event(
                    Event::new(EVENT_SLASH)
                        .with_attribute(ATTRIBUTE_ADDRESS, address)
                        .with_attribute(ATTRIBUTE_POWER, power)
                        .with_attribute(ATTRIBUTE_REASON, REASON_MISSING_SIGNATURE)
                        .with_attribute(ATTRIBUTE_JAILED, jailed),
                );
                info.jailed_until = ctx.block_time().saturating_add(params.downtime_jail_duration);
                info.missed_blocks_counter = 0;
                info.index_offset = 0;
                self.clear_missed_blocks(ctx, address);
            } else {
                debug!(
                    "validator {} would be slashed for downtime but is already jailed or unstaked",
                    address
                );
            }
        }
        self.set_signing_info(ctx, &info);
    }

    /// Counts one more block for every jailed validator and force unstakes
    /// the ones that stayed jailed for `max_jailed_blocks` blocks
    pub fn increment_jailed_validators(&self, ctx: &mut BlockContext) {
        let max_jailed_blocks = self.config.params.max_jailed_blocks;
        let jailed: Vec<Address> = self
            .get_all_validators(ctx)
            .into_iter()
            .filter(|validator| validator.jailed && !validator.is_unstaked())
            .map(|validator| validator.address)
            .collect();
        for address in jailed {
            let mut info = match self.get_signing_info(ctx, &address) {
                Some(info) => info,
                None => {
                    warn!("jailed validator {} has no signing info", address);
                    continue;
                }
            };
            info.jailed_blocks_counter = info.jailed_blocks_counter.saturating_add(1);
            if info.jailed_blocks_counter >= max_jailed_blocks {
                info.jailed_blocks_counter = 0;
                self.set_signing_info(ctx, &info);
                if let Some(validator) = self.get_validator(ctx, &address) {
                    info!(
                        "validator {} stayed jailed for {} blocks, force unstaking",
                        address, max_jailed_blocks
                    );
                    self.force_unstake_validator(ctx, validator, REASON_MAX_JAILED_BLOCKS);
                }
            } else {
                self.set_signing_info(ctx, &info);
            }
        }
    }
}
