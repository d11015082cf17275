// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Transaction delivery

use crate::keeper::PosKeeper;
use relay_db_exports::BlockContext;
use relay_ledger_exports::FEE_COLLECTOR_NAME;
use relay_models::{Address, Event};
use relay_pos_exports::events::{
    ATTRIBUTE_AMOUNT, ATTRIBUTE_RECIPIENT, ATTRIBUTE_SENDER, EVENT_TRANSFER,
};
use relay_pos_exports::{PosError, PosMessage, SignedTx};
use tracing::debug;

impl PosKeeper {
    /// Checks a transaction, charges its fee and executes its message.
    ///
    /// The fee stays paid when the message fails, every other write of the
    /// message is rolled back.
    pub fn deliver_tx(&self, ctx: &mut BlockContext, tx: &SignedTx) -> Result<(), PosError> {
        tx.msg.validate_basic()?;
        tx.verify_signature()?;
        let signer = tx.signer();
        if let Some(expected) = tx.msg.expected_signer() {
            if expected != signer {
                return Err(PosError::UnauthorizedSigner(format!(
                    "{} message must be signed by {}, not {}",
                    tx.msg.name(),
                    expected,
                    signer
                )));
            }
        }
        if tx.fee < self.config.tx_fee {
            return Err(PosError::InsufficientFee(format!(
                "fee {} is below the minimum {}",
                tx.fee, self.config.tx_fee
            )));
        }
        self.charge_fee(ctx, &signer, tx)?;

        ctx.branch();
        match self.handle_message(ctx, &tx.msg, &signer) {
            Ok(()) => {
                ctx.commit_branch();
                debug!("{} message of {} executed", tx.msg.name(), signer);
                Ok(())
            }
            Err(err) => {
                ctx.discard_branch();
                self.clear_cache();
                debug!("{} message of {} failed: {}", tx.msg.name(), signer, err);
                Err(err)
            }
        }
    }

    fn charge_fee(
        &self,
        ctx: &mut BlockContext,
        signer: &Address,
        tx: &SignedTx,
    ) -> Result<(), PosError> {
        if tx.fee.is_zero() {
            return Ok(());
        }
        if !self.ledger.has_coins(ctx, signer, tx.fee) {
            return Err(PosError::InsufficientFee(format!(
                "{} holds {} and cannot pay a fee of {}",
                signer,
                self.ledger.get_coins(ctx, signer),
                tx.fee
            )));
        }
        self.ledger
            .send_coins_from_account_to_module(ctx, signer, FEE_COLLECTOR_NAME, tx.fee)?;
        Ok(())
    }

    fn handle_message(
        &self,
        ctx: &mut BlockContext,
        msg: &PosMessage,
        signer: &Address,
    ) -> Result<(), PosError> {
        match msg {
            PosMessage::Stake(stake) => self.handle_stake(ctx, stake, signer),
            PosMessage::BeginUnstake { address, .. } => self.begin_unstake(ctx, address, signer),
            PosMessage::Unjail { address, .. } => self.unjail(ctx, address, signer),
            PosMessage::Send { from, to, amount } => {
                if !self.ledger.has_coins(ctx, from, *amount) {
                    return Err(PosError::NotEnoughCoins(format!(
                        "{} holds {} and cannot send {}",
                        from,
                        self.ledger.get_coins(ctx, from),
                        amount
                    )));
                }
                self.ledger.send_coins(ctx, from, to, *amount)?;
                ctx.emit_event(
                    Event::new(EVENT_TRANSFER)
                        .with_attribute(ATTRIBUTE_SENDER, from)
                        .with_attribute(ATTRIBUTE_RECIPIENT, to)
                        .with_attribute(ATTRIBUTE_AMOUNT, amount),
                );
                Ok(())
            }
        }
    }
}
