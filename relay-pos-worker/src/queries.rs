// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::keeper::PosKeeper;
use relay_db_exports::BlockContext;
use relay_pos_exports::{
    PosError, PosQuery, QueryError, Validator, ValidatorStatus, ValidatorsPage,
    MAX_QUERY_PAGE_LIMIT,
};
use serde::Serialize;
use serde_json::{json, Value};

fn to_json<T: Serialize>(value: &T) -> Result<Value, QueryError> {
    serde_json::to_value(value)
        .map_err(|err| PosError::SerializationError(err.to_string()).into())
}

impl PosKeeper {
    /// Answers a read-only query with a JSON value
    pub fn handle_query(&self, ctx: &BlockContext, query: &PosQuery) -> Result<Value, QueryError> {
        match query {
            PosQuery::Validator(address) => {
                let validator = self
                    .get_validator(ctx, address)
                    .ok_or(PosError::ValidatorNotFound(*address))?;
                to_json(&validator)
            }
            PosQuery::Validators {
                status,
                page,
                limit,
            } => to_json(&self.validators_page(ctx, *status, *page, *limit)?),
            PosQuery::StakedValidators => {
                let validators: Vec<Validator> = self
                    .get_staked_validators(ctx)
                    .into_iter()
                    .filter_map(|(_, address)| self.get_validator(ctx, &address))
                    .collect();
                to_json(&validators)
            }
            PosQuery::SigningInfo(address) => {
                let info = self
                    .get_signing_info(ctx, address)
                    .ok_or(PosError::SigningInfoNotFound(*address))?;
                to_json(&info)
            }
            PosQuery::Params => to_json(&self.config.params),
            PosQuery::StakedPoolBalance => to_json(&self.get_staked_pool_balance(ctx)),
            PosQuery::DaoPoolBalance => to_json(&self.get_dao_pool_balance(ctx)),
            PosQuery::PreviousProposer => to_json(&self.get_previous_proposer(ctx)),
            PosQuery::WaitingValidators => to_json(&self.get_waiting_validators(ctx)),
            PosQuery::UnstakingValidators => {
                let queue: Vec<Value> = self
                    .get_unstaking_queue(ctx)
                    .into_iter()
                    .map(|(time, addresses)| {
                        json!({
                            "completion_time": time.to_millis(),
                            "addresses": addresses,
                        })
                    })
                    .collect();
                Ok(Value::Array(queue))
            }
            PosQuery::PrevStateTotalPower => to_json(&self.get_prev_state_total_power(ctx)),
            PosQuery::AccountBalance(address) => to_json(&self.ledger.get_coins(ctx, address)),
        }
    }

    fn validators_page(
        &self,
        ctx: &BlockContext,
        status: Option<ValidatorStatus>,
        page: u64,
        limit: u64,
    ) -> Result<ValidatorsPage, PosError> {
        if page == 0 || limit == 0 || limit > MAX_QUERY_PAGE_LIMIT {
            return Err(PosError::InvalidParams(format!(
                "page must be positive and limit in 1..={}, got page {} and limit {}",
                MAX_QUERY_PAGE_LIMIT, page, limit
            )));
        }
        let validators: Vec<Validator> = self
            .get_all_validators(ctx)
            .into_iter()
            .filter(|validator| status.map_or(true, |status| validator.status == status))
            .collect();
        let total = validators.len() as u64;
        let total_pages = total.div_ceil(limit);
        let skip = usize::try_from((page - 1).saturating_mul(limit)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(ValidatorsPage {
            result: validators.into_iter().skip(skip).take(take).collect(),
            page,
            total_pages,
        })
    }
}
