// Copyright (c) 2022 MASSA LABS <info@massa.net>

mod tools;

mod scenarios_genesis;
mod scenarios_liveness;
mod scenarios_queries;
mod scenarios_staking;
