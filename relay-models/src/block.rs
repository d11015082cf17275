// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::address::Address;
use relay_time::RelayTime;
use serde::{Deserialize, Serialize};

/// Header of the block being executed, as delivered by the consensus engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// height of the block, the first block has height 1
    pub height: u64,
    /// block time given by consensus, never read from the local clock
    pub time: RelayTime,
    /// consensus address of the proposer of this block
    pub proposer: Address,
}
