// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Swap event decoding, block location and reward computation for trading campaigns.

use std::{fmt, str::FromStr};

pub mod amounts;
pub mod blocks;
pub mod chain;
pub mod events;
pub mod onboarding;
pub mod pricing;
pub mod share_pool;

pub use amounts::{u256_to_decimal, AmountError};

pub use blocks::{find_block_at_or_after, partition_point_by_timestamp};

pub use chain::{BlockInfo, ChainError, ChainSource, ChainSourceObj, LogStream, RpcChain};

pub use events::{decode_swap_log, swap_filter, BlockBatches, DecodeError, IUniswapV2Pair, SwapEvent};

pub use onboarding::OnboardingRule;

pub use pricing::{RewardsConfig, TokenPricing};

pub use share_pool::{
    allocate_window_points, campaign_end, campaign_windows, last_instant_of_week, CampaignWindow,
    RewardsError, SenderVolume, SharePoolAward, SharePoolTally,
};

/// Number of blocks covered by a single historical `eth_getLogs` query.
pub const LOG_QUERY_BATCH_SIZE: u64 = 10_000;
/// Number of weekly windows in a share-pool campaign.
pub const CAMPAIGN_WEEKS: u32 = 4;
/// Length of a share-pool campaign, counted from its start instant.
pub const CAMPAIGN_DURATION_DAYS: i64 = 28;

/// Progress of a user through a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressState {
    Pending,
    Completed,
}

impl ProgressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressState::Pending => "pending",
            ProgressState::Completed => "completed",
        }
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProgressState::Pending),
            "completed" => Ok(ProgressState::Completed),
            other => Err(format!("unknown progress state: {other}")),
        }
    }
}

/// Kind of campaign a user can earn points in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CampaignKind {
    /// Single global campaign rewarding the first 1000 USDC of swap volume.
    Onboarding,
    /// Per-pool campaign splitting a weekly point pool by USD volume.
    SharePool,
}

impl CampaignKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignKind::Onboarding => "onboarding",
            CampaignKind::SharePool => "share_pool",
        }
    }
}

impl fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onboarding" => Ok(CampaignKind::Onboarding),
            "share_pool" => Ok(CampaignKind::SharePool),
            other => Err(format!("unknown campaign kind: {other}")),
        }
    }
}
