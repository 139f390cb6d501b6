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

use alloy::primitives::U256;
use rust_decimal::Decimal;

use crate::{
    amounts::{from_token_units, to_token_units, AmountError},
    onboarding::OnboardingRule,
    CAMPAIGN_WEEKS,
};

/// Fixed USD price and precision of one side of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPricing {
    pub price_usd: Decimal,
    pub decimals: u32,
}

impl TokenPricing {
    pub const fn new(price_usd: Decimal, decimals: u32) -> Self {
        Self { price_usd, decimals }
    }

    /// USD value of a raw amount in smallest units.
    pub fn to_usd(&self, raw: U256) -> Result<Decimal, AmountError> {
        to_token_units(raw, self.decimals)?
            .checked_mul(self.price_usd)
            .ok_or(AmountError::Arithmetic("pricing swap volume"))
    }
}

/// Parameters of the reward engine.
///
/// `token0` is the stable side of the pool (USDC) and `token1` the volatile side (ETH).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardsConfig {
    pub token0: TokenPricing,
    pub token1: TokenPricing,
    /// Points split between participants of each weekly window.
    pub weekly_points: Decimal,
    /// Onboarding threshold in whole `token0` units.
    pub onboarding_threshold: u64,
    /// Points awarded once when onboarding completes.
    pub onboarding_points: u64,
    pub campaign_weeks: u32,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            token0: TokenPricing::new(Decimal::ONE, 6),
            token1: TokenPricing::new(Decimal::from(2000), 18),
            weekly_points: Decimal::from(10_000),
            onboarding_threshold: 1000,
            onboarding_points: 100,
            campaign_weeks: CAMPAIGN_WEEKS,
        }
    }
}

impl RewardsConfig {
    /// USD value of a swap's input side: `amount0 * price0 + amount1 * price1`.
    pub fn usd_volume(&self, amount0_in: U256, amount1_in: U256) -> Result<Decimal, AmountError> {
        self.token0
            .to_usd(amount0_in)?
            .checked_add(self.token1.to_usd(amount1_in)?)
            .ok_or(AmountError::Arithmetic("summing swap volume"))
    }

    pub fn onboarding_rule(&self) -> Result<OnboardingRule, AmountError> {
        Ok(OnboardingRule {
            threshold: from_token_units(self.onboarding_threshold, self.token0.decimals)?,
            points: self.onboarding_points,
        })
    }
}
