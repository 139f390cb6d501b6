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

use crate::ProgressState;

/// Lifetime volume threshold that completes the onboarding campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnboardingRule {
    /// Cumulative `amount0In` in smallest units, inclusive.
    pub threshold: U256,
    pub points: u64,
}

impl OnboardingRule {
    pub fn evaluate(&self, cumulative_amount0_in: U256) -> ProgressState {
        if cumulative_amount0_in >= self.threshold {
            ProgressState::Completed
        } else {
            ProgressState::Pending
        }
    }
}
