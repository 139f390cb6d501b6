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

use tokio::sync::RwLock;

use crate::{
    db::{Campaign, RewardsDbObj},
    error::ServiceError,
};

/// Lazily loaded copy of the onboarding campaign row.
///
/// The row is read once and reused by every onboarding check until [Self::invalidate].
pub struct OnboardingCampaignCache {
    db: RewardsDbObj,
    campaign: RwLock<Option<Campaign>>,
}

impl OnboardingCampaignCache {
    pub fn new(db: RewardsDbObj) -> Self {
        Self { db, campaign: RwLock::new(None) }
    }

    pub async fn get(&self) -> Result<Campaign, ServiceError> {
        if let Some(campaign) = self.campaign.read().await.as_ref() {
            return Ok(campaign.clone());
        }

        let mut cached = self.campaign.write().await;
        // Another task may have loaded it while we waited for the write lock.
        if let Some(campaign) = cached.as_ref() {
            return Ok(campaign.clone());
        }
        let campaign = self
            .db
            .get_onboarding_campaign()
            .await?
            .ok_or_else(|| ServiceError::Config("onboarding campaign is not configured".into()))?;
        tracing::debug!("Loaded onboarding campaign {}", campaign.id);
        *cached = Some(campaign.clone());
        Ok(campaign)
    }

    pub async fn invalidate(&self) {
        self.campaign.write().await.take();
    }
}
