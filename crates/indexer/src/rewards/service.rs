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

use std::{collections::HashMap, sync::Arc};

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use swap_rewards::{
    campaign_windows, u256_to_decimal, CampaignKind, ProgressState, RewardsConfig, SharePoolTally,
};
use tokio::sync::Mutex;

use super::cache::OnboardingCampaignCache;
use crate::{
    db::{Campaign, RewardsDbObj, UserCampaignSummary, UserPoints, UserProgress},
    error::ServiceError,
};

/// Result of evaluating a user against the onboarding campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingOutcome {
    /// The user had already completed onboarding; nothing was written.
    AlreadyCompleted,
    /// The threshold was crossed by this check and the points were awarded.
    Completed { amount: Decimal, points: u64 },
    Pending { amount: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementSummary {
    pub campaign_id: String,
    pub windows_settled: u32,
    pub participants: usize,
    pub state: ProgressState,
}

/// Outcome of settling every share-pool campaign.
#[derive(Debug, Default)]
pub struct SettlementReport {
    pub settled: Vec<SettlementSummary>,
    pub failed: Vec<(String, ServiceError)>,
}

/// Computes and persists campaign rewards from the swap ledger.
pub struct RewardsService {
    db: RewardsDbObj,
    config: RewardsConfig,
    onboarding: OnboardingCampaignCache,
    settle_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RewardsService {
    pub fn new(db: RewardsDbObj, config: RewardsConfig) -> Self {
        Self {
            onboarding: OnboardingCampaignCache::new(db.clone()),
            db,
            config,
            settle_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RewardsConfig {
        &self.config
    }

    pub fn onboarding_cache(&self) -> &OnboardingCampaignCache {
        &self.onboarding
    }

    /// Re-evaluate `user` against the onboarding threshold using their lifetime volume.
    ///
    /// Points are written only on the transition to completed.
    pub async fn check_onboarding(&self, user: Address) -> Result<OnboardingOutcome, ServiceError> {
        let campaign = self.onboarding.get().await?;

        if let Some(progress) = self.db.get_progress(user, &campaign.id).await? {
            if progress.state == ProgressState::Completed {
                return Ok(OnboardingOutcome::AlreadyCompleted);
            }
        }

        let rule = self.config.onboarding_rule()?;
        let total = self.db.total_amount0_in_by_sender(user).await?;
        let amount = u256_to_decimal(total)?;
        let state = rule.evaluate(total);

        // The store never moves a completed row back to pending.
        let progress = UserProgress { user, campaign_id: campaign.id.clone(), state, amount };
        match state {
            ProgressState::Completed => {
                let points =
                    UserPoints { user, campaign_id: campaign.id.clone(), points: rule.points };
                if !self.db.record_onboarding(&progress, Some(&points)).await? {
                    return Ok(OnboardingOutcome::AlreadyCompleted);
                }
                tracing::info!("User {user:#x} completed onboarding with {amount} units");
                Ok(OnboardingOutcome::Completed { amount, points: rule.points })
            }
            ProgressState::Pending => {
                if !self.db.record_onboarding(&progress, None).await? {
                    tracing::debug!("User {user:#x} completed onboarding concurrently");
                    return Ok(OnboardingOutcome::AlreadyCompleted);
                }
                tracing::debug!("User {user:#x} onboarding pending at {amount} units");
                Ok(OnboardingOutcome::Pending { amount })
            }
        }
    }

    pub async fn settle_share_pool(
        &self,
        campaign: &Campaign,
    ) -> Result<SettlementSummary, ServiceError> {
        self.settle_share_pool_at(campaign, Utc::now()).await
    }

    /// Recompute all points of a share-pool campaign from the windows elapsed at `now`.
    ///
    /// Every run replaces the stored totals, so repeated runs with the same ledger agree.
    pub async fn settle_share_pool_at(
        &self,
        campaign: &Campaign,
        now: DateTime<Utc>,
    ) -> Result<SettlementSummary, ServiceError> {
        if campaign.kind != CampaignKind::SharePool {
            return Err(ServiceError::Config(format!(
                "campaign {} is not a share-pool campaign",
                campaign.id
            )));
        }
        let pool = campaign.pool_address.ok_or_else(|| {
            ServiceError::Config(format!("campaign {} has no pool address", campaign.id))
        })?;

        let lock = self.campaign_lock(&campaign.id).await;
        let _guard = lock.lock().await;

        let start_time = std::time::Instant::now();
        let onboarding = self.onboarding.get().await?;
        let mut tally = SharePoolTally::new(&self.config);

        for window in campaign_windows(campaign.start_at, self.config.campaign_weeks) {
            if !window.has_elapsed(now) {
                break;
            }
            let volumes = self
                .db
                .window_volumes(
                    pool,
                    &onboarding.id,
                    window.start.timestamp().max(0) as u64,
                    window.end.timestamp().max(0) as u64,
                )
                .await?;
            tracing::debug!(
                "Campaign {} window {}: {} participants",
                campaign.id,
                window.index,
                volumes.len()
            );
            tally.add_window(&volumes)?;
        }

        let windows_settled = tally.windows_settled();
        let state = if windows_settled >= self.config.campaign_weeks {
            ProgressState::Completed
        } else {
            ProgressState::Pending
        };

        let awards = tally.into_awards()?;
        let participants = awards.len();
        let mut progress = Vec::with_capacity(participants);
        let mut points = Vec::with_capacity(participants);
        for award in awards {
            progress.push(UserProgress {
                user: award.user,
                campaign_id: campaign.id.clone(),
                state,
                amount: award.volume_usd,
            });
            points.push(UserPoints {
                user: award.user,
                campaign_id: campaign.id.clone(),
                points: award.points,
            });
        }
        self.db.record_rewards(progress, points).await?;

        tracing::info!(
            "Settled campaign {} ({} windows, {} participants, {}) in {:.2}s",
            campaign.id,
            windows_settled,
            participants,
            state,
            start_time.elapsed().as_secs_f64()
        );

        Ok(SettlementSummary { campaign_id: campaign.id.clone(), windows_settled, participants, state })
    }

    pub async fn settle_all_share_pools(&self) -> Result<SettlementReport, ServiceError> {
        self.settle_all_share_pools_at(Utc::now()).await
    }

    /// Settle every share-pool campaign. A failing campaign does not stop the others.
    pub async fn settle_all_share_pools_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SettlementReport, ServiceError> {
        let campaigns = self.db.list_share_pool_campaigns().await?;
        let mut report = SettlementReport::default();

        for campaign in campaigns {
            match self.settle_share_pool_at(&campaign, now).await {
                Ok(summary) => report.settled.push(summary),
                Err(e) => {
                    tracing::error!("Failed to settle campaign {}: {e:?}", campaign.id);
                    report.failed.push((campaign.id, e));
                }
            }
        }

        Ok(report)
    }

    pub async fn create_share_pool_campaign(
        &self,
        pool: Address,
        start_at: DateTime<Utc>,
    ) -> Result<Campaign, ServiceError> {
        if start_at.timestamp() < 0 {
            return Err(ServiceError::Config(format!(
                "campaign start {start_at} is before the unix epoch"
            )));
        }
        let campaign = self.db.create_share_pool_campaign(pool, start_at).await?;
        tracing::info!(
            "Created share-pool campaign {} for pool {pool:#x} starting {}",
            campaign.id,
            campaign.start_at
        );
        Ok(campaign)
    }

    pub async fn list_user_progress(
        &self,
        user: Address,
    ) -> Result<Vec<UserCampaignSummary>, ServiceError> {
        Ok(self.db.list_user_campaigns(user).await?)
    }

    pub async fn list_points(
        &self,
        campaign_id: Option<&str>,
    ) -> Result<Vec<UserPoints>, ServiceError> {
        Ok(self.db.list_points(campaign_id).await?)
    }

    async fn campaign_lock(&self, campaign_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.settle_locks.lock().await;
        locks.entry(campaign_id.to_string()).or_default().clone()
    }
}
