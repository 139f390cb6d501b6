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

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use swap_rewards::{CampaignKind, ProgressState, RewardsConfig, SenderVolume};
use swap_rewards_indexer::{
    db::{
        Campaign, DbError, RewardsDb, RewardsIndexerDb, SwapRecord, UserCampaignSummary,
        UserPoints, UserProgress,
    },
    rewards::{OnboardingOutcome, RewardsService},
};
use tokio::sync::{oneshot, Mutex};
use tracing_test::traced_test;

use crate::common::*;

#[tokio::test]
#[traced_test]
async fn test_below_threshold_is_pending_without_points() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let rewards = RewardsService::new(db.clone(), RewardsConfig::default());
    let user = Address::with_last_byte(1);

    db.upsert_swap(&swap_record(1, POOL, user, usdc(1000) - U256::from(1u64), U256::ZERO, utc(2024, 7, 2)))
        .await
        .unwrap();

    let outcome = rewards.check_onboarding(user).await.unwrap();
    assert_eq!(outcome, OnboardingOutcome::Pending { amount: Decimal::from(999_999_999u64) });

    let progress = db.get_progress(user, "onboarding").await.unwrap().unwrap();
    assert_eq!(progress.state, ProgressState::Pending);
    assert_eq!(progress.amount, Decimal::from(999_999_999u64));
    assert!(db.list_points(Some("onboarding")).await.unwrap().is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_exact_threshold_completes_once() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let rewards = RewardsService::new(db.clone(), RewardsConfig::default());
    let user = Address::with_last_byte(1);

    db.upsert_swap(&swap_record(1, POOL, user, usdc(1000) - U256::from(1u64), U256::ZERO, utc(2024, 7, 2)))
        .await
        .unwrap();
    rewards.check_onboarding(user).await.unwrap();

    // The last unit arrives in another pool; volume counts across pools.
    db.upsert_swap(&swap_record(2, OTHER_POOL, user, U256::from(1u64), U256::ZERO, utc(2024, 7, 3)))
        .await
        .unwrap();
    let outcome = rewards.check_onboarding(user).await.unwrap();
    assert_eq!(
        outcome,
        OnboardingOutcome::Completed { amount: Decimal::from(1_000_000_000u64), points: 100 }
    );

    db.upsert_swap(&swap_record(3, POOL, user, usdc(5000), U256::ZERO, utc(2024, 7, 4)))
        .await
        .unwrap();
    assert_eq!(rewards.check_onboarding(user).await.unwrap(), OnboardingOutcome::AlreadyCompleted);

    let points = db.list_points(Some("onboarding")).await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].user, user);
    assert_eq!(points[0].points, 100);

    // Progress keeps the amount at the moment of completion.
    let progress = db.get_progress(user, "onboarding").await.unwrap().unwrap();
    assert_eq!(progress.state, ProgressState::Completed);
    assert_eq!(progress.amount, Decimal::from(1_000_000_000u64));
}

#[tokio::test]
#[traced_test]
async fn test_user_without_swaps_is_pending_at_zero() {
    let test_db = TestDb::new().await;
    let rewards = RewardsService::new(test_db.get_db(), RewardsConfig::default());

    let outcome = rewards.check_onboarding(Address::with_last_byte(9)).await.unwrap();
    assert_eq!(outcome, OnboardingOutcome::Pending { amount: Decimal::ZERO });
}

#[tokio::test]
#[traced_test]
async fn test_custom_threshold_and_points() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let config = RewardsConfig { onboarding_threshold: 10, onboarding_points: 7, ..Default::default() };
    let rewards = RewardsService::new(db.clone(), config);
    let user = Address::with_last_byte(3);

    db.upsert_swap(&swap_record(1, POOL, user, usdc(10), U256::ZERO, utc(2024, 7, 2)))
        .await
        .unwrap();
    let outcome = rewards.check_onboarding(user).await.unwrap();
    assert!(matches!(outcome, OnboardingOutcome::Completed { points: 7, .. }));

    let summaries = rewards.list_user_progress(user).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].kind, CampaignKind::Onboarding);
    assert_eq!(summaries[0].state, ProgressState::Completed);
    assert_eq!(summaries[0].points, 7);
}

#[tokio::test]
#[traced_test]
async fn test_onboarding_cache_reads_campaign_once() {
    let test_db = TestDb::new().await;
    let rewards = RewardsService::new(test_db.get_db(), RewardsConfig::default());

    let first = rewards.onboarding_cache().get().await.unwrap();
    rewards.onboarding_cache().invalidate().await;
    let second = rewards.onboarding_cache().get().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.kind, CampaignKind::Onboarding);
}

/// Pauses the first lifetime-volume read until the test releases it.
struct PausedVolumeDb {
    inner: Arc<RewardsDb>,
    pause: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
}

#[async_trait]
impl RewardsIndexerDb for PausedVolumeDb {
    async fn get_onboarding_campaign(&self) -> Result<Option<Campaign>, DbError> {
        self.inner.get_onboarding_campaign().await
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, DbError> {
        self.inner.get_campaign(id).await
    }

    async fn list_share_pool_campaigns(&self) -> Result<Vec<Campaign>, DbError> {
        self.inner.list_share_pool_campaigns().await
    }

    async fn create_share_pool_campaign(
        &self,
        pool: Address,
        start_at: DateTime<Utc>,
    ) -> Result<Campaign, DbError> {
        self.inner.create_share_pool_campaign(pool, start_at).await
    }

    async fn upsert_swap(&self, swap: &SwapRecord) -> Result<(), DbError> {
        self.inner.upsert_swap(swap).await
    }

    async fn get_swap(
        &self,
        block_number: u64,
        pool: Address,
    ) -> Result<Option<SwapRecord>, DbError> {
        self.inner.get_swap(block_number, pool).await
    }

    async fn total_amount0_in_by_sender(&self, sender: Address) -> Result<U256, DbError> {
        let total = self.inner.total_amount0_in_by_sender(sender).await?;
        let pause = self.pause.lock().await.take();
        if let Some((reached, release)) = pause {
            reached.send(()).unwrap();
            release.await.unwrap();
        }
        Ok(total)
    }

    async fn window_volumes(
        &self,
        pool: Address,
        onboarding_campaign_id: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<SenderVolume>, DbError> {
        self.inner.window_volumes(pool, onboarding_campaign_id, from, to).await
    }

    async fn get_progress(
        &self,
        user: Address,
        campaign_id: &str,
    ) -> Result<Option<UserProgress>, DbError> {
        self.inner.get_progress(user, campaign_id).await
    }

    async fn record_rewards(
        &self,
        progress: Vec<UserProgress>,
        points: Vec<UserPoints>,
    ) -> Result<(), DbError> {
        self.inner.record_rewards(progress, points).await
    }

    async fn record_onboarding(
        &self,
        progress: &UserProgress,
        points: Option<&UserPoints>,
    ) -> Result<bool, DbError> {
        self.inner.record_onboarding(progress, points).await
    }

    async fn list_user_campaigns(
        &self,
        user: Address,
    ) -> Result<Vec<UserCampaignSummary>, DbError> {
        self.inner.list_user_campaigns(user).await
    }

    async fn list_points(&self, campaign_id: Option<&str>) -> Result<Vec<UserPoints>, DbError> {
        self.inner.list_points(campaign_id).await
    }

    async fn get_pool_cursor(&self, pool: Address) -> Result<Option<u64>, DbError> {
        self.inner.get_pool_cursor(pool).await
    }

    async fn set_pool_cursor(&self, pool: Address, block: u64) -> Result<(), DbError> {
        self.inner.set_pool_cursor(pool, block).await
    }
}

#[tokio::test]
#[traced_test]
async fn test_stale_check_keeps_completed_state() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let user = Address::with_last_byte(1);

    db.upsert_swap(&swap_record(1, POOL, user, usdc(999), U256::ZERO, utc(2024, 7, 2)))
        .await
        .unwrap();

    let (reached_tx, reached_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    let paused =
        PausedVolumeDb { inner: test_db.db.clone(), pause: Mutex::new(Some((reached_tx, release_rx))) };
    let stale = Arc::new(RewardsService::new(Arc::new(paused), RewardsConfig::default()));
    let fresh = RewardsService::new(db.clone(), RewardsConfig::default());

    // The stale check reads 999 USDC and stops before writing.
    let stale_check = tokio::spawn({
        let stale = stale.clone();
        async move { stale.check_onboarding(user).await }
    });
    reached_rx.await.unwrap();

    // The crossing swap lands in another pool and is checked to completion.
    db.upsert_swap(&swap_record(2, OTHER_POOL, user, usdc(1), U256::ZERO, utc(2024, 7, 3)))
        .await
        .unwrap();
    let outcome = fresh.check_onboarding(user).await.unwrap();
    assert_eq!(
        outcome,
        OnboardingOutcome::Completed { amount: Decimal::from(1_000_000_000u64), points: 100 }
    );

    release_tx.send(()).unwrap();
    let outcome = stale_check.await.unwrap().unwrap();
    assert_eq!(outcome, OnboardingOutcome::AlreadyCompleted);

    let progress = db.get_progress(user, "onboarding").await.unwrap().unwrap();
    assert_eq!(progress.state, ProgressState::Completed);
    assert_eq!(progress.amount, Decimal::from(1_000_000_000u64));

    let points = db.list_points(Some("onboarding")).await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].points, 100);
}
