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

use std::{sync::Arc, time::Duration};

use alloy::primitives::{Address, U256};
use chrono::{DateTime, SubsecRound, Utc};
use swap_rewards::{ChainError, ChainSourceObj, RewardsConfig};
use swap_rewards_indexer::{
    db::{Campaign, RewardsDbObj},
    ingest::{
        IngestionConfig, IngestionOutcome, IngestionService, IngestionSupervisor, PoolOutcome,
        RetryPolicy, TailMode,
    },
    rewards::RewardsService,
    ServiceError,
};
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

use crate::common::*;

const DAY: u64 = 24 * 60 * 60;

fn test_config(tail_mode: TailMode) -> IngestionConfig {
    IngestionConfig {
        tail_mode,
        batch_size: 10,
        poll_interval: Duration::from_millis(1),
        advance_idle_cursor: true,
        retry: RetryPolicy {
            delay: Duration::from_millis(1),
            backoff_multiplier: 1.0,
            max_delay: Duration::from_millis(1),
            max_retries: Some(1),
            reset_after: None,
        },
    }
}

fn ingestion_service(
    chain: Arc<MockChain>,
    db: RewardsDbObj,
    config: IngestionConfig,
    cancel: CancellationToken,
) -> IngestionService {
    let rewards = Arc::new(RewardsService::new(db.clone(), RewardsConfig::default()));
    IngestionService::new(chain as ChainSourceObj, db, rewards, config, cancel)
}

/// One block per day starting at `first`.
fn daily_blocks(first: DateTime<Utc>, count: u64) -> Vec<u64> {
    let first = first.timestamp() as u64;
    (0..count).map(|i| first + i * DAY).collect()
}

/// Blocks 0..=9 around a campaign: block 2 sits at the start and block 8 at the end.
fn blocks_around(campaign: &Campaign) -> Vec<u64> {
    let s = campaign.start_at.timestamp() as u64;
    let e = campaign.end_at().timestamp() as u64;
    vec![s - 200, s - 100, s, s + 100, s + 200, s + 300, s + 400, s + 500, e, e + 100]
}

async fn running_campaign(db: &RewardsDbObj) -> Campaign {
    let start = Utc::now().trunc_subsecs(0) - chrono::Duration::days(1);
    db.create_share_pool_campaign(POOL, start).await.unwrap()
}

#[tokio::test]
#[traced_test]
async fn test_sync_history_batches_range() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let sender = Address::with_last_byte(1);

    let mut removed = swap_log(POOL, 7, sender, usdc(3));
    removed.removed = true;
    let chain = Arc::new(MockChain::new(daily_blocks(utc(2024, 7, 1), 40)).with_logs(vec![
        swap_log(POOL, 5, sender, usdc(2)),
        swap_log(OTHER_POOL, 6, sender, usdc(9)),
        removed,
        malformed_swap_log(POOL, 12),
    ]));
    let service = ingestion_service(
        chain.clone(),
        db.clone(),
        test_config(TailMode::Poll),
        CancellationToken::new(),
    );

    let stats = service.sync_history(POOL, 0, 25, u64::MAX).await.unwrap();
    assert_eq!(chain.queries(), vec![(0, 9), (10, 19), (20, 24)]);
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.stored, 1);
    assert_eq!(stats.skipped, 2);
    assert!(!stats.reached_end);

    let stored = db.get_swap(5, POOL).await.unwrap().unwrap();
    assert_eq!(stored.sender, sender);
    assert_eq!(stored.amount0_in, usdc(2));
    assert_eq!(stored.amount1_out, U256::from(1u64));
    assert_eq!(stored.swapped_at, (utc(2024, 7, 1).timestamp() as u64) + 5 * DAY);
    assert!(db.get_swap(6, OTHER_POOL).await.unwrap().is_none());
    assert!(db.get_swap(7, POOL).await.unwrap().is_none());
    assert_eq!(db.get_pool_cursor(POOL).await.unwrap(), Some(25));

    // Ingested senders are evaluated for onboarding right away.
    assert!(db.get_progress(sender, "onboarding").await.unwrap().is_some());

    let stats = service.sync_history(POOL, 25, 25, u64::MAX).await.unwrap();
    assert_eq!(stats.batches, 0);
    assert_eq!(chain.queries().len(), 3);
}

#[tokio::test]
#[traced_test]
async fn test_sync_history_stops_at_campaign_end() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let sender = Address::with_last_byte(1);
    let first = utc(2024, 7, 1);

    let chain = Arc::new(MockChain::new(daily_blocks(first, 40)).with_logs(vec![
        swap_log(POOL, 3, sender, usdc(1)),
        swap_log(POOL, 4, sender, usdc(1)),
        swap_log(POOL, 15, sender, usdc(1)),
    ]));
    let service = ingestion_service(
        chain.clone(),
        db.clone(),
        test_config(TailMode::Poll),
        CancellationToken::new(),
    );

    let end_ts = first.timestamp() as u64 + 4 * DAY;
    let stats = service.sync_history(POOL, 0, 40, end_ts).await.unwrap();
    assert!(stats.reached_end);
    assert_eq!(stats.stored, 1);
    assert_eq!(chain.queries(), vec![(0, 9)]);
    assert!(db.get_swap(3, POOL).await.unwrap().is_some());
    assert!(db.get_swap(4, POOL).await.unwrap().is_none());
}

#[tokio::test]
#[traced_test]
async fn test_ended_campaign_syncs_history_only() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let sender = Address::with_last_byte(1);
    let late = Address::with_last_byte(2);
    let campaign = db.create_share_pool_campaign(POOL, utc(2024, 7, 1)).await.unwrap();

    // Block 3 is 2024-07-01 and block 31 is 2024-07-29, the campaign end.
    let chain = Arc::new(MockChain::new(daily_blocks(utc(2024, 6, 28), 40)).with_logs(vec![
        swap_log(POOL, 2, sender, usdc(700)),
        swap_log(POOL, 5, sender, usdc(2000)),
        malformed_swap_log(POOL, 10),
        swap_log(POOL, 31, late, usdc(3000)),
    ]));
    let service = ingestion_service(
        chain.clone(),
        db.clone(),
        test_config(TailMode::Poll),
        CancellationToken::new(),
    );

    let outcome = service.run_ingestion(&campaign).await.unwrap();
    assert_eq!(outcome, IngestionOutcome::Finished);
    assert_eq!(chain.queries(), vec![(3, 12), (13, 22), (23, 30)]);
    assert!(db.get_swap(2, POOL).await.unwrap().is_none());
    assert!(db.get_swap(5, POOL).await.unwrap().is_some());
    assert!(db.get_swap(31, POOL).await.unwrap().is_none());
    assert_eq!(db.get_pool_cursor(POOL).await.unwrap(), Some(31));

    // The settlement pass after the sync has already allocated the pool.
    let points = db.list_points(Some(&campaign.id)).await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].user, sender);
    assert_eq!(points[0].points, 10000);

    // A restart resumes from the cursor and finds nothing left to scan.
    let outcome = service.run_ingestion(&campaign).await.unwrap();
    assert_eq!(outcome, IngestionOutcome::Finished);
    assert_eq!(chain.queries().len(), 3);
}

#[tokio::test]
#[traced_test]
async fn test_poll_tail_runs_until_campaign_end() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let campaign = running_campaign(&db).await;
    let sender1 = Address::with_last_byte(1);
    let sender2 = Address::with_last_byte(2);

    // The head starts at block 4 and moves one block per lookup.
    let chain = Arc::new(MockChain::new(blocks_around(&campaign)).with_head(4, true).with_logs(
        vec![
            swap_log(POOL, 3, sender1, usdc(1500)),
            swap_log(POOL, 6, sender2, usdc(200)),
            swap_log(POOL, 8, sender1, usdc(1)),
        ],
    ));
    let service = ingestion_service(
        chain.clone(),
        db.clone(),
        test_config(TailMode::Poll),
        CancellationToken::new(),
    );

    let outcome = service.run_ingestion(&campaign).await.unwrap();
    assert_eq!(outcome, IngestionOutcome::Finished);
    assert!(db.get_swap(3, POOL).await.unwrap().is_some());
    assert!(db.get_swap(6, POOL).await.unwrap().is_some());
    assert!(db.get_swap(8, POOL).await.unwrap().is_none());

    // Every block from the campaign start up to the end block was queried exactly once.
    let mut covered: Vec<u64> = chain.queries().iter().flat_map(|(from, to)| *from..=*to).collect();
    covered.sort();
    assert_eq!(covered, (2..=8).collect::<Vec<_>>());
}

#[tokio::test]
#[traced_test]
async fn test_poll_tail_idle_cursor_policy() {
    for advance_idle_cursor in [true, false] {
        let test_db = TestDb::new().await;
        let db = test_db.get_db();
        let campaign = running_campaign(&db).await;
        let s = campaign.start_at.timestamp() as u64;
        let e = campaign.end_at().timestamp() as u64;

        let chain =
            Arc::new(MockChain::new(vec![s, s + 1, s + 2, s + 3, s + 4, e]).with_head(2, true));
        let config = IngestionConfig { advance_idle_cursor, ..test_config(TailMode::Poll) };
        let service = ingestion_service(chain.clone(), db.clone(), config, CancellationToken::new());

        let outcome = service.tail(POOL, 1, e).await.unwrap();
        assert_eq!(outcome, IngestionOutcome::Finished);
        if advance_idle_cursor {
            assert_eq!(chain.queries(), vec![(1, 2), (3, 3), (4, 4), (5, 5)]);
            assert_eq!(db.get_pool_cursor(POOL).await.unwrap(), Some(6));
        } else {
            assert_eq!(chain.queries(), vec![(1, 2), (1, 3), (1, 4), (1, 5)]);
            assert_eq!(db.get_pool_cursor(POOL).await.unwrap(), None);
        }
    }
}

#[tokio::test]
#[traced_test]
async fn test_poll_tail_cancellation() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let campaign = running_campaign(&db).await;
    let e = campaign.end_at().timestamp() as u64;

    let chain = Arc::new(MockChain::new(blocks_around(&campaign)).with_head(4, false));
    let cancel = CancellationToken::new();
    let config =
        IngestionConfig { poll_interval: Duration::from_secs(60), ..test_config(TailMode::Poll) };
    let service = ingestion_service(chain, db, config, cancel.clone());

    cancel.cancel();
    let outcome = service.tail(POOL, 2, e).await.unwrap();
    assert_eq!(outcome, IngestionOutcome::Cancelled);
}

#[tokio::test]
#[traced_test]
async fn test_push_tail_backfills_gap_and_stops_past_end() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let campaign = running_campaign(&db).await;
    let e = campaign.end_at().timestamp() as u64;
    let sender = Address::with_last_byte(1);

    let chain = Arc::new(
        MockChain::new(blocks_around(&campaign))
            .with_head(5, false)
            .with_logs(vec![swap_log(POOL, 4, sender, usdc(10))])
            .with_subscription(vec![
                swap_log(POOL, 6, sender, usdc(20)),
                swap_log(POOL, 8, sender, usdc(30)),
            ]),
    );
    let service = ingestion_service(
        chain.clone(),
        db.clone(),
        test_config(TailMode::Push),
        CancellationToken::new(),
    );

    let outcome = service.tail(POOL, 3, e).await.unwrap();
    assert_eq!(outcome, IngestionOutcome::Finished);
    assert_eq!(chain.queries(), vec![(3, 5)]);
    assert!(db.get_swap(4, POOL).await.unwrap().is_some());
    assert!(db.get_swap(6, POOL).await.unwrap().is_some());
    assert!(db.get_swap(8, POOL).await.unwrap().is_none());
    assert_eq!(db.get_pool_cursor(POOL).await.unwrap(), Some(7));
    assert_eq!(db.total_amount0_in_by_sender(sender).await.unwrap(), usdc(30));
}

#[tokio::test]
#[traced_test]
async fn test_push_tail_reports_closed_subscription() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let campaign = running_campaign(&db).await;
    let e = campaign.end_at().timestamp() as u64;

    let chain = Arc::new(
        MockChain::new(blocks_around(&campaign)).with_head(5, false).with_subscription(vec![]),
    );
    let service =
        ingestion_service(chain, db, test_config(TailMode::Push), CancellationToken::new());

    let err = service.tail(POOL, 6, e).await.unwrap_err();
    assert!(matches!(err, ServiceError::ChainUnavailable(ChainError::SubscriptionClosed(pool)) if pool == POOL));
    assert!(err.is_recoverable());
}

#[tokio::test]
#[traced_test]
async fn test_supervisor_isolates_failing_pool() {
    let test_db = TestDb::new().await;
    let db = test_db.get_db();
    let healthy = db.create_share_pool_campaign(POOL, utc(2024, 7, 1)).await.unwrap();
    let failing = db.create_share_pool_campaign(OTHER_POOL, utc(2024, 7, 1)).await.unwrap();
    let sender = Address::with_last_byte(1);

    let chain = Arc::new(
        MockChain::new(daily_blocks(utc(2024, 6, 28), 40))
            .with_logs(vec![swap_log(POOL, 5, sender, usdc(2000))])
            .with_failing_pool(OTHER_POOL),
    );
    let service = Arc::new(ingestion_service(
        chain,
        db.clone(),
        test_config(TailMode::Poll),
        CancellationToken::new(),
    ));

    let reports = IngestionSupervisor::new(service).run(db.list_share_pool_campaigns().await.unwrap()).await;
    assert_eq!(reports.len(), 2);

    let report = reports.iter().find(|r| r.campaign_id == healthy.id).unwrap();
    assert!(matches!(report.outcome, PoolOutcome::Finished));
    assert_eq!(report.pool, Some(POOL));

    let report = reports.iter().find(|r| r.campaign_id == failing.id).unwrap();
    assert!(matches!(
        report.outcome,
        PoolOutcome::Degraded { retries: 1, error: ServiceError::ChainUnavailable(_) }
    ));

    assert!(db.get_swap(5, POOL).await.unwrap().is_some());
}
