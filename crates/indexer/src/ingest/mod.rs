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

//! Swap ingestion: historical backfill followed by a live tail until the campaign ends.

mod supervisor;

use std::{collections::HashMap, sync::Arc, time::Duration};

use alloy::{primitives::Address, rpc::types::Log};
use chrono::Utc;
use futures_util::StreamExt;
use swap_rewards::{
    decode_swap_log, find_block_at_or_after, BlockBatches, ChainError, ChainSourceObj,
    LOG_QUERY_BATCH_SIZE,
};
use tokio_util::sync::CancellationToken;

pub use supervisor::{
    IngestionSupervisor, PoolOutcome, PoolReport, RetryPolicy, RetryRes, RetryTask, Supervisor,
    SupervisorErr,
};

use crate::{
    db::{Campaign, RewardsDbObj, SwapRecord},
    error::ServiceError,
    rewards::RewardsService,
};

/// Upper bound on cached block timestamps per sync or tail.
const TIMESTAMP_CACHE_LIMIT: usize = 4096;

/// How new swaps are observed once the historical range is covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TailMode {
    /// Log subscription over a pubsub transport.
    Push,
    /// Periodic `eth_getLogs` over the blocks produced since the last poll.
    Poll,
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub tail_mode: TailMode,
    /// Blocks per historical `eth_getLogs` query.
    pub batch_size: u64,
    pub poll_interval: Duration,
    /// Advance the poll cursor past the polled range even when it held no swaps.
    pub advance_idle_cursor: bool,
    pub retry: RetryPolicy,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            tail_mode: TailMode::Poll,
            batch_size: LOG_QUERY_BATCH_SIZE,
            poll_interval: Duration::from_secs(1),
            advance_idle_cursor: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// How a pool's ingestion stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// The campaign end was reached.
    Finished,
    Cancelled,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub batches: u64,
    pub stored: u64,
    pub skipped: u64,
    /// A log at or past the campaign end was seen.
    pub reached_end: bool,
}

enum LogOutcome {
    Stored,
    PastEnd,
    Removed,
}

/// Moves swaps of one pool from the chain into the ledger.
pub struct IngestionService {
    chain: ChainSourceObj,
    db: RewardsDbObj,
    rewards: Arc<RewardsService>,
    config: IngestionConfig,
    cancel: CancellationToken,
}

impl IngestionService {
    pub fn new(
        chain: ChainSourceObj,
        db: RewardsDbObj,
        rewards: Arc<RewardsService>,
        config: IngestionConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self { chain, db, rewards, config, cancel }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Backfill the campaign's pool from its start block, then tail it until the campaign ends.
    ///
    /// Returns as soon as the campaign end is observed or the service is cancelled.
    pub async fn run_ingestion(&self, campaign: &Campaign) -> Result<IngestionOutcome, ServiceError> {
        let pool = campaign.pool_address.ok_or_else(|| {
            ServiceError::Config(format!("campaign {} has no pool address", campaign.id))
        })?;
        let end_at = campaign.end_at();
        let start_ts = campaign.start_at.timestamp().max(0) as u64;
        let end_ts = end_at.timestamp().max(0) as u64;

        let mut from = find_block_at_or_after(self.chain.as_ref(), start_ts).await?;
        if let Some(cursor) = self.db.get_pool_cursor(pool).await? {
            from = from.max(cursor);
        }
        let ended = Utc::now() >= end_at;
        let to = if ended {
            find_block_at_or_after(self.chain.as_ref(), end_ts).await?
        } else {
            self.chain.latest_block().await?.number + 1
        };

        tracing::info!("Syncing pool {pool:#x} for campaign {} blocks [{from}, {to})", campaign.id);
        let start_time = std::time::Instant::now();
        let stats = self.sync_history(pool, from, to, end_ts).await?;
        tracing::info!(
            "Historical sync of pool {pool:#x} done in {:.2}s: {} batches, {} stored, {} skipped",
            start_time.elapsed().as_secs_f64(),
            stats.batches,
            stats.stored,
            stats.skipped
        );

        if self.cancel.is_cancelled() {
            return Ok(IngestionOutcome::Cancelled);
        }

        match self.rewards.settle_all_share_pools().await {
            Ok(report) => {
                for (campaign_id, err) in &report.failed {
                    tracing::warn!("Settlement of campaign {campaign_id} failed: {err}");
                }
            }
            Err(e) => tracing::warn!("Settlement pass after sync failed: {e:?}"),
        }

        if ended || stats.reached_end {
            tracing::info!("Campaign {} has ended, not tailing pool {pool:#x}", campaign.id);
            return Ok(IngestionOutcome::Finished);
        }

        self.tail(pool, from.max(to), end_ts).await
    }

    /// Ingest every swap of `pool` in the half-open block range `[from, to)`.
    ///
    /// Batches run in increasing order. A failed log query aborts the sync; a log that
    /// fails to decode or persist is skipped.
    pub async fn sync_history(
        &self,
        pool: Address,
        from: u64,
        to: u64,
        end_ts: u64,
    ) -> Result<SyncStats, ServiceError> {
        let mut stats = SyncStats::default();
        let mut timestamps = HashMap::new();

        for (batch_start, batch_end) in BlockBatches::new(from, to, self.config.batch_size) {
            if self.cancel.is_cancelled() {
                tracing::info!("Historical sync of pool {pool:#x} cancelled at block {batch_start}");
                break;
            }

            let logs = self.chain.swap_logs(pool, batch_start, batch_end).await?;
            tracing::debug!(
                "Pool {pool:#x} blocks {batch_start}..={batch_end}: {} swap logs",
                logs.len()
            );
            stats.batches += 1;
            self.ingest_logs(&logs, end_ts, &mut timestamps, &mut stats).await?;
            self.save_cursor(pool, batch_end + 1).await;

            if stats.reached_end {
                break;
            }
        }

        Ok(stats)
    }

    /// Follow new swaps of `pool` from block `from` in the configured mode.
    pub async fn tail(
        &self,
        pool: Address,
        from: u64,
        end_ts: u64,
    ) -> Result<IngestionOutcome, ServiceError> {
        match self.config.tail_mode {
            TailMode::Push => self.push_tail(pool, from, end_ts).await,
            TailMode::Poll => self.poll_tail(pool, from, end_ts).await,
        }
    }

    async fn push_tail(
        &self,
        pool: Address,
        from: u64,
        end_ts: u64,
    ) -> Result<IngestionOutcome, ServiceError> {
        let mut stream = self.chain.subscribe_swaps(pool).await?;

        // Blocks produced between the historical range and the subscription.
        let head = self.chain.latest_block().await?;
        let gap = self.sync_history(pool, from, head.number + 1, end_ts).await?;
        if gap.reached_end || head.timestamp >= end_ts {
            tracing::info!("Campaign for pool {pool:#x} ended at block {}", head.number);
            return Ok(IngestionOutcome::Finished);
        }

        tracing::info!("Subscribed to swaps of pool {pool:#x} from block {}", head.number + 1);
        let mut timestamps = HashMap::new();
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(IngestionOutcome::Cancelled),
                next = stream.next() => next,
            };
            let Some(log) = next else {
                return Err(ChainError::SubscriptionClosed(pool).into());
            };

            match self.process_log(&log, end_ts, &mut timestamps).await {
                Ok(LogOutcome::Stored) => {
                    if let Some(block) = log.block_number {
                        self.save_cursor(pool, block + 1).await;
                    }
                }
                Ok(LogOutcome::PastEnd) => {
                    tracing::info!(
                        "Campaign for pool {pool:#x} ended at block {:?}",
                        log.block_number
                    );
                    return Ok(IngestionOutcome::Finished);
                }
                Ok(LogOutcome::Removed) => {
                    tracing::debug!("Ignoring removed log in block {:?}", log.block_number);
                }
                Err(ServiceError::ChainUnavailable(e)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("Skipping swap log in block {:?}: {e}", log.block_number);
                }
            }
        }
    }

    async fn poll_tail(
        &self,
        pool: Address,
        from: u64,
        end_ts: u64,
    ) -> Result<IngestionOutcome, ServiceError> {
        tracing::info!(
            "Polling swaps of pool {pool:#x} from block {from} every {:?}",
            self.config.poll_interval
        );
        let mut cursor = from;
        loop {
            let head = self.chain.latest_block().await?;
            if head.number >= cursor {
                let logs = self.chain.swap_logs(pool, cursor, head.number).await?;
                let mut stats = SyncStats::default();
                let mut timestamps = HashMap::new();
                self.ingest_logs(&logs, end_ts, &mut timestamps, &mut stats).await?;

                if stats.reached_end {
                    tracing::info!("Campaign for pool {pool:#x} ended before block {}", head.number);
                    return Ok(IngestionOutcome::Finished);
                }
                if !logs.is_empty() || self.config.advance_idle_cursor {
                    cursor = head.number + 1;
                    self.save_cursor(pool, cursor).await;
                }
            }

            if head.timestamp >= end_ts {
                tracing::info!("Campaign for pool {pool:#x} ended at block {}", head.number);
                return Ok(IngestionOutcome::Finished);
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(IngestionOutcome::Cancelled),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    async fn ingest_logs(
        &self,
        logs: &[Log],
        end_ts: u64,
        timestamps: &mut HashMap<u64, u64>,
        stats: &mut SyncStats,
    ) -> Result<(), ServiceError> {
        for log in logs {
            match self.process_log(log, end_ts, timestamps).await {
                Ok(LogOutcome::Stored) => stats.stored += 1,
                Ok(LogOutcome::PastEnd) => {
                    // Logs are ordered by block, so everything after this one is past the end too.
                    stats.reached_end = true;
                    break;
                }
                Ok(LogOutcome::Removed) => stats.skipped += 1,
                Err(ServiceError::ChainUnavailable(e)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("Skipping swap log in block {:?}: {e}", log.block_number);
                    stats.skipped += 1;
                }
            }
        }
        Ok(())
    }

    async fn process_log(
        &self,
        log: &Log,
        end_ts: u64,
        timestamps: &mut HashMap<u64, u64>,
    ) -> Result<LogOutcome, ServiceError> {
        if log.removed {
            return Ok(LogOutcome::Removed);
        }

        let event = decode_swap_log(log)?;
        let swapped_at = match event.block_timestamp {
            Some(timestamp) => timestamp,
            None => self.block_timestamp(event.block_number, timestamps).await?,
        };
        if swapped_at >= end_ts {
            return Ok(LogOutcome::PastEnd);
        }

        self.db.upsert_swap(&SwapRecord::from_event(&event, swapped_at)).await?;

        if let Err(e) = self.rewards.check_onboarding(event.sender).await {
            tracing::warn!("Onboarding check for {:#x} failed: {e}", event.sender);
        }
        Ok(LogOutcome::Stored)
    }

    async fn block_timestamp(
        &self,
        number: u64,
        timestamps: &mut HashMap<u64, u64>,
    ) -> Result<u64, ChainError> {
        if let Some(timestamp) = timestamps.get(&number) {
            return Ok(*timestamp);
        }
        let timestamp = self.chain.block(number).await?.timestamp;
        if timestamps.len() >= TIMESTAMP_CACHE_LIMIT {
            timestamps.clear();
        }
        timestamps.insert(number, timestamp);
        Ok(timestamp)
    }

    async fn save_cursor(&self, pool: Address, block: u64) {
        if let Err(e) = self.db.set_pool_cursor(pool, block).await {
            tracing::warn!("Failed to store cursor {block} for pool {pool:#x}: {e}");
        }
    }
}
