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

use anyhow::{bail, Context, Result};
use clap::Parser;
use swap_rewards::{RewardsConfig, LOG_QUERY_BATCH_SIZE};
use swap_rewards_indexer::{
    db::{RewardsDb, RewardsDbObj},
    http_chain,
    ingest::{
        IngestionConfig, IngestionService, IngestionSupervisor, PoolOutcome, RetryPolicy,
        TailMode,
    },
    rewards::RewardsService,
    ws_chain,
};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Arguments for the swap indexer.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct SwapIndexerArgs {
    /// URL of the Ethereum HTTP RPC endpoint, used in poll mode.
    #[clap(short, long, env)]
    rpc_url: Option<Url>,

    /// URL of the Ethereum websocket RPC endpoint, used in push mode.
    #[clap(long, env)]
    ws_url: Option<Url>,

    /// DB connection string.
    #[clap(long, env = "DATABASE_URL")]
    db: String,

    /// How to follow new swaps once history is synced.
    #[clap(long, env = "SUBSCRIBE_MODE", value_enum, default_value = "poll")]
    tail_mode: TailMode,

    /// Only ingest this campaign id (defaults to every share-pool campaign).
    #[clap(long)]
    campaign: Option<String>,

    /// Blocks per historical log query.
    #[clap(long, default_value_t = LOG_QUERY_BATCH_SIZE)]
    batch_size: u64,

    /// Milliseconds between polls in poll mode.
    #[clap(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Move past polled blocks even when they contained no swaps.
    #[clap(long, env, default_value_t = true, action = clap::ArgAction::Set)]
    advance_idle_cursor: bool,

    /// Number of consecutive chain failures tolerated per pool.
    #[clap(long, default_value = "10")]
    retries: usize,

    /// Initial delay in seconds before restarting a failed pool.
    #[clap(long, default_value = "1")]
    retry_delay: u64,

    /// Upper bound in seconds on the restart delay.
    #[clap(long, default_value = "60")]
    max_retry_delay: u64,

    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = SwapIndexerArgs::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    if args.log_json {
        tracing_subscriber::fmt().with_ansi(false).json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_ansi(false).with_env_filter(filter).init();
    }

    let chain = match args.tail_mode {
        TailMode::Push => {
            let ws_url = args.ws_url.context("--ws-url is required in push mode")?;
            ws_chain(ws_url).await?
        }
        TailMode::Poll => http_chain(args.rpc_url.context("--rpc-url is required in poll mode")?),
    };

    let db: RewardsDbObj = Arc::new(RewardsDb::new(&args.db).await?);
    let rewards = Arc::new(RewardsService::new(db.clone(), RewardsConfig::default()));

    let config = IngestionConfig {
        tail_mode: args.tail_mode,
        batch_size: args.batch_size,
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        advance_idle_cursor: args.advance_idle_cursor,
        retry: RetryPolicy {
            delay: Duration::from_secs(args.retry_delay),
            max_delay: Duration::from_secs(args.max_retry_delay),
            max_retries: Some(args.retries),
            ..RetryPolicy::default()
        },
    };

    let mut campaigns = db.list_share_pool_campaigns().await?;
    if let Some(id) = &args.campaign {
        campaigns.retain(|campaign| &campaign.id == id);
        if campaigns.is_empty() {
            bail!("No share-pool campaign with id {id}");
        }
    }
    if campaigns.is_empty() {
        tracing::warn!("No share-pool campaigns configured, nothing to ingest");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested, stopping ingestion");
            shutdown.cancel();
        }
    });

    let service = Arc::new(IngestionService::new(chain, db, rewards, config, cancel));
    tracing::info!("Starting ingestion for {} campaigns", campaigns.len());
    let reports = IngestionSupervisor::new(service).run(campaigns).await;

    let unhealthy = reports
        .iter()
        .filter(|report| {
            matches!(report.outcome, PoolOutcome::Degraded { .. } | PoolOutcome::Failed(_))
        })
        .count();
    if unhealthy > 0 {
        bail!("{unhealthy} of {} pools stopped with errors", reports.len());
    }

    tracing::info!("Ingestion completed successfully");
    Ok(())
}
