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

use anyhow::{bail, Context, Result};
use clap::Parser;
use swap_rewards::RewardsConfig;
use swap_rewards_indexer::{
    db::{RewardsDb, RewardsDbObj},
    rewards::RewardsService,
};

/// Recompute share-pool points from the swap ledger.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct SettleArgs {
    /// DB connection string.
    #[clap(long, env = "DATABASE_URL")]
    db: String,

    /// Settle only this campaign id (defaults to every share-pool campaign).
    #[clap(long)]
    campaign: Option<String>,

    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = SettleArgs::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    if args.log_json {
        tracing_subscriber::fmt().with_ansi(false).json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_ansi(false).with_env_filter(filter).init();
    }

    let db: RewardsDbObj = Arc::new(RewardsDb::new(&args.db).await?);
    let service = RewardsService::new(db.clone(), RewardsConfig::default());

    if let Some(id) = args.campaign {
        let campaign =
            db.get_campaign(&id).await?.with_context(|| format!("Unknown campaign {id}"))?;
        let summary = service.settle_share_pool(&campaign).await?;
        tracing::info!("{summary:?}");
        return Ok(());
    }

    let report = service.settle_all_share_pools().await?;
    for summary in &report.settled {
        tracing::info!("{summary:?}");
    }
    if !report.failed.is_empty() {
        bail!("{} campaigns failed to settle", report.failed.len());
    }
    Ok(())
}
