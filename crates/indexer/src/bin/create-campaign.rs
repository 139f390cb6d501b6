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

use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use swap_rewards::RewardsConfig;
use swap_rewards_indexer::{
    db::{RewardsDb, RewardsDbObj},
    rewards::RewardsService,
};

/// Register a share-pool campaign for a pool.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CreateCampaignArgs {
    /// DB connection string.
    #[clap(long, env = "DATABASE_URL")]
    db: String,

    /// Address of the pool whose swaps earn points.
    #[clap(long)]
    pool: Address,

    /// Campaign start, as RFC 3339 or YYYY-MM-DD (midnight UTC).
    #[clap(long, value_parser = parse_start)]
    start: DateTime<Utc>,
}

fn parse_start(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid start {s}: {e}"))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CreateCampaignArgs::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_ansi(false).with_env_filter(filter).init();

    let db: RewardsDbObj = Arc::new(RewardsDb::new(&args.db).await?);
    let service = RewardsService::new(db, RewardsConfig::default());

    let campaign = service.create_share_pool_campaign(args.pool, args.start).await?;
    println!("{}", campaign.id);
    Ok(())
}
