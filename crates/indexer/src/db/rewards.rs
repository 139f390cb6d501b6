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

use std::{collections::BTreeMap, str::FromStr, sync::Arc};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use sqlx::{
    any::{AnyPoolOptions, AnyRow},
    AnyPool, Row,
};
use swap_rewards::{campaign_end, CampaignKind, ProgressState, SenderVolume, SwapEvent};

use super::DbError;

pub type RewardsDbObj = Arc<dyn RewardsIndexerDb + Send + Sync>;

/// Convert a U256 to a zero-padded string for proper database sorting
/// U256 max value has 78 decimal digits (2^256 ≈ 1.15 * 10^77)
fn pad_u256(value: U256) -> String {
    format!("{:0>78}", value)
}

/// Convert a zero-padded string back to U256
fn unpad_u256(s: &str) -> Result<U256, DbError> {
    U256::from_str(s.trim_start_matches('0')).or_else(|_| {
        // If trimming all zeros, the value is 0
        if s.chars().all(|c| c == '0') {
            Ok(U256::ZERO)
        } else {
            Err(DbError::BadValue(format!("Invalid U256 string: {}", s)))
        }
    })
}

fn parse_address(s: &str) -> Result<Address, DbError> {
    Address::from_str(s).map_err(|e| DbError::BadValue(format!("Invalid address {s}: {e}")))
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| DbError::BadValue(format!("Invalid timestamp: {secs}")))
}

fn cursor_key(pool: Address) -> String {
    format!("cursor:{:#x}", pool)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    pub id: String,
    pub kind: CampaignKind,
    /// Set for share-pool campaigns only.
    pub pool_address: Option<Address>,
    pub start_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Instant after which no more swaps are ingested for this campaign.
    pub fn end_at(&self) -> DateTime<Utc> {
        campaign_end(self.start_at)
    }
}

/// Ledger row for one swap, keyed by `(block_number, pool_address)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRecord {
    pub block_number: u64,
    pub pool_address: Address,
    pub sender: Address,
    pub receiver: Address,
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
    /// Block timestamp in unix seconds.
    pub swapped_at: u64,
}

impl SwapRecord {
    pub fn from_event(event: &SwapEvent, swapped_at: u64) -> Self {
        Self {
            block_number: event.block_number,
            pool_address: event.pool,
            sender: event.sender,
            receiver: event.to,
            amount0_in: event.amount0_in,
            amount1_in: event.amount1_in,
            amount0_out: event.amount0_out,
            amount1_out: event.amount1_out,
            swapped_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProgress {
    pub user: Address,
    pub campaign_id: String,
    pub state: ProgressState,
    /// Onboarding: cumulative `amount0In` in smallest units. Share pool: cumulative USD volume.
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPoints {
    pub user: Address,
    pub campaign_id: String,
    pub points: u64,
}

/// A user's standing in one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCampaignSummary {
    pub campaign_id: String,
    pub kind: CampaignKind,
    pub pool_address: Option<Address>,
    pub state: ProgressState,
    pub amount: Decimal,
    pub points: u64,
}

#[async_trait]
pub trait RewardsIndexerDb {
    /// The single global onboarding campaign.
    async fn get_onboarding_campaign(&self) -> Result<Option<Campaign>, DbError>;

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, DbError>;

    async fn list_share_pool_campaigns(&self) -> Result<Vec<Campaign>, DbError>;

    /// Fails with [DbError::DuplicateCampaign] if `pool` already has a campaign.
    async fn create_share_pool_campaign(
        &self,
        pool: Address,
        start_at: DateTime<Utc>,
    ) -> Result<Campaign, DbError>;

    /// Insert or overwrite the ledger row for `(block_number, pool_address)`.
    async fn upsert_swap(&self, swap: &SwapRecord) -> Result<(), DbError>;

    async fn get_swap(&self, block_number: u64, pool: Address)
        -> Result<Option<SwapRecord>, DbError>;

    /// Lifetime `amount0In` of `sender` across all pools.
    async fn total_amount0_in_by_sender(&self, sender: Address) -> Result<U256, DbError>;

    /// Per-sender input totals for swaps in `pool` with `from <= swapped_at <= to`,
    /// restricted to senders that completed the onboarding campaign.
    async fn window_volumes(
        &self,
        pool: Address,
        onboarding_campaign_id: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<SenderVolume>, DbError>;

    async fn get_progress(
        &self,
        user: Address,
        campaign_id: &str,
    ) -> Result<Option<UserProgress>, DbError>;

    /// Upsert progress and point rows in a single transaction.
    async fn record_rewards(
        &self,
        progress: Vec<UserProgress>,
        points: Vec<UserPoints>,
    ) -> Result<(), DbError>;

    /// Upsert onboarding progress without ever moving a completed row back to pending.
    ///
    /// `points` is written only together with a progress change and never replaces an
    /// existing row. Returns whether the progress row was written.
    async fn record_onboarding(
        &self,
        progress: &UserProgress,
        points: Option<&UserPoints>,
    ) -> Result<bool, DbError>;

    async fn list_user_campaigns(&self, user: Address)
        -> Result<Vec<UserCampaignSummary>, DbError>;

    /// Point rows, optionally restricted to one campaign, highest first.
    async fn list_points(&self, campaign_id: Option<&str>) -> Result<Vec<UserPoints>, DbError>;

    /// Next block to scan for `pool`.
    async fn get_pool_cursor(&self, pool: Address) -> Result<Option<u64>, DbError>;

    async fn set_pool_cursor(&self, pool: Address, block: u64) -> Result<(), DbError>;
}

const BATCH_INSERT_CHUNK_SIZE: usize = 75;

pub struct RewardsDb {
    pool: AnyPool,
}

impl RewardsDb {
    pub async fn new(database_url: &str) -> Result<Self, DbError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(20).connect(database_url).await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

fn campaign_from_row(row: &AnyRow) -> Result<Campaign, DbError> {
    let kind: String = row.get("kind");
    Ok(Campaign {
        id: row.get("id"),
        kind: CampaignKind::from_str(&kind).map_err(DbError::BadValue)?,
        pool_address: row
            .get::<Option<String>, _>("pool_address")
            .map(|s| parse_address(&s))
            .transpose()?,
        start_at: from_unix(row.get::<i64, _>("start_at"))?,
        created_at: from_unix(row.get::<i64, _>("created_at"))?,
    })
}

fn swap_from_row(row: &AnyRow) -> Result<SwapRecord, DbError> {
    Ok(SwapRecord {
        block_number: row.get::<i64, _>("block_number") as u64,
        pool_address: parse_address(&row.get::<String, _>("pool_address"))?,
        sender: parse_address(&row.get::<String, _>("sender"))?,
        receiver: parse_address(&row.get::<String, _>("receiver"))?,
        amount0_in: unpad_u256(&row.get::<String, _>("amount0_in"))?,
        amount1_in: unpad_u256(&row.get::<String, _>("amount1_in"))?,
        amount0_out: unpad_u256(&row.get::<String, _>("amount0_out"))?,
        amount1_out: unpad_u256(&row.get::<String, _>("amount1_out"))?,
        swapped_at: row.get::<i64, _>("swapped_at") as u64,
    })
}

fn parse_state(s: &str) -> Result<ProgressState, DbError> {
    ProgressState::from_str(s).map_err(DbError::BadValue)
}

fn parse_decimal(s: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(s).map_err(|e| DbError::BadValue(format!("Invalid decimal {s}: {e}")))
}

#[async_trait]
impl RewardsIndexerDb for RewardsDb {
    async fn get_onboarding_campaign(&self) -> Result<Option<Campaign>, DbError> {
        let query = r#"
            SELECT id, kind, pool_address, start_at, created_at
            FROM campaigns
            WHERE kind = $1
        "#;
        let row = sqlx::query(query)
            .bind(CampaignKind::Onboarding.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(campaign_from_row).transpose()
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, DbError> {
        let query = r#"
            SELECT id, kind, pool_address, start_at, created_at
            FROM campaigns
            WHERE id = $1
        "#;
        let row = sqlx::query(query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(campaign_from_row).transpose()
    }

    async fn list_share_pool_campaigns(&self) -> Result<Vec<Campaign>, DbError> {
        let query = r#"
            SELECT id, kind, pool_address, start_at, created_at
            FROM campaigns
            WHERE kind = $1
            ORDER BY created_at, id
        "#;
        let rows = sqlx::query(query)
            .bind(CampaignKind::SharePool.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(campaign_from_row).collect()
    }

    async fn create_share_pool_campaign(
        &self,
        pool: Address,
        start_at: DateTime<Utc>,
    ) -> Result<Campaign, DbError> {
        let pool_address = format!("{:#x}", pool);
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM campaigns WHERE pool_address = $1")
            .bind(&pool_address)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(DbError::DuplicateCampaign(pool));
        }

        let campaign = Campaign {
            id: uuid::Uuid::new_v4().simple().to_string(),
            kind: CampaignKind::SharePool,
            pool_address: Some(pool),
            start_at: start_at.trunc_subsecs(0),
            created_at: Utc::now().trunc_subsecs(0),
        };

        let query = r#"
            INSERT INTO campaigns (id, kind, pool_address, start_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
        "#;
        let inserted = sqlx::query(query)
            .bind(&campaign.id)
            .bind(campaign.kind.as_str())
            .bind(&pool_address)
            .bind(campaign.start_at.timestamp())
            .bind(campaign.created_at.timestamp())
            .execute(&mut *tx)
            .await;
        match inserted {
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(DbError::DuplicateCampaign(pool));
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }

        tx.commit().await?;
        Ok(campaign)
    }

    async fn upsert_swap(&self, swap: &SwapRecord) -> Result<(), DbError> {
        let query = r#"
            INSERT INTO swaps
            (block_number, pool_address, sender, receiver, amount0_in, amount1_in, amount0_out, amount1_out, swapped_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (block_number, pool_address)
            DO UPDATE SET
                sender = EXCLUDED.sender,
                receiver = EXCLUDED.receiver,
                amount0_in = EXCLUDED.amount0_in,
                amount1_in = EXCLUDED.amount1_in,
                amount0_out = EXCLUDED.amount0_out,
                amount1_out = EXCLUDED.amount1_out,
                swapped_at = EXCLUDED.swapped_at
        "#;

        sqlx::query(query)
            .bind(swap.block_number as i64)
            .bind(format!("{:#x}", swap.pool_address))
            .bind(format!("{:#x}", swap.sender))
            .bind(format!("{:#x}", swap.receiver))
            .bind(pad_u256(swap.amount0_in))
            .bind(pad_u256(swap.amount1_in))
            .bind(pad_u256(swap.amount0_out))
            .bind(pad_u256(swap.amount1_out))
            .bind(swap.swapped_at as i64)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_swap(
        &self,
        block_number: u64,
        pool: Address,
    ) -> Result<Option<SwapRecord>, DbError> {
        let query = r#"
            SELECT block_number, pool_address, sender, receiver, amount0_in, amount1_in, amount0_out, amount1_out, swapped_at
            FROM swaps
            WHERE block_number = $1 AND pool_address = $2
        "#;
        let row = sqlx::query(query)
            .bind(block_number as i64)
            .bind(format!("{:#x}", pool))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(swap_from_row).transpose()
    }

    async fn total_amount0_in_by_sender(&self, sender: Address) -> Result<U256, DbError> {
        let rows = sqlx::query("SELECT amount0_in FROM swaps WHERE sender = $1")
            .bind(format!("{:#x}", sender))
            .fetch_all(&self.pool)
            .await?;

        // Amounts are stored as text, so the sum is taken here to stay exact.
        rows.iter().try_fold(U256::ZERO, |total, row| {
            let amount = unpad_u256(&row.get::<String, _>("amount0_in"))?;
            total
                .checked_add(amount)
                .ok_or_else(|| DbError::BadValue(format!("amount0_in overflow for {sender:#x}")))
        })
    }

    async fn window_volumes(
        &self,
        pool: Address,
        onboarding_campaign_id: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<SenderVolume>, DbError> {
        let query = r#"
            SELECT s.sender AS sender, s.amount0_in AS amount0_in, s.amount1_in AS amount1_in
            FROM swaps s
            JOIN user_campaign_progress p
                ON p.user_address = s.sender AND p.campaign_id = $2 AND p.state = $3
            WHERE s.pool_address = $1 AND s.swapped_at >= $4 AND s.swapped_at <= $5
        "#;
        let rows = sqlx::query(query)
            .bind(format!("{:#x}", pool))
            .bind(onboarding_campaign_id)
            .bind(ProgressState::Completed.as_str())
            .bind(from as i64)
            .bind(to as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut totals: BTreeMap<Address, (U256, U256)> = BTreeMap::new();
        for row in rows {
            let sender = parse_address(&row.get::<String, _>("sender"))?;
            let amount0_in = unpad_u256(&row.get::<String, _>("amount0_in"))?;
            let amount1_in = unpad_u256(&row.get::<String, _>("amount1_in"))?;

            let entry = totals.entry(sender).or_default();
            entry.0 = entry.0.checked_add(amount0_in).ok_or_else(|| {
                DbError::BadValue(format!("amount0_in overflow for {sender:#x}"))
            })?;
            entry.1 = entry.1.checked_add(amount1_in).ok_or_else(|| {
                DbError::BadValue(format!("amount1_in overflow for {sender:#x}"))
            })?;
        }

        Ok(totals
            .into_iter()
            .map(|(sender, (amount0_in, amount1_in))| SenderVolume {
                sender,
                amount0_in,
                amount1_in,
            })
            .collect())
    }

    async fn get_progress(
        &self,
        user: Address,
        campaign_id: &str,
    ) -> Result<Option<UserProgress>, DbError> {
        let query = r#"
            SELECT user_address, campaign_id, state, amount
            FROM user_campaign_progress
            WHERE user_address = $1 AND campaign_id = $2
        "#;
        let row = sqlx::query(query)
            .bind(format!("{:#x}", user))
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(UserProgress {
                user: parse_address(&row.get::<String, _>("user_address"))?,
                campaign_id: row.get("campaign_id"),
                state: parse_state(&row.get::<String, _>("state"))?,
                amount: parse_decimal(&row.get::<String, _>("amount"))?,
            })),
            None => Ok(None),
        }
    }

    async fn record_rewards(
        &self,
        progress: Vec<UserProgress>,
        points: Vec<UserPoints>,
    ) -> Result<(), DbError> {
        if progress.is_empty() && points.is_empty() {
            return Ok(());
        }

        let updated_at = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        // Process in chunks to avoid parameter limits
        for chunk in progress.chunks(BATCH_INSERT_CHUNK_SIZE) {
            let mut values_clauses = Vec::new();
            let mut param_idx = 1;

            for _ in chunk {
                values_clauses.push(format!(
                    "(${},${},${},${},${})",
                    param_idx,
                    param_idx + 1,
                    param_idx + 2,
                    param_idx + 3,
                    param_idx + 4
                ));
                param_idx += 5;
            }

            let query = format!(
                r#"INSERT INTO user_campaign_progress
                (user_address, campaign_id, state, amount, updated_at)
                VALUES {}
                ON CONFLICT (user_address, campaign_id)
                DO UPDATE SET
                    state = EXCLUDED.state,
                    amount = EXCLUDED.amount,
                    updated_at = EXCLUDED.updated_at"#,
                values_clauses.join(",")
            );

            let mut q = sqlx::query(&query);
            for entry in chunk {
                q = q
                    .bind(format!("{:#x}", entry.user))
                    .bind(entry.campaign_id.clone())
                    .bind(entry.state.as_str())
                    .bind(entry.amount.normalize().to_string())
                    .bind(updated_at);
            }
            q.execute(&mut *tx).await?;
        }

        for chunk in points.chunks(BATCH_INSERT_CHUNK_SIZE) {
            let mut values_clauses = Vec::new();
            let mut param_idx = 1;

            for _ in chunk {
                values_clauses.push(format!(
                    "(${},${},${},${})",
                    param_idx,
                    param_idx + 1,
                    param_idx + 2,
                    param_idx + 3
                ));
                param_idx += 4;
            }

            let query = format!(
                r#"INSERT INTO user_campaign_points
                (user_address, campaign_id, points, updated_at)
                VALUES {}
                ON CONFLICT (user_address, campaign_id)
                DO UPDATE SET
                    points = EXCLUDED.points,
                    updated_at = EXCLUDED.updated_at"#,
                values_clauses.join(",")
            );

            let mut q = sqlx::query(&query);
            for entry in chunk {
                let points = i64::try_from(entry.points)
                    .map_err(|_| DbError::BadValue(format!("points {} out of range", entry.points)))?;
                q = q
                    .bind(format!("{:#x}", entry.user))
                    .bind(entry.campaign_id.clone())
                    .bind(points)
                    .bind(updated_at);
            }
            q.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn record_onboarding(
        &self,
        progress: &UserProgress,
        points: Option<&UserPoints>,
    ) -> Result<bool, DbError> {
        let updated_at = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let query = r#"
            INSERT INTO user_campaign_progress
            (user_address, campaign_id, state, amount, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_address, campaign_id)
            DO UPDATE SET
                state = EXCLUDED.state,
                amount = EXCLUDED.amount,
                updated_at = EXCLUDED.updated_at
            WHERE user_campaign_progress.state <> $6
        "#;
        let result = sqlx::query(query)
            .bind(format!("{:#x}", progress.user))
            .bind(progress.campaign_id.clone())
            .bind(progress.state.as_str())
            .bind(progress.amount.normalize().to_string())
            .bind(updated_at)
            .bind(ProgressState::Completed.as_str())
            .execute(&mut *tx)
            .await?;
        let written = result.rows_affected() > 0;

        if let (true, Some(points)) = (written, points) {
            let value = i64::try_from(points.points)
                .map_err(|_| DbError::BadValue(format!("points {} out of range", points.points)))?;
            let query = r#"
                INSERT INTO user_campaign_points
                (user_address, campaign_id, points, updated_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_address, campaign_id) DO NOTHING
            "#;
            sqlx::query(query)
                .bind(format!("{:#x}", points.user))
                .bind(points.campaign_id.clone())
                .bind(value)
                .bind(updated_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn list_user_campaigns(
        &self,
        user: Address,
    ) -> Result<Vec<UserCampaignSummary>, DbError> {
        let query = r#"
            SELECT p.campaign_id AS campaign_id, c.kind AS kind, c.pool_address AS pool_address,
                   p.state AS state, p.amount AS amount, COALESCE(pt.points, 0) AS points
            FROM user_campaign_progress p
            JOIN campaigns c ON c.id = p.campaign_id
            LEFT JOIN user_campaign_points pt
                ON pt.user_address = p.user_address AND pt.campaign_id = p.campaign_id
            WHERE p.user_address = $1
            ORDER BY c.created_at, p.campaign_id
        "#;
        let rows = sqlx::query(query).bind(format!("{:#x}", user)).fetch_all(&self.pool).await?;

        let mut results = Vec::new();
        for row in rows {
            let kind: String = row.get("kind");
            results.push(UserCampaignSummary {
                campaign_id: row.get("campaign_id"),
                kind: CampaignKind::from_str(&kind).map_err(DbError::BadValue)?,
                pool_address: row
                    .get::<Option<String>, _>("pool_address")
                    .map(|s| parse_address(&s))
                    .transpose()?,
                state: parse_state(&row.get::<String, _>("state"))?,
                amount: parse_decimal(&row.get::<String, _>("amount"))?,
                points: row.get::<i64, _>("points") as u64,
            });
        }

        Ok(results)
    }

    async fn list_points(&self, campaign_id: Option<&str>) -> Result<Vec<UserPoints>, DbError> {
        let rows = match campaign_id {
            Some(id) => {
                let query = r#"
                    SELECT user_address, campaign_id, points
                    FROM user_campaign_points
                    WHERE campaign_id = $1
                    ORDER BY points DESC, user_address
                "#;
                sqlx::query(query).bind(id).fetch_all(&self.pool).await?
            }
            None => {
                let query = r#"
                    SELECT user_address, campaign_id, points
                    FROM user_campaign_points
                    ORDER BY points DESC, user_address, campaign_id
                "#;
                sqlx::query(query).fetch_all(&self.pool).await?
            }
        };

        let mut results = Vec::new();
        for row in rows {
            results.push(UserPoints {
                user: parse_address(&row.get::<String, _>("user_address"))?,
                campaign_id: row.get("campaign_id"),
                points: row.get::<i64, _>("points") as u64,
            });
        }

        Ok(results)
    }

    async fn get_pool_cursor(&self, pool: Address) -> Result<Option<u64>, DbError> {
        let query = "SELECT value FROM indexer_state WHERE key = $1";
        let result = sqlx::query(query).bind(cursor_key(pool)).fetch_optional(&self.pool).await?;

        match result {
            Some(row) => {
                let value: String = row.get("value");
                Ok(Some(value.parse().map_err(|_| DbError::BadBlockNumb(value))?))
            }
            None => Ok(None),
        }
    }

    async fn set_pool_cursor(&self, pool: Address, block: u64) -> Result<(), DbError> {
        let query = r#"
            INSERT INTO indexer_state (key, value, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(cursor_key(pool))
            .bind(block.to_string())
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
