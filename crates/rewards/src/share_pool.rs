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

//! Weekly proportional allocation of the share-pool campaign.
//!
//! A campaign runs over consecutive calendar-week windows. Every window that has fully
//! elapsed distributes a fixed pool of points among onboarded senders in proportion to
//! their USD swap volume in that window. Points accumulate exactly across windows and are
//! only truncated to integers when the totals are handed out.

use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Datelike, Days, NaiveTime, TimeDelta, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use thiserror::Error;

use crate::{amounts::AmountError, pricing::RewardsConfig, CAMPAIGN_DURATION_DAYS};

#[derive(Error, Debug)]
pub enum RewardsError {
    #[error("Amount conversion failed: {0}")]
    Amount(#[from] AmountError),

    #[error("Decimal overflow while {0}")]
    Overflow(&'static str),

    #[error("Points total {0} is not a valid integer")]
    InvalidPoints(Decimal),
}

/// One weekly window of a campaign. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignWindow {
    /// 1-based position of the window in the campaign.
    pub index: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CampaignWindow {
    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.end <= now
    }
}

/// Sunday 23:59:59.999999999 UTC of the week containing `at`. Weeks start on Monday.
pub fn last_instant_of_week(at: DateTime<Utc>) -> DateTime<Utc> {
    let date = at.date_naive();
    let days_to_monday = 7 - u64::from(date.weekday().num_days_from_monday());
    let next_monday = (date + Days::new(days_to_monday)).and_time(NaiveTime::MIN).and_utc();
    next_monday - TimeDelta::nanoseconds(1)
}

/// The `weeks` consecutive windows of a campaign starting at `start`.
///
/// The first window runs from `start` to the end of its calendar week; each following
/// window starts at the midnight after the previous one ends.
pub fn campaign_windows(start: DateTime<Utc>, weeks: u32) -> Vec<CampaignWindow> {
    let mut windows = Vec::with_capacity(weeks as usize);
    let mut window_start = start;
    for index in 1..=weeks {
        let end = last_instant_of_week(window_start);
        windows.push(CampaignWindow { index, start: window_start, end });
        window_start = end + TimeDelta::nanoseconds(1);
    }
    windows
}

/// Instant at which live ingestion for a campaign stops.
pub fn campaign_end(start: DateTime<Utc>) -> DateTime<Utc> {
    start + TimeDelta::days(CAMPAIGN_DURATION_DAYS)
}

/// Summed input amounts of one sender inside a window, in smallest units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderVolume {
    pub sender: Address,
    pub amount0_in: U256,
    pub amount1_in: U256,
}

/// Split `pool` points in proportion to each participant's volume.
///
/// A window without volume awards nothing and performs no division.
pub fn allocate_window_points(
    volumes: &[(Address, Decimal)],
    pool: Decimal,
) -> Result<Vec<(Address, Decimal)>, RewardsError> {
    let total = volumes.iter().try_fold(Decimal::ZERO, |acc, (_, volume)| {
        acc.checked_add(*volume).ok_or(RewardsError::Overflow("summing window volume"))
    })?;

    if total.is_zero() {
        return Ok(volumes.iter().map(|(sender, _)| (*sender, Decimal::ZERO)).collect());
    }

    volumes
        .iter()
        .map(|(sender, volume)| {
            let points = volume
                .checked_mul(pool)
                .and_then(|scaled| scaled.checked_div(total))
                .ok_or(RewardsError::Overflow("allocating window points"))?;
            Ok((*sender, points))
        })
        .collect()
}

/// Final result for one participant of a share-pool campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePoolAward {
    pub user: Address,
    /// Cumulative USD volume over the settled windows.
    pub volume_usd: Decimal,
    /// Truncated sum of the exact per-window allocations.
    pub points: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    volume_usd: Decimal,
    points: Decimal,
}

/// Accumulates window allocations for one campaign settlement run.
#[derive(Debug)]
pub struct SharePoolTally<'a> {
    config: &'a RewardsConfig,
    totals: BTreeMap<Address, Tally>,
    windows_settled: u32,
}

impl<'a> SharePoolTally<'a> {
    pub fn new(config: &'a RewardsConfig) -> Self {
        Self { config, totals: BTreeMap::new(), windows_settled: 0 }
    }

    pub fn add_window(&mut self, volumes: &[SenderVolume]) -> Result<(), RewardsError> {
        let priced = volumes
            .iter()
            .map(|v| Ok((v.sender, self.config.usd_volume(v.amount0_in, v.amount1_in)?)))
            .collect::<Result<Vec<_>, AmountError>>()?;
        let allocations = allocate_window_points(&priced, self.config.weekly_points)?;

        for ((sender, volume), (_, points)) in priced.iter().zip(allocations) {
            let entry = self.totals.entry(*sender).or_default();
            entry.volume_usd = entry
                .volume_usd
                .checked_add(*volume)
                .ok_or(RewardsError::Overflow("accumulating volume"))?;
            entry.points = entry
                .points
                .checked_add(points)
                .ok_or(RewardsError::Overflow("accumulating points"))?;
        }
        self.windows_settled += 1;
        Ok(())
    }

    pub fn windows_settled(&self) -> u32 {
        self.windows_settled
    }

    pub fn into_awards(self) -> Result<Vec<SharePoolAward>, RewardsError> {
        self.totals
            .into_iter()
            .map(|(user, tally)| {
                let truncated = tally.points.trunc();
                let points = truncated.to_u64().ok_or(RewardsError::InvalidPoints(truncated))?;
                Ok(SharePoolAward { user, volume_usd: tally.volume_usd, points })
            })
            .collect()
    }
}
