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

//! Timestamp to block number resolution.

use crate::chain::{ChainError, ChainSource};

/// Find the first block whose timestamp is at or after `target` (unix seconds).
///
/// Block timestamps are assumed non-decreasing. If every block is older than `target`
/// the result is `latest + 1`, the first block that has not been produced yet.
pub async fn find_block_at_or_after<C>(chain: &C, target: u64) -> Result<u64, ChainError>
where
    C: ChainSource + ?Sized,
{
    let latest = chain.latest_block().await?;

    let mut lo = 0u64;
    let mut hi = latest.number + 1;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let timestamp = if mid == latest.number {
            latest.timestamp
        } else {
            chain.block(mid).await?.timestamp
        };
        if timestamp < target {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    tracing::debug!("Block {lo} is the first at or after timestamp {target}");
    Ok(lo)
}

/// [find_block_at_or_after] over an in-memory sequence of block timestamps.
pub fn partition_point_by_timestamp(timestamps: &[u64], target: u64) -> u64 {
    timestamps.partition_point(|ts| *ts < target) as u64
}
