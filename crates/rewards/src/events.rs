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

//! Swap event decoding and log query batching.

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::{Filter, Log},
    sol,
    sol_types::SolEvent,
};
use thiserror::Error;

sol! {
    interface IUniswapV2Pair {
        event Swap(
            address indexed sender,
            uint256 amount0In,
            uint256 amount1In,
            uint256 amount0Out,
            uint256 amount1Out,
            address indexed to
        );
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Log is not a Swap event (topic0: {0:?})")]
    NotSwap(Option<B256>),

    #[error("Malformed Swap log: {0}")]
    Abi(#[from] alloy::sol_types::Error),

    #[error("Log has no block number")]
    MissingBlockNumber,
}

/// A decoded `Swap` event together with where it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEvent {
    pub pool: Address,
    pub block_number: u64,
    /// Present when the node includes it in the log payload.
    pub block_timestamp: Option<u64>,
    pub sender: Address,
    pub to: Address,
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
}

/// Filter matching `Swap` logs emitted by `pool`.
pub fn swap_filter(pool: Address) -> Filter {
    Filter::new().address(pool).event_signature(IUniswapV2Pair::Swap::SIGNATURE_HASH)
}

pub fn decode_swap_log(log: &Log) -> Result<SwapEvent, DecodeError> {
    if log.topic0() != Some(&IUniswapV2Pair::Swap::SIGNATURE_HASH) {
        return Err(DecodeError::NotSwap(log.topic0().copied()));
    }
    let block_number = log.block_number.ok_or(DecodeError::MissingBlockNumber)?;
    let decoded = log.log_decode::<IUniswapV2Pair::Swap>()?;
    let swap = decoded.inner.data;

    Ok(SwapEvent {
        pool: decoded.inner.address,
        block_number,
        block_timestamp: log.block_timestamp,
        sender: swap.sender,
        to: swap.to,
        amount0_in: swap.amount0In,
        amount1_in: swap.amount1In,
        amount0_out: swap.amount0Out,
        amount1_out: swap.amount1Out,
    })
}

/// Splits the half-open block range `[from, to)` into consecutive batches.
///
/// Each item is an inclusive `(start, end)` pair suitable for `eth_getLogs`.
#[derive(Debug, Clone)]
pub struct BlockBatches {
    next: u64,
    to: u64,
    size: u64,
}

impl BlockBatches {
    pub fn new(from: u64, to: u64, size: u64) -> Self {
        Self { next: from, to, size: size.max(1) }
    }
}

impl Iterator for BlockBatches {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.to {
            return None;
        }
        let start = self.next;
        let end = start.saturating_add(self.size).min(self.to);
        self.next = end;
        Some((start, end - 1))
    }
}
