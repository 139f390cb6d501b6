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

//! Read access to the chain: block headers, swap logs and log subscriptions.

use std::sync::Arc;

use alloy::{
    primitives::Address,
    providers::Provider,
    rpc::types::{BlockNumberOrTag, Log},
};
use async_trait::async_trait;
use futures_util::{stream::BoxStream, StreamExt};
use thiserror::Error;

use crate::events::swap_filter;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Block {0} not found")]
    MissingBlock(u64),

    #[error("Log subscription for pool {0} closed")]
    SubscriptionClosed(Address),
}

/// Number and timestamp (unix seconds) of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
}

pub type LogStream = BoxStream<'static, Log>;

pub type ChainSourceObj = Arc<dyn ChainSource>;

#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current head of the chain.
    async fn latest_block(&self) -> Result<BlockInfo, ChainError>;

    async fn block(&self, number: u64) -> Result<BlockInfo, ChainError>;

    /// `Swap` logs emitted by `pool` in the inclusive block range `from..=to`.
    async fn swap_logs(&self, pool: Address, from: u64, to: u64) -> Result<Vec<Log>, ChainError>;

    /// Push stream of new `Swap` logs emitted by `pool`.
    ///
    /// The stream ends when the underlying transport drops the subscription.
    async fn subscribe_swaps(&self, pool: Address) -> Result<LogStream, ChainError>;
}

/// [ChainSource] backed by an alloy provider. Subscriptions need a pubsub transport.
pub struct RpcChain<P> {
    provider: P,
}

impl<P> RpcChain<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P> ChainSource for RpcChain<P>
where
    P: Provider + Send + Sync,
{
    async fn latest_block(&self) -> Result<BlockInfo, ChainError> {
        let number =
            self.provider.get_block_number().await.map_err(|e| ChainError::Rpc(e.to_string()))?;
        self.block(number).await
    }

    async fn block(&self, number: u64) -> Result<BlockInfo, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .ok_or(ChainError::MissingBlock(number))?;
        Ok(BlockInfo { number, timestamp: block.header.timestamp })
    }

    async fn swap_logs(&self, pool: Address, from: u64, to: u64) -> Result<Vec<Log>, ChainError> {
        let filter = swap_filter(pool)
            .from_block(BlockNumberOrTag::Number(from))
            .to_block(BlockNumberOrTag::Number(to));
        self.provider.get_logs(&filter).await.map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn subscribe_swaps(&self, pool: Address) -> Result<LogStream, ChainError> {
        let sub = self
            .provider
            .subscribe_logs(&swap_filter(pool))
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(sub.into_stream().boxed())
    }
}
