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

//! Swap ledger, campaign registry and reward settlement services.

use std::sync::Arc;

use alloy::{
    providers::{fillers::ChainIdFiller, ProviderBuilder},
    rpc::client::RpcClient,
    transports::{layers::RetryBackoffLayer, ws::WsConnect},
};
use swap_rewards::{ChainError, ChainSourceObj, RpcChain};
use url::Url;

pub mod db;
pub mod error;
pub mod ingest;
pub mod rewards;

pub use error::ServiceError;

/// Chain access over HTTP with retrying requests. Supports polling only.
pub fn http_chain(rpc_url: Url) -> ChainSourceObj {
    let provider = ProviderBuilder::new()
        .disable_recommended_fillers()
        .filler(ChainIdFiller::default())
        .connect_client(
            RpcClient::builder().layer(RetryBackoffLayer::new(3, 1000, 200)).http(rpc_url),
        );
    Arc::new(RpcChain::new(provider))
}

/// Chain access over a websocket. Required for push subscriptions.
pub async fn ws_chain(ws_url: Url) -> Result<ChainSourceObj, ServiceError> {
    let provider = ProviderBuilder::new()
        .disable_recommended_fillers()
        .filler(ChainIdFiller::default())
        .connect_ws(WsConnect::new(ws_url.as_str()))
        .await
        .map_err(|e| ChainError::Rpc(e.to_string()))?;
    Ok(Arc::new(RpcChain::new(provider)))
}
