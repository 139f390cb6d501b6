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

use swap_rewards::{AmountError, ChainError, DecodeError, RewardsError};
use thiserror::Error;

use crate::db::DbError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Chain unavailable: {0}")]
    ChainUnavailable(#[from] ChainError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),

    #[error("Reward computation error: {0}")]
    Rewards(#[from] RewardsError),

    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Whether retrying the same operation later can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ServiceError::ChainUnavailable(_))
    }

    /// Whether the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Persistence(DbError::DuplicateCampaign(_)) | ServiceError::Config(_)
        )
    }
}
