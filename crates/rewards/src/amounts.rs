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

//! Lossless conversion of raw on-chain token amounts into exact decimals.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount {0} does not fit in a decimal")]
    Overflow(U256),

    #[error("token precision of {0} decimals is not supported")]
    UnsupportedScale(u32),

    #[error("arithmetic overflow while {0}")]
    Arithmetic(&'static str),
}

/// Convert an integer amount to a [Decimal] without passing through floating point.
///
/// The conversion goes through the base-10 string form, so the result is exact or an error.
pub fn u256_to_decimal(value: U256) -> Result<Decimal, AmountError> {
    Decimal::from_str_exact(&value.to_string()).map_err(|_| AmountError::Overflow(value))
}

/// Convert a raw amount in smallest units into whole tokens, e.g. wei to ETH.
pub fn to_token_units(value: U256, decimals: u32) -> Result<Decimal, AmountError> {
    let mut units = u256_to_decimal(value)?;
    units.set_scale(decimals).map_err(|_| AmountError::UnsupportedScale(decimals))?;
    Ok(units.normalize())
}

/// `whole * 10^decimals` as an integer amount in smallest units.
pub fn from_token_units(whole: u64, decimals: u32) -> Result<U256, AmountError> {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .and_then(|scale| scale.checked_mul(U256::from(whole)))
        .ok_or(AmountError::Arithmetic("scaling token units"))
}
