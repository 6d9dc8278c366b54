// Copyright 2025 itscheems
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

use std::time::SystemTime;

use crate::entry::EntryError;

/// Error types for exchange operations
///
/// These are business errors surfaced at the service boundary. Breaking an
/// order book invariant (for example reducing an entry below zero) is not
/// represented here; it panics.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExchangeError {
	#[error("Invalid order: {0}")]
	InvalidOrder(String),
	#[error("Price must be between 1 and 99 cents, got: {0}")]
	InvalidPrice(u32),
	#[error("Quantity must be between 1 and 1000000000, got: {0}")]
	InvalidQuantity(u64),
	#[error("Market orders are not supported; a limit price is required")]
	UnpricedOrder,
	#[error("Duplicate order id: {0}")]
	DuplicateOrderId(String),
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Market not found: {0}")]
	MarketNotFound(String),
	#[error("Market already exists: {0}")]
	MarketExists(String),
}

impl From<EntryError> for ExchangeError {
	fn from(err: EntryError) -> Self {
		match err {
			EntryError::InvalidPrice(price) => ExchangeError::InvalidPrice(price),
			EntryError::InvalidQuantity(quantity) => ExchangeError::InvalidQuantity(quantity),
		}
	}
}

/// Milliseconds since the Unix epoch
pub(crate) fn now_millis() -> u64 {
	SystemTime::now()
		.duration_since(SystemTime::UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or_default()
}
