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

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
	Open,
	Closed,
	Settled,
}

/// Descriptive market metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
	pub ticker: String,
	pub event_ticker: String,
	pub title: String,
	pub status: MarketStatus,
}

impl Market {
	pub fn new(
		ticker: impl Into<String>,
		event_ticker: impl Into<String>,
		title: impl Into<String>,
	) -> Self {
		Self {
			ticker: ticker.into(),
			event_ticker: event_ticker.into(),
			title: title.into(),
			status: MarketStatus::Open,
		}
	}

	pub fn is_open(&self) -> bool {
		self.status == MarketStatus::Open
	}
}

/// Keyed in-memory market catalog
///
/// Lives outside the matching core: the binary reads it to decide which
/// books to create, the exchange never consults it.
#[derive(Default)]
pub struct MarketCatalog {
	markets: DashMap<String, Market>,
}

impl MarketCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace a market; returns the previous entry
	pub fn upsert(&self, market: Market) -> Option<Market> {
		self.markets.insert(market.ticker.clone(), market)
	}

	pub fn get(&self, ticker: &str) -> Option<Market> {
		self.markets.get(ticker).map(|m| m.value().clone())
	}

	/// All markets, sorted by ticker
	pub fn list(&self) -> Vec<Market> {
		let mut markets: Vec<Market> = self.markets.iter().map(|m| m.value().clone()).collect();
		markets.sort_by(|a, b| a.ticker.cmp(&b.ticker));
		markets
	}

	pub fn remove(&self, ticker: &str) -> Option<Market> {
		self.markets.remove(ticker).map(|(_, market)| market)
	}

	pub fn len(&self) -> usize {
		self.markets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.markets.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_upsert_get_remove() {
		let catalog = MarketCatalog::new();
		assert!(catalog.upsert(Market::new("RAIN-NYC", "RAIN", "Rain in NYC")).is_none());

		let mut closed = Market::new("RAIN-NYC", "RAIN", "Rain in NYC today");
		closed.status = MarketStatus::Closed;
		let previous = catalog.upsert(closed).unwrap();
		assert_eq!(previous.title, "Rain in NYC");

		let current = catalog.get("RAIN-NYC").unwrap();
		assert!(!current.is_open());

		assert!(catalog.remove("RAIN-NYC").is_some());
		assert!(catalog.get("RAIN-NYC").is_none());
		assert!(catalog.is_empty());
	}

	#[test]
	fn test_list_sorted() {
		let catalog = MarketCatalog::new();
		catalog.upsert(Market::new("B", "E", "b"));
		catalog.upsert(Market::new("A", "E", "a"));

		let tickers: Vec<String> = catalog.list().into_iter().map(|m| m.ticker).collect();
		assert_eq!(tickers, vec!["A", "B"]);
	}
}
