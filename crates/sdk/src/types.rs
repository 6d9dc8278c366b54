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

use std::fmt;

use serde::{Deserialize, Serialize};

/// Contract side of a binary-outcome market
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractSide {
	Yes,
	No,
}

impl ContractSide {
	pub fn as_str(&self) -> &'static str {
		match self {
			ContractSide::Yes => "yes",
			ContractSide::No => "no",
		}
	}
}

impl fmt::Display for ContractSide {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Order action (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
	Buy,
	Sell,
}

impl Action {
	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Buy => "buy",
			Action::Sell => "sell",
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	Open,
	PartiallyFilled,
	Filled,
	Canceled,
}

impl OrderStatus {
	/// Status of a just-submitted order given how much of it traded
	pub fn from_fill(filled_quantity: u64, remaining_quantity: u64) -> Self {
		if filled_quantity == 0 {
			OrderStatus::Open
		} else if remaining_quantity == 0 {
			OrderStatus::Filled
		} else {
			OrderStatus::PartiallyFilled
		}
	}
}

/// Request to submit an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
	/// Market ticker
	pub market: String,
	/// Submitting user
	pub user_id: String,
	pub side: ContractSide,
	pub action: Action,
	/// Limit price in cents; `None` is an unpriced (market) order
	pub price: Option<u32>,
	pub quantity: u64,
}

/// Outcome of submitting an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrderResponse {
	/// Server-assigned order ID
	pub order_id: String,
	pub status: OrderStatus,
	pub filled_quantity: u64,
	pub remaining_quantity: u64,
	/// Quantity-weighted average fill price in the order's own side frame
	pub avg_fill_price: Option<u32>,
}

/// Order record handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	pub order_id: String,
	pub user_id: String,
	pub market: String,
	pub side: ContractSide,
	pub action: Action,
	pub price: u32,
	pub quantity: u64,
	pub filled_quantity: u64,
	pub remaining_quantity: u64,
	pub avg_fill_price: Option<u32>,
	pub status: OrderStatus,
	pub created_time: u64,
	pub updated_time: u64,
}

/// Public trade tape record
///
/// One per execution, expressed in the aggressor's side frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
	pub trade_id: String,
	pub market: String,
	/// Execution price in the taker's side frame
	pub price: u32,
	pub count: u64,
	pub taker_side: ContractSide,
	pub yes_price: u32,
	pub no_price: u32,
	pub taker_order_id: String,
	pub maker_order_id: String,
	pub created_time: u64,
}

/// Private fill record, one per participant per execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
	pub fill_id: String,
	pub order_id: String,
	pub user_id: String,
	pub market: String,
	pub side: ContractSide,
	pub action: Action,
	/// Execution price in this participant's side frame
	pub price: u32,
	pub count: u64,
	pub is_taker: bool,
	pub trade_id: String,
	pub created_time: u64,
}

/// Weighted-average-cost position for one (user, market, side)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
	pub user_id: String,
	pub market: String,
	pub side: ContractSide,
	/// Signed contract count: positive long, negative short
	pub quantity: i64,
	/// Average entry price in cents
	pub avg_price: u32,
	/// Signed cost basis in cents, same sign as `quantity`
	pub total_cost: i64,
	pub realized_pnl: i64,
	pub updated_time: u64,
}

impl Position {
	pub fn is_open(&self) -> bool {
		self.quantity != 0
	}
}

/// Aggregated `[price, quantity]` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevelView(pub u32, pub u64);

impl PriceLevelView {
	pub fn price(&self) -> u32 {
		self.0
	}

	pub fn quantity(&self) -> u64 {
		self.1
	}
}

/// Unified order book snapshot in the normalized YES frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
	pub market: String,
	/// Bids, highest price first
	pub bids: Vec<PriceLevelView>,
	/// Asks, lowest price first
	pub asks: Vec<PriceLevelView>,
}

impl OrderbookSnapshot {
	/// Bids followed by asks as a single `[price, qty]` list
	pub fn levels(&self) -> Vec<PriceLevelView> {
		self.bids.iter().chain(self.asks.iter()).copied().collect()
	}
}

/// Bid-only view of both contracts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualSidedOrderbook {
	pub market: String,
	pub yes: Vec<PriceLevelView>,
	pub no: Vec<PriceLevelView>,
}
