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

use oddsbook_sdk::types::{Fill, Trade};
use tracing::debug;

use crate::{
	entry::{OrderEntry, PAYOUT, price_in_frame},
	orderbook::{BookSide, OrderBook},
	types::now_millis,
};

/// One match between an incoming order and a resting order
///
/// `aggressor` and `passive` are copies of both entries as they stood right
/// after this execution was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
	pub trade_id: String,
	pub aggressor: OrderEntry,
	pub passive: OrderEntry,
	pub quantity: u64,
	/// Normalized YES price of the passive order's level
	pub execution_price: u32,
	pub timestamp: u64,
}

impl Execution {
	/// Execution price in the aggressor's side frame
	pub fn aggressor_price(&self) -> u32 {
		price_in_frame(self.execution_price, self.aggressor.side())
	}

	/// Execution price in the passive order's side frame
	pub fn passive_price(&self) -> u32 {
		price_in_frame(self.execution_price, self.passive.side())
	}
}

/// Matching engine that applies deterministic price-time priority
///
/// The engine holds no state. The caller owns the book and is responsible
/// for holding the market's write lock across `match_order` and the insert
/// of any remainder.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
	verbose: bool,
}

impl MatchingEngine {
	/// Create a new matching engine
	pub fn new() -> Self {
		Self::default()
	}

	/// Emit a debug event per execution
	pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
		self.verbose = verbose;
		self
	}

	/// Match an incoming order against the book
	///
	/// Walks the contra side level by level in priority order:
	/// - Price priority: the best contra price is consumed first
	/// - Time priority: within a level, the oldest order is consumed first
	///
	/// Every execution happens at the resting level's price. Stops once the
	/// incoming order is exhausted or the best contra price no longer
	/// crosses. The incoming order is reduced in place and is never inserted
	/// here.
	pub fn match_order(&self, incoming: &mut OrderEntry, book: &mut OrderBook) -> Vec<Execution> {
		let contra = if incoming.normalized_is_buy() {
			BookSide::Ask
		} else {
			BookSide::Bid
		};
		let mut executions = Vec::new();

		while incoming.quantity() > 0 {
			let Some(best) = book.best_price(contra) else {
				break;
			};
			let crosses = match contra {
				BookSide::Ask => incoming.normalized_price() >= best,
				BookSide::Bid => incoming.normalized_price() <= best,
			};
			if !crosses {
				break;
			}

			let Some(resting_qty) = book.front_order(contra).map(OrderEntry::quantity) else {
				break;
			};
			let quantity = incoming.quantity().min(resting_qty);
			let Some(passive) = book.execute_front(contra, quantity) else {
				break;
			};
			incoming.fill(quantity, best);

			let execution = Execution {
				trade_id: uuid::Uuid::new_v4().to_string(),
				aggressor: incoming.clone(),
				passive,
				quantity,
				execution_price: best,
				timestamp: now_millis(),
			};
			if self.verbose {
				debug!(
					target: "matcher",
					market = %book.market(),
					taker = %execution.aggressor.order_id(),
					maker = %execution.passive.order_id(),
					price = best,
					qty = quantity,
					"Execution"
				);
			}
			executions.push(execution);
		}

		executions
	}

	/// Public tape records, one per execution, in the aggressor's frame
	pub fn executions_to_trades(executions: &[Execution], market: &str) -> Vec<Trade> {
		executions
			.iter()
			.map(|execution| Trade {
				trade_id: execution.trade_id.clone(),
				market: market.to_string(),
				price: execution.aggressor_price(),
				count: execution.quantity,
				taker_side: execution.aggressor.side(),
				yes_price: execution.execution_price,
				no_price: PAYOUT - execution.execution_price,
				taker_order_id: execution.aggressor.order_id().to_string(),
				maker_order_id: execution.passive.order_id().to_string(),
				created_time: execution.timestamp,
			})
			.collect()
	}

	/// Private fill records, taker then maker for each execution
	pub fn executions_to_fills(executions: &[Execution], market: &str) -> Vec<Fill> {
		executions
			.iter()
			.flat_map(|execution| {
				let taker = Self::fill_for(execution, &execution.aggressor, true, market);
				let maker = Self::fill_for(execution, &execution.passive, false, market);
				[taker, maker]
			})
			.collect()
	}

	fn fill_for(execution: &Execution, entry: &OrderEntry, is_taker: bool, market: &str) -> Fill {
		Fill {
			fill_id: uuid::Uuid::new_v4().to_string(),
			order_id: entry.order_id().to_string(),
			user_id: entry.user_id().to_string(),
			market: market.to_string(),
			side: entry.side(),
			action: entry.action(),
			price: price_in_frame(execution.execution_price, entry.side()),
			count: execution.quantity,
			is_taker,
			trade_id: execution.trade_id.clone(),
			created_time: execution.timestamp,
		}
	}
}
