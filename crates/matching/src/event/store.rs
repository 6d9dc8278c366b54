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

use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard, PoisonError},
};

use oddsbook_sdk::types::{ContractSide, Fill, Order, OrderStatus, Position, Trade};
use thiserror::Error;

/// Error types for order store operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
	#[error("Failed to write record: {0}")]
	WriteFailed(String),
	#[error("Failed to read records: {0}")]
	ReadFailed(String),
}

/// Persistence collaborator for orders, fills, trades and positions
///
/// Writes are called from the event writer thread, once per mutation and
/// in the order the exchange produced them. Orders and positions are
/// upserts keyed by their identity; fills and trades are appends.
///
/// `open_orders` is read once per market when its book is created, to warm
/// the book with resting orders that survived a restart.
pub trait OrderStore: Send + Sync {
	fn persist_order(&self, order: &Order) -> Result<(), StoreError>;

	fn persist_fill(&self, fill: &Fill) -> Result<(), StoreError>;

	fn persist_trade(&self, trade: &Trade) -> Result<(), StoreError>;

	fn persist_position(&self, position: &Position) -> Result<(), StoreError>;

	/// Open and partially filled orders of a market, in first-persisted order
	fn open_orders(&self, market: &str) -> Result<Vec<Order>, StoreError>;
}

/// In-memory order store
///
/// No durability. Used by the demo binary, tests and benchmarks.
#[derive(Default)]
pub struct MemoryOrderStore {
	orders: Mutex<OrderTable>,
	fills: Mutex<Vec<Fill>>,
	trades: Mutex<Vec<Trade>>,
	positions: Mutex<HashMap<(String, String, ContractSide), Position>>,
}

#[derive(Default)]
struct OrderTable {
	by_id: HashMap<String, Order>,
	/// Ids in first-persisted order
	arrival: Vec<String>,
}

impl MemoryOrderStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get_order(&self, order_id: &str) -> Option<Order> {
		lock(&self.orders).by_id.get(order_id).cloned()
	}

	pub fn order_count(&self) -> usize {
		lock(&self.orders).by_id.len()
	}

	/// A user's orders in first-persisted order, optionally for one market
	pub fn orders_for_user(&self, user_id: &str, market: Option<&str>) -> Vec<Order> {
		let table = lock(&self.orders);
		table
			.arrival
			.iter()
			.filter_map(|id| table.by_id.get(id))
			.filter(|order| order.user_id == user_id && market.is_none_or(|m| order.market == m))
			.cloned()
			.collect()
	}

	pub fn fills(&self) -> Vec<Fill> {
		lock(&self.fills).clone()
	}

	/// A user's fills in persisted order, optionally for one market
	pub fn fills_for_user(&self, user_id: &str, market: Option<&str>) -> Vec<Fill> {
		lock(&self.fills)
			.iter()
			.filter(|fill| fill.user_id == user_id && market.is_none_or(|m| fill.market == m))
			.cloned()
			.collect()
	}

	pub fn trades(&self) -> Vec<Trade> {
		lock(&self.trades).clone()
	}

	/// Most recent trades of a market, newest first
	pub fn trades_for_market(&self, market: &str, limit: usize) -> Vec<Trade> {
		lock(&self.trades)
			.iter()
			.rev()
			.filter(|trade| trade.market == market)
			.take(limit)
			.cloned()
			.collect()
	}

	pub fn get_position(
		&self,
		user_id: &str,
		market: &str,
		side: ContractSide,
	) -> Option<Position> {
		lock(&self.positions)
			.get(&(user_id.to_string(), market.to_string(), side))
			.cloned()
	}

	pub fn position_count(&self) -> usize {
		lock(&self.positions).len()
	}
}

impl OrderStore for MemoryOrderStore {
	fn persist_order(&self, order: &Order) -> Result<(), StoreError> {
		let mut table = lock(&self.orders);
		let stale = table
			.by_id
			.get(&order.order_id)
			.map(|existing| is_stale(existing, order));
		match stale {
			Some(true) => {}
			Some(false) => {
				table.by_id.insert(order.order_id.clone(), order.clone());
			}
			None => {
				table.by_id.insert(order.order_id.clone(), order.clone());
				table.arrival.push(order.order_id.clone());
			}
		}
		Ok(())
	}

	fn persist_fill(&self, fill: &Fill) -> Result<(), StoreError> {
		lock(&self.fills).push(fill.clone());
		Ok(())
	}

	fn persist_trade(&self, trade: &Trade) -> Result<(), StoreError> {
		lock(&self.trades).push(trade.clone());
		Ok(())
	}

	fn persist_position(&self, position: &Position) -> Result<(), StoreError> {
		let key = (
			position.user_id.clone(),
			position.market.clone(),
			position.side,
		);
		lock(&self.positions).insert(key, position.clone());
		Ok(())
	}

	fn open_orders(&self, market: &str) -> Result<Vec<Order>, StoreError> {
		let table = lock(&self.orders);
		Ok(table
			.arrival
			.iter()
			.filter_map(|id| table.by_id.get(id))
			.filter(|order| {
				order.market == market
					&& matches!(order.status, OrderStatus::Open | OrderStatus::PartiallyFilled)
			})
			.cloned()
			.collect())
	}
}

/// Records from concurrent submits can arrive out of order; a terminal
/// record or one with more fills is never overwritten by an older one.
fn is_stale(existing: &Order, incoming: &Order) -> bool {
	matches!(existing.status, OrderStatus::Filled | OrderStatus::Canceled)
		|| existing.filled_quantity > incoming.filled_quantity
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
