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
	cmp::Reverse,
	collections::{BTreeMap, HashMap, VecDeque},
	sync::Arc,
};

use oddsbook_sdk::types::{
	Action, ContractSide, DualSidedOrderbook, OrderbookSnapshot, PriceLevelView,
};
use tracing::debug;

use crate::{
	entry::{OrderEntry, PAYOUT},
	listener::OrderBookListener,
};

/// Side of the normalized book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
	Bid,
	Ask,
}

impl BookSide {
	pub fn opposite(self) -> Self {
		match self {
			BookSide::Bid => BookSide::Ask,
			BookSide::Ask => BookSide::Bid,
		}
	}
}

/// Price level in the order book
///
/// Holds the ids of all orders resting at one normalized price, in
/// insertion-sequence (FIFO) order. The entries themselves live in the
/// book's order index.
#[derive(Debug, Clone)]
pub struct PriceLevel {
	price: u32,
	orders: VecDeque<String>,
	/// Total remaining quantity of all orders at this level
	total_quantity: u64,
	/// Resting native Buy NO orders at this level
	native_no_bids: usize,
}

impl PriceLevel {
	fn new(price: u32) -> Self {
		Self {
			price,
			orders: VecDeque::new(),
			total_quantity: 0,
			native_no_bids: 0,
		}
	}

	pub fn price(&self) -> u32 {
		self.price
	}

	pub fn total_quantity(&self) -> u64 {
		self.total_quantity
	}

	pub fn order_count(&self) -> usize {
		self.orders.len()
	}

	pub fn is_empty(&self) -> bool {
		self.orders.is_empty()
	}

	/// Order ids front (oldest) to back
	pub fn order_ids(&self) -> impl Iterator<Item = &str> {
		self.orders.iter().map(String::as_str)
	}

	fn view(&self) -> PriceLevelView {
		PriceLevelView(self.price, self.total_quantity)
	}
}

/// Limit order book for one binary-outcome market
///
/// Both contracts share a single price axis: every order is stored at its
/// normalized YES price on the bid or ask side (see [`crate::entry::normalize`]).
///
/// - Bids: highest price first (`Reverse` keys)
/// - Asks: lowest price first
/// - Order index: `order_id -> OrderEntry`; the book is the only owner of
///   entries and the only place their quantity is reduced
/// - Sequence counter: strictly increasing across the book's lifetime,
///   assigned on insertion for FIFO tie-breaks
///
/// The book itself is not synchronized. The exchange wraps each book in a
/// read-write lock so that mutations are exclusive and reads see a
/// consistent state.
pub struct OrderBook {
	market: String,
	bids: BTreeMap<Reverse<u32>, PriceLevel>,
	asks: BTreeMap<u32, PriceLevel>,
	orders: HashMap<String, OrderEntry>,
	next_sequence: u64,
	listeners: Vec<Arc<dyn OrderBookListener>>,
}

impl OrderBook {
	/// Create a new order book for a market
	pub fn new(market: impl Into<String>) -> Self {
		Self {
			market: market.into(),
			bids: BTreeMap::new(),
			asks: BTreeMap::new(),
			orders: HashMap::new(),
			next_sequence: 0,
			listeners: Vec::new(),
		}
	}

	/// Get the market identifier
	pub fn market(&self) -> &str {
		&self.market
	}

	pub fn add_listener(&mut self, listener: Arc<dyn OrderBookListener>) {
		self.listeners.push(listener);
	}

	/// Insert a resting order
	///
	/// Returns false without touching the book if the order id is already
	/// present. After insertion, fires `on_order_added` and then, if the
	/// order crosses the opposite side, `on_cross_detected`. Crossing orders
	/// are not executed here.
	pub fn add_order(&mut self, mut entry: OrderEntry) -> bool {
		if self.orders.contains_key(entry.order_id()) {
			return false;
		}

		self.next_sequence += 1;
		entry.assign_sequence(self.next_sequence);

		let price = entry.normalized_price();
		let level = if entry.normalized_is_buy() {
			self.bids
				.entry(Reverse(price))
				.or_insert_with(|| PriceLevel::new(price))
		} else {
			self.asks
				.entry(price)
				.or_insert_with(|| PriceLevel::new(price))
		};
		level.orders.push_back(entry.order_id().to_string());
		level.total_quantity += entry.quantity();
		if is_native_no_bid(&entry) {
			level.native_no_bids += 1;
		}

		let crossed = self.detect_cross(&entry);
		for listener in &self.listeners {
			listener.on_order_added(&self.market, &entry);
		}
		if crossed {
			debug!(
				target: "orderbook",
				market = %self.market,
				order_id = %entry.order_id(),
				price,
				"Cross detected"
			);
			for listener in &self.listeners {
				listener.on_cross_detected(&self.market, &entry);
			}
		}

		self.orders.insert(entry.order_id().to_string(), entry);
		true
	}

	/// Remove a resting order
	///
	/// The rest of its level keeps its FIFO order; an emptied level is
	/// dropped. Returns the removed entry, or `None` if it was not resting.
	pub fn cancel_order(&mut self, order_id: &str) -> Option<OrderEntry> {
		let entry = self.orders.remove(order_id)?;
		let side = Self::side_of(&entry);
		let price = entry.normalized_price();

		if let Some(level) = self.level_mut(side, price) {
			if let Some(pos) = level.orders.iter().position(|id| id == order_id) {
				level.orders.remove(pos);
				level.total_quantity -= entry.quantity();
				if is_native_no_bid(&entry) {
					level.native_no_bids -= 1;
				}
			}
			if level.is_empty() {
				self.remove_level(side, price);
			}
		}

		for listener in &self.listeners {
			listener.on_order_canceled(&self.market, &entry);
		}
		Some(entry)
	}

	/// Look up a resting order
	pub fn get_order(&self, order_id: &str) -> Option<&OrderEntry> {
		self.orders.get(order_id)
	}

	/// Highest bid price and its aggregated quantity
	pub fn best_bid(&self) -> Option<PriceLevelView> {
		self.bids.values().next().map(PriceLevel::view)
	}

	/// Lowest ask price and its aggregated quantity
	pub fn best_ask(&self) -> Option<PriceLevelView> {
		self.asks.values().next().map(PriceLevel::view)
	}

	/// Best price on one side
	pub fn best_price(&self, side: BookSide) -> Option<u32> {
		match side {
			BookSide::Bid => self.bids.keys().next().map(|key| key.0),
			BookSide::Ask => self.asks.keys().next().copied(),
		}
	}

	/// Oldest order at the best level of one side
	pub fn front_order(&self, side: BookSide) -> Option<&OrderEntry> {
		let level = match side {
			BookSide::Bid => self.bids.values().next(),
			BookSide::Ask => self.asks.values().next(),
		}?;
		level.orders.front().and_then(|id| self.orders.get(id))
	}

	/// Level at a price on one side
	pub fn level(&self, side: BookSide, price: u32) -> Option<&PriceLevel> {
		match side {
			BookSide::Bid => self.bids.get(&Reverse(price)),
			BookSide::Ask => self.asks.get(&price),
		}
	}

	/// Execute `quantity` against the oldest order at the best level of `side`
	///
	/// The execution happens at the level's price. The resting order is
	/// reduced, `on_order_executed` fires, and a fully filled order is
	/// dropped from its level and the index; an emptied level is dropped
	/// too. Returns the resting entry as it stands after the execution.
	///
	/// # Panics
	///
	/// Panics if `quantity` exceeds the resting order's remaining quantity.
	pub(crate) fn execute_front(&mut self, side: BookSide, quantity: u64) -> Option<OrderEntry> {
		let level = match side {
			BookSide::Bid => self.bids.first_entry().map(|e| e.into_mut()),
			BookSide::Ask => self.asks.first_entry().map(|e| e.into_mut()),
		}?;
		let price = level.price;
		let order_id = level.orders.front()?.clone();
		let resting = self.orders.get_mut(&order_id)?;

		resting.fill(quantity, price);
		level.total_quantity -= quantity;
		let snapshot = resting.clone();

		if snapshot.quantity() == 0 {
			level.orders.pop_front();
			if is_native_no_bid(&snapshot) {
				level.native_no_bids -= 1;
			}
			self.orders.remove(&order_id);
		}
		if level.is_empty() {
			self.remove_level(side, price);
		}

		for listener in &self.listeners {
			listener.on_order_executed(&self.market, &snapshot, quantity);
		}
		Some(snapshot)
	}

	/// Unified snapshot in the normalized YES frame
	///
	/// Up to `depth` levels per side, quantities aggregated per price.
	pub fn snapshot(&self, depth: usize) -> OrderbookSnapshot {
		OrderbookSnapshot {
			market: self.market.clone(),
			bids: self.bids.values().take(depth).map(PriceLevel::view).collect(),
			asks: self.asks.values().take(depth).map(PriceLevel::view).collect(),
		}
	}

	/// Bid-only views of both contracts
	///
	/// - YES: every normalized buy (Buy YES and Sell NO) at its normalized
	///   price, highest first.
	/// - NO: every native Buy NO at its original NO price, lowest first.
	///
	/// Native YES asks have no NO-bid reading and are left out.
	pub fn dual_sided_snapshot(&self, depth: usize) -> DualSidedOrderbook {
		let yes = self.bids.values().take(depth).map(PriceLevel::view).collect();

		let mut no: Vec<PriceLevelView> = self
			.asks
			.values()
			.filter(|level| level.native_no_bids > 0)
			.filter_map(|level| {
				let quantity: u64 = level
					.orders
					.iter()
					.filter_map(|id| self.orders.get(id))
					.filter(|entry| is_native_no_bid(entry))
					.map(OrderEntry::quantity)
					.sum();
				(quantity > 0).then(|| PriceLevelView(PAYOUT - level.price, quantity))
			})
			.collect();
		no.sort_by_key(PriceLevelView::price);
		no.truncate(depth);

		DualSidedOrderbook {
			market: self.market.clone(),
			yes,
			no,
		}
	}

	/// Whether the best bid is at or above the best ask
	pub fn is_crossed(&self) -> bool {
		match (self.best_price(BookSide::Bid), self.best_price(BookSide::Ask)) {
			(Some(bid), Some(ask)) => bid >= ask,
			_ => false,
		}
	}

	/// Get total number of resting orders
	pub fn order_count(&self) -> usize {
		self.orders.len()
	}

	/// Number of price levels on one side
	pub fn level_count(&self, side: BookSide) -> usize {
		match side {
			BookSide::Bid => self.bids.len(),
			BookSide::Ask => self.asks.len(),
		}
	}

	/// All resting orders, oldest first
	pub fn resting_orders(&self) -> Vec<&OrderEntry> {
		let mut entries: Vec<&OrderEntry> = self.orders.values().collect();
		entries.sort_by_key(|entry| entry.sequence());
		entries
	}

	/// Cross check for a just-inserted entry
	///
	/// Self-cross: the entry meets or passes the best opposite price.
	/// External cross: best YES bid plus best native NO bid exceeds 100.
	fn detect_cross(&self, entry: &OrderEntry) -> bool {
		let opposite = Self::side_of(entry).opposite();
		let self_cross = match (opposite, self.best_price(opposite)) {
			(BookSide::Ask, Some(ask)) => entry.normalized_price() >= ask,
			(BookSide::Bid, Some(bid)) => entry.normalized_price() <= bid,
			_ => false,
		};
		self_cross || self.external_cross()
	}

	fn external_cross(&self) -> bool {
		let Some(yes_bid) = self.best_price(BookSide::Bid) else {
			return false;
		};
		// Lowest ask level holding a native NO bid is the highest NO bid
		let best_no_bid = self
			.asks
			.values()
			.find(|level| level.native_no_bids > 0)
			.map(|level| PAYOUT - level.price);

		matches!(best_no_bid, Some(no_bid) if yes_bid + no_bid > PAYOUT)
	}

	fn side_of(entry: &OrderEntry) -> BookSide {
		if entry.normalized_is_buy() {
			BookSide::Bid
		} else {
			BookSide::Ask
		}
	}

	fn level_mut(&mut self, side: BookSide, price: u32) -> Option<&mut PriceLevel> {
		match side {
			BookSide::Bid => self.bids.get_mut(&Reverse(price)),
			BookSide::Ask => self.asks.get_mut(&price),
		}
	}

	fn remove_level(&mut self, side: BookSide, price: u32) {
		match side {
			BookSide::Bid => self.bids.remove(&Reverse(price)),
			BookSide::Ask => self.asks.remove(&price),
		};
	}
}

fn is_native_no_bid(entry: &OrderEntry) -> bool {
	entry.side() == ContractSide::No && entry.action() == Action::Buy
}
