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

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::{DashMap, mapref::entry::Entry};
use oddsbook_sdk::types::{
	ContractSide, DualSidedOrderbook, Order, OrderStatus, OrderbookSnapshot, Position,
	PriceLevelView, SubmitOrderRequest, SubmitOrderResponse,
};
use tracing::{debug, info, warn};

use crate::{
	entry::OrderEntry,
	event::{EventProducer, ExchangeEvent, OrderStore},
	listener::OrderBookListener,
	matcher::{Execution, MatchingEngine},
	orderbook::OrderBook,
	position::PositionLedger,
	types::{ExchangeError, now_millis},
};

/// Exchange configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
	/// Log every accepted order and execution at debug level
	pub verbose_logging: bool,
}

type SharedBook = Arc<RwLock<OrderBook>>;

/// Multi-market exchange service
///
/// Each market has its own book behind its own read-write lock. Submit and
/// cancel take the write lock for the match and the book mutation only;
/// fills reach the position ledger and records reach the persistence
/// buffer after the lock is released. Queries take the read lock and never
/// see a half-applied match.
///
/// Markets are independent: nothing here locks two books at once.
pub struct Exchange {
	markets: DashMap<String, SharedBook>,
	/// Resting order id -> market, for cancel by id
	order_markets: DashMap<String, String>,
	engine: MatchingEngine,
	ledger: PositionLedger,
	events: EventProducer,
	store: Arc<dyn OrderStore>,
	listeners: RwLock<Vec<Arc<dyn OrderBookListener>>>,
	config: EngineConfig,
}

impl Exchange {
	pub fn new(store: Arc<dyn OrderStore>, events: EventProducer, config: EngineConfig) -> Self {
		Self {
			markets: DashMap::new(),
			order_markets: DashMap::new(),
			engine: MatchingEngine::new().with_verbose_logging(config.verbose_logging),
			ledger: PositionLedger::new(),
			events,
			store,
			listeners: RwLock::new(Vec::new()),
			config,
		}
	}

	/// Open a book for `market`, warmed with the store's open orders
	///
	/// Persisted open orders are inserted in their recorded order without
	/// matching. Returns how many were restored.
	pub fn create_market(&self, market: &str) -> Result<usize, ExchangeError> {
		if self.markets.contains_key(market) {
			return Err(ExchangeError::MarketExists(market.to_string()));
		}

		let mut book = OrderBook::new(market);
		let mut restored = Vec::new();
		match self.store.open_orders(market) {
			Ok(orders) => {
				for order in orders {
					match OrderEntry::from_record(&order) {
						Ok(entry) => {
							if book.add_order(entry) {
								restored.push(order.order_id);
							}
						}
						Err(e) => warn!(
							target: "exchange",
							market,
							order_id = %order.order_id,
							error = %e,
							"Skipping unrestorable order"
						),
					}
				}
			}
			Err(e) => warn!(
				target: "exchange",
				market,
				error = %e,
				"Failed to load open orders, starting with an empty book"
			),
		}
		// Held until the book is published so add_listener cannot slip in between
		let listeners = read(&self.listeners);
		for listener in listeners.iter() {
			book.add_listener(listener.clone());
		}

		match self.markets.entry(market.to_string()) {
			Entry::Occupied(_) => return Err(ExchangeError::MarketExists(market.to_string())),
			Entry::Vacant(slot) => {
				for order_id in &restored {
					self.order_markets.insert(order_id.clone(), market.to_string());
				}
				slot.insert(Arc::new(RwLock::new(book)));
			}
		}
		drop(listeners);

		info!(
			target: "exchange",
			market,
			restored = restored.len(),
			"Market opened"
		);
		Ok(restored.len())
	}

	/// Register a listener on every current and future book
	pub fn add_listener(&self, listener: Arc<dyn OrderBookListener>) {
		let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
		for book in self.markets.iter() {
			write(book.value()).add_listener(listener.clone());
		}
		listeners.push(listener);
	}

	/// Match an order and rest any remainder
	///
	/// Pipeline: validate, lock the market, match, insert the remainder,
	/// unlock, then update positions and hand records to the store.
	pub fn submit_order(
		&self,
		request: SubmitOrderRequest,
	) -> Result<SubmitOrderResponse, ExchangeError> {
		let price = request.price.ok_or(ExchangeError::UnpricedOrder)?;
		if request.user_id.is_empty() {
			return Err(ExchangeError::InvalidOrder("user_id is required".to_string()));
		}
		let book = self.book(&request.market)?;

		let order_id = format!("ORD-{}", uuid::Uuid::new_v4());
		let mut entry = OrderEntry::new(
			order_id,
			request.user_id,
			request.side,
			request.action,
			price,
			request.quantity,
			now_millis(),
		)?;

		let executions = {
			let mut book = write(&book);
			if book.get_order(entry.order_id()).is_some() {
				return Err(ExchangeError::DuplicateOrderId(entry.order_id().to_string()));
			}

			let executions = self.engine.match_order(&mut entry, &mut book);
			for execution in &executions {
				if execution.passive.quantity() == 0 {
					self.order_markets.remove(execution.passive.order_id());
				}
			}
			if entry.quantity() > 0 && book.add_order(entry.clone()) {
				self.order_markets
					.insert(entry.order_id().to_string(), request.market.clone());
			}
			executions
		};

		if self.config.verbose_logging {
			debug!(
				target: "exchange",
				market = %request.market,
				order_id = %entry.order_id(),
				side = %entry.side(),
				action = %entry.action(),
				price,
				qty = entry.original_quantity(),
				executions = executions.len(),
				"Order processed"
			);
		}

		let status = entry.status();
		self.publish_results(&request.market, &entry, &executions);

		Ok(SubmitOrderResponse {
			order_id: entry.order_id().to_string(),
			status,
			filled_quantity: entry.filled_quantity(),
			remaining_quantity: entry.quantity(),
			avg_fill_price: entry.avg_fill_price(),
		})
	}

	/// Cancel a resting order by id
	///
	/// Returns the canceled order record; filled quantity and average fill
	/// price are preserved and the remaining quantity is zero.
	pub fn cancel_order(&self, order_id: &str) -> Result<Order, ExchangeError> {
		let market = self
			.order_markets
			.get(order_id)
			.map(|m| m.value().clone())
			.ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;
		let book = self.book(&market)?;

		let entry = {
			let mut book = write(&book);
			let entry = book
				.cancel_order(order_id)
				.ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;
			self.order_markets.remove(order_id);
			entry
		};

		let record = entry.to_order(&market, OrderStatus::Canceled, now_millis());
		info!(
			target: "exchange",
			market = %market,
			order_id,
			filled = record.filled_quantity,
			"Order canceled"
		);
		self.publish(ExchangeEvent::OrderUpdated(record.clone()));
		Ok(record)
	}

	/// Resting order record, if the order is still on a book
	pub fn get_order(&self, order_id: &str) -> Option<Order> {
		let market = self.order_markets.get(order_id)?.value().clone();
		let book = self.markets.get(&market)?.value().clone();
		let book = read(&book);
		let entry = book.get_order(order_id)?;
		Some(entry.to_order(&market, entry.status(), now_millis()))
	}

	pub fn best_bid(&self, market: &str) -> Result<Option<PriceLevelView>, ExchangeError> {
		let book = self.book(market)?;
		Ok(read(&book).best_bid())
	}

	pub fn best_ask(&self, market: &str) -> Result<Option<PriceLevelView>, ExchangeError> {
		let book = self.book(market)?;
		Ok(read(&book).best_ask())
	}

	/// Unified snapshot in the normalized YES frame
	pub fn orderbook_snapshot(
		&self,
		market: &str,
		depth: usize,
	) -> Result<OrderbookSnapshot, ExchangeError> {
		let book = self.book(market)?;
		Ok(read(&book).snapshot(depth))
	}

	/// Separate YES and NO bid views
	pub fn dual_sided_snapshot(
		&self,
		market: &str,
		depth: usize,
	) -> Result<DualSidedOrderbook, ExchangeError> {
		let book = self.book(market)?;
		Ok(read(&book).dual_sided_snapshot(depth))
	}

	/// Number of resting orders in a market
	pub fn order_count(&self, market: &str) -> Result<usize, ExchangeError> {
		let book = self.book(market)?;
		Ok(read(&book).order_count())
	}

	/// Open market ids, sorted
	pub fn markets(&self) -> Vec<String> {
		let mut markets: Vec<String> = self.markets.iter().map(|m| m.key().clone()).collect();
		markets.sort();
		markets
	}

	pub fn ledger(&self) -> &PositionLedger {
		&self.ledger
	}

	pub fn get_position(
		&self,
		user_id: &str,
		market: &str,
		side: ContractSide,
	) -> Option<Position> {
		self.ledger.get_position(user_id, market, side)
	}

	/// Open positions for a user, ordered by market then side
	pub fn positions_for_user(&self, user_id: &str) -> Vec<Position> {
		self.ledger.positions_for_user(user_id)
	}

	fn book(&self, market: &str) -> Result<SharedBook, ExchangeError> {
		self.markets
			.get(market)
			.map(|book| book.value().clone())
			.ok_or_else(|| ExchangeError::MarketNotFound(market.to_string()))
	}

	/// Update positions and hand every record of one submit to the store
	fn publish_results(&self, market: &str, entry: &OrderEntry, executions: &[Execution]) {
		let now = now_millis();
		self.publish(ExchangeEvent::OrderUpdated(
			entry.to_order(market, entry.status(), now),
		));
		for execution in executions {
			let passive = &execution.passive;
			self.publish(ExchangeEvent::OrderUpdated(
				passive.to_order(market, passive.status(), now),
			));
		}

		for trade in MatchingEngine::executions_to_trades(executions, market) {
			self.publish(ExchangeEvent::TradeExecuted(trade));
		}
		for fill in MatchingEngine::executions_to_fills(executions, market) {
			let position = self.ledger.apply_fill(&fill);
			self.publish(ExchangeEvent::FillCreated(fill));
			self.publish(ExchangeEvent::PositionUpdated(position));
		}
	}

	/// Fire-and-forget hand-off; a refused event is logged and dropped
	fn publish(&self, event: ExchangeEvent) {
		let kind = event.kind();
		if let Err(e) = self.events.push(event) {
			warn!(target: "exchange", kind, error = %e, "Dropped exchange event");
		}
	}
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
	lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
	lock.write().unwrap_or_else(PoisonError::into_inner)
}
