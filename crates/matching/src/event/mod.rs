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

mod buffer;
mod store;
mod writer;

use oddsbook_sdk::types::{Fill, Order, Position, Trade};
use serde::{Deserialize, Serialize};

pub use buffer::{EventBuffer, EventBufferError, EventConsumer, EventProducer};
pub use store::{MemoryOrderStore, OrderStore, StoreError};
pub use writer::{EventWriter, EventWriterConfig};

/// State changes handed from the exchange to the persistence collaborator
///
/// Each event carries the full record to upsert or append. Events are
/// produced after the market lock is released and are persisted in the
/// order they were pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeEvent {
	/// New or updated order record (open, partially filled, filled, canceled)
	OrderUpdated(Order),
	/// Public trade tape entry
	TradeExecuted(Trade),
	/// One participant's side of an execution
	FillCreated(Fill),
	/// Position row after a fill was applied
	PositionUpdated(Position),
}

impl ExchangeEvent {
	/// Get the market associated with this event
	pub fn market(&self) -> &str {
		match self {
			ExchangeEvent::OrderUpdated(order) => &order.market,
			ExchangeEvent::TradeExecuted(trade) => &trade.market,
			ExchangeEvent::FillCreated(fill) => &fill.market,
			ExchangeEvent::PositionUpdated(position) => &position.market,
		}
	}

	/// Short name used in log fields
	pub fn kind(&self) -> &'static str {
		match self {
			ExchangeEvent::OrderUpdated(_) => "order",
			ExchangeEvent::TradeExecuted(_) => "trade",
			ExchangeEvent::FillCreated(_) => "fill",
			ExchangeEvent::PositionUpdated(_) => "position",
		}
	}

	/// Route this event to the matching store method
	pub fn persist(&self, store: &dyn OrderStore) -> Result<(), StoreError> {
		match self {
			ExchangeEvent::OrderUpdated(order) => store.persist_order(order),
			ExchangeEvent::TradeExecuted(trade) => store.persist_trade(trade),
			ExchangeEvent::FillCreated(fill) => store.persist_fill(fill),
			ExchangeEvent::PositionUpdated(position) => store.persist_position(position),
		}
	}
}
