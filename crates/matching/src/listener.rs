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

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entry::OrderEntry;

/// Observer of order book mutations
///
/// Callbacks run synchronously inside the book's critical section, while
/// the market's write lock is held. Implementations must return quickly;
/// anything that does I/O or fans out to subscribers has to hand the work
/// off (see [`ChannelListener`]) instead of doing it inline.
///
/// Every method defaults to a no-op so listeners only implement what they
/// care about.
pub trait OrderBookListener: Send + Sync {
	fn on_order_added(&self, _market: &str, _entry: &OrderEntry) {}

	fn on_order_canceled(&self, _market: &str, _entry: &OrderEntry) {}

	/// `entry` reflects the resting order after the execution was applied
	fn on_order_executed(&self, _market: &str, _entry: &OrderEntry, _executed_quantity: u64) {}

	/// Diagnostic only; no trade is executed because of it
	fn on_cross_detected(&self, _market: &str, _entry: &OrderEntry) {}
}

/// Book mutation as seen by the broadcast collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookEvent {
	OrderAdded {
		market: String,
		entry: OrderEntry,
	},
	OrderCanceled {
		market: String,
		entry: OrderEntry,
	},
	OrderExecuted {
		market: String,
		entry: OrderEntry,
		executed_quantity: u64,
	},
	CrossDetected {
		market: String,
		entry: OrderEntry,
	},
}

impl BookEvent {
	pub fn market(&self) -> &str {
		match self {
			BookEvent::OrderAdded { market, .. } => market,
			BookEvent::OrderCanceled { market, .. } => market,
			BookEvent::OrderExecuted { market, .. } => market,
			BookEvent::CrossDetected { market, .. } => market,
		}
	}

	pub fn order_id(&self) -> &str {
		match self {
			BookEvent::OrderAdded { entry, .. } => entry.order_id(),
			BookEvent::OrderCanceled { entry, .. } => entry.order_id(),
			BookEvent::OrderExecuted { entry, .. } => entry.order_id(),
			BookEvent::CrossDetected { entry, .. } => entry.order_id(),
		}
	}
}

/// Listener that forwards book events into a bounded channel
///
/// Sending never blocks the book: when the channel is full or the receiver
/// is gone the event is dropped and a warning is logged.
pub struct ChannelListener {
	sender: Sender<BookEvent>,
}

impl ChannelListener {
	/// Create a listener and the receiving end its events flow to
	pub fn new(capacity: usize) -> (Self, Receiver<BookEvent>) {
		let (sender, receiver) = bounded(capacity);
		(Self { sender }, receiver)
	}

	fn forward(&self, event: BookEvent) {
		if let Err(e) = self.sender.try_send(event) {
			let (reason, event) = match e {
				TrySendError::Full(event) => ("full", event),
				TrySendError::Disconnected(event) => ("disconnected", event),
			};
			warn!(
				target: "orderbook",
				market = %event.market(),
				order_id = %event.order_id(),
				reason,
				"Dropped book event"
			);
		}
	}
}

impl OrderBookListener for ChannelListener {
	fn on_order_added(&self, market: &str, entry: &OrderEntry) {
		self.forward(BookEvent::OrderAdded {
			market: market.to_string(),
			entry: entry.clone(),
		});
	}

	fn on_order_canceled(&self, market: &str, entry: &OrderEntry) {
		self.forward(BookEvent::OrderCanceled {
			market: market.to_string(),
			entry: entry.clone(),
		});
	}

	fn on_order_executed(&self, market: &str, entry: &OrderEntry, executed_quantity: u64) {
		self.forward(BookEvent::OrderExecuted {
			market: market.to_string(),
			entry: entry.clone(),
			executed_quantity,
		});
	}

	fn on_cross_detected(&self, market: &str, entry: &OrderEntry) {
		self.forward(BookEvent::CrossDetected {
			market: market.to_string(),
			entry: entry.clone(),
		});
	}
}
