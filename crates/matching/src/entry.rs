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

use oddsbook_sdk::types::{Action, ContractSide, Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Lowest valid limit price in cents
pub const MIN_PRICE: u32 = 1;
/// Highest valid limit price in cents
pub const MAX_PRICE: u32 = 99;
/// Payout of a winning contract; a NO at P is a YES at `PAYOUT - P`
pub const PAYOUT: u32 = 100;
/// Largest order size in contracts
///
/// Keeps every `price * quantity` product and signed position arithmetic
/// well inside 64 bits.
pub const MAX_QUANTITY: u64 = 1_000_000_000;

/// Error types for order entry construction
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum EntryError {
	#[error("Price must be between 1 and 99 cents, got: {0}")]
	InvalidPrice(u32),
	#[error("Quantity must be between 1 and 1000000000, got: {0}")]
	InvalidQuantity(u64),
}

/// Map an original (side, action, price) onto the unified YES book
///
/// Returns `(normalized_price, normalized_is_buy)`:
///
/// | side | action | price   | is_buy |
/// |------|--------|---------|--------|
/// | YES  | BUY    | P       | true   |
/// | YES  | SELL   | P       | false  |
/// | NO   | BUY    | 100 - P | false  |
/// | NO   | SELL   | 100 - P | true   |
pub fn normalize(
	side: ContractSide,
	action: Action,
	price: u32,
) -> Result<(u32, bool), EntryError> {
	if !(MIN_PRICE..=MAX_PRICE).contains(&price) {
		return Err(EntryError::InvalidPrice(price));
	}

	let is_buy = action == Action::Buy;
	Ok(match side {
		ContractSide::Yes => (price, is_buy),
		ContractSide::No => (PAYOUT - price, !is_buy),
	})
}

/// Express a normalized YES price in the given contract's frame
pub fn price_in_frame(normalized_price: u32, side: ContractSide) -> u32 {
	match side {
		ContractSide::Yes => normalized_price,
		ContractSide::No => PAYOUT - normalized_price,
	}
}

/// One order as it lives in (or is about to enter) an order book
///
/// The original side, action, price and quantity never change. Only
/// `quantity` (the remaining size) moves, and only downward, through
/// [`OrderEntry::fill`], which is reachable from the matcher and the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
	order_id: String,
	user_id: String,
	side: ContractSide,
	action: Action,
	price: u32,
	original_quantity: u64,
	quantity: u64,
	/// FIFO tie-breaker, assigned by the book on insertion (0 = not yet in a book)
	sequence: u64,
	timestamp: u64,
	normalized_price: u32,
	normalized_is_buy: bool,
	/// Sum of `own-frame price * qty` over all fills
	fill_notional: u64,
}

impl OrderEntry {
	/// Create a new entry, validating price and quantity
	pub fn new(
		order_id: impl Into<String>,
		user_id: impl Into<String>,
		side: ContractSide,
		action: Action,
		price: u32,
		quantity: u64,
		timestamp: u64,
	) -> Result<Self, EntryError> {
		let (normalized_price, normalized_is_buy) = normalize(side, action, price)?;
		if !(1..=MAX_QUANTITY).contains(&quantity) {
			return Err(EntryError::InvalidQuantity(quantity));
		}

		Ok(Self {
			order_id: order_id.into(),
			user_id: user_id.into(),
			side,
			action,
			price,
			original_quantity: quantity,
			quantity,
			sequence: 0,
			timestamp,
			normalized_price,
			normalized_is_buy,
			fill_notional: 0,
		})
	}

	/// Rebuild a resting entry from a persisted order record
	///
	/// Used when warming a book from the store; prior fills are carried over
	/// so filled quantity and average fill price stay correct.
	pub fn from_record(order: &Order) -> Result<Self, EntryError> {
		if order.remaining_quantity == 0 || order.remaining_quantity > order.quantity {
			return Err(EntryError::InvalidQuantity(order.remaining_quantity));
		}

		let mut entry = Self::new(
			order.order_id.clone(),
			order.user_id.clone(),
			order.side,
			order.action,
			order.price,
			order.quantity,
			order.created_time,
		)?;
		let filled = order.quantity - order.remaining_quantity;
		entry.quantity = order.remaining_quantity;
		entry.fill_notional = order.avg_fill_price.unwrap_or(order.price) as u64 * filled;
		Ok(entry)
	}

	pub fn order_id(&self) -> &str {
		&self.order_id
	}

	pub fn user_id(&self) -> &str {
		&self.user_id
	}

	pub fn side(&self) -> ContractSide {
		self.side
	}

	pub fn action(&self) -> Action {
		self.action
	}

	/// Original limit price in the order's own frame
	pub fn price(&self) -> u32 {
		self.price
	}

	pub fn original_quantity(&self) -> u64 {
		self.original_quantity
	}

	/// Remaining quantity
	pub fn quantity(&self) -> u64 {
		self.quantity
	}

	pub fn filled_quantity(&self) -> u64 {
		self.original_quantity - self.quantity
	}

	pub fn sequence(&self) -> u64 {
		self.sequence
	}

	pub fn timestamp(&self) -> u64 {
		self.timestamp
	}

	pub fn normalized_price(&self) -> u32 {
		self.normalized_price
	}

	pub fn normalized_is_buy(&self) -> bool {
		self.normalized_is_buy
	}

	/// Quantity-weighted average fill price in the order's own frame
	pub fn avg_fill_price(&self) -> Option<u32> {
		let filled = self.filled_quantity();
		(filled > 0).then(|| (self.fill_notional / filled) as u32)
	}

	/// Status derived from fill progress (never `Canceled`)
	pub fn status(&self) -> OrderStatus {
		OrderStatus::from_fill(self.filled_quantity(), self.quantity)
	}

	/// Reduce remaining quantity by an execution at `normalized_price`
	///
	/// # Panics
	///
	/// Panics if `quantity` exceeds the remaining quantity. The matcher never
	/// requests more than what rests, so this only fires on a broken invariant.
	pub(crate) fn fill(&mut self, quantity: u64, normalized_price: u32) {
		assert!(
			quantity <= self.quantity,
			"insufficient quantity on order {}: requested {}, remaining {}",
			self.order_id,
			quantity,
			self.quantity
		);
		self.quantity -= quantity;
		self.fill_notional += price_in_frame(normalized_price, self.side) as u64 * quantity;
	}

	pub(crate) fn assign_sequence(&mut self, sequence: u64) {
		self.sequence = sequence;
	}

	/// Build the persisted order record for this entry
	pub fn to_order(&self, market: &str, status: OrderStatus, updated_time: u64) -> Order {
		let remaining_quantity = match status {
			OrderStatus::Canceled => 0,
			_ => self.quantity,
		};
		Order {
			order_id: self.order_id.clone(),
			user_id: self.user_id.clone(),
			market: market.to_string(),
			side: self.side,
			action: self.action,
			price: self.price,
			quantity: self.original_quantity,
			filled_quantity: self.filled_quantity(),
			remaining_quantity,
			avg_fill_price: self.avg_fill_price(),
			status,
			created_time: self.timestamp,
			updated_time,
		}
	}
}
