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
	sync::{PoisonError, RwLock},
};

use oddsbook_sdk::types::{Action, ContractSide, Fill, Position};
use tracing::debug;

use crate::{
	entry::{PAYOUT, price_in_frame},
	types::now_millis,
};

type PositionKey = (String, String, ContractSide);

/// Weighted-average-cost positions per (user, market, side)
///
/// Cost basis is signed and carries the sign of the quantity, so the
/// unrealized P&L formula `quantity * price - total_cost` holds for both
/// long and short rows. Rows are never deleted; a closed position keeps its
/// realized P&L with a zero quantity.
pub struct PositionLedger {
	positions: RwLock<HashMap<PositionKey, Position>>,
}

impl PositionLedger {
	pub fn new() -> Self {
		Self {
			positions: RwLock::new(HashMap::new()),
		}
	}

	/// Apply a signed quantity change at `price` and return the updated row
	///
	/// - new row: opened at `price`
	/// - result is flat: cost and average reset, P&L realized
	/// - same direction: cost grows, average re-weighted (truncating)
	/// - partial reduction: cost shrinks pro rata, average unchanged
	/// - flip: re-established at `price` for the overshoot
	pub fn update_position(
		&self,
		user_id: &str,
		market: &str,
		side: ContractSide,
		quantity_change: i64,
		price: u32,
	) -> Position {
		let mut positions = self.positions.write().unwrap_or_else(PoisonError::into_inner);
		let key = (user_id.to_string(), market.to_string(), side);
		let now = now_millis();

		let position = positions.entry(key).or_insert_with(|| Position {
			user_id: user_id.to_string(),
			market: market.to_string(),
			side,
			quantity: 0,
			avg_price: 0,
			total_cost: 0,
			realized_pnl: 0,
			updated_time: now,
		});
		apply_change(position, quantity_change, price);
		position.updated_time = now;

		debug!(
			target: "position",
			user_id,
			market,
			side = %side,
			quantity = position.quantity,
			avg_price = position.avg_price,
			"Position updated"
		);
		position.clone()
	}

	/// Update the participant's position from one fill
	///
	/// Buys add to the row, sells subtract from it.
	pub fn apply_fill(&self, fill: &Fill) -> Position {
		let count = i64::try_from(fill.count).unwrap_or(i64::MAX);
		let change = match fill.action {
			Action::Buy => count,
			Action::Sell => -count,
		};
		self.update_position(&fill.user_id, &fill.market, fill.side, change, fill.price)
	}

	/// Flatten a position at `closing_price`
	///
	/// Returns `None` if the row does not exist.
	pub fn close_position(
		&self,
		user_id: &str,
		market: &str,
		side: ContractSide,
		closing_price: u32,
	) -> Option<Position> {
		let current = self.get_position(user_id, market, side)?;
		Some(self.update_position(user_id, market, side, -current.quantity, closing_price))
	}

	pub fn get_position(
		&self,
		user_id: &str,
		market: &str,
		side: ContractSide,
	) -> Option<Position> {
		let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
		positions
			.get(&(user_id.to_string(), market.to_string(), side))
			.cloned()
	}

	/// Open rows for a user, ordered by market then side
	pub fn positions_for_user(&self, user_id: &str) -> Vec<Position> {
		let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
		let mut rows: Vec<Position> = positions
			.values()
			.filter(|p| p.user_id == user_id && p.is_open())
			.cloned()
			.collect();
		rows.sort_by(|a, b| a.market.cmp(&b.market).then(a.side.cmp(&b.side)));
		rows
	}

	/// Mark-to-market value of a user's open rows
	///
	/// `yes_prices` maps market to its current YES price; NO rows are valued
	/// at the complement. Markets without a price contribute nothing.
	pub fn portfolio_value(&self, user_id: &str, yes_prices: &HashMap<String, u32>) -> i64 {
		self.positions_for_user(user_id)
			.iter()
			.filter_map(|p| {
				let yes_price = *yes_prices.get(&p.market)?;
				Some(p.quantity * price_in_frame(yes_price, p.side) as i64)
			})
			.sum()
	}

	/// Number of rows, open or closed
	pub fn len(&self) -> usize {
		self.positions.read().unwrap_or_else(PoisonError::into_inner).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Default for PositionLedger {
	fn default() -> Self {
		Self::new()
	}
}

/// `quantity * current_price - total_cost`
pub fn unrealized_pnl(position: &Position, current_price: u32) -> i64 {
	if position.quantity == 0 {
		return 0;
	}
	position
		.quantity
		.saturating_mul(current_price as i64)
		.saturating_sub(position.total_cost)
}

/// Apply one change to a row
///
/// Arithmetic runs in `i128`; results past the `i64` range saturate.
fn apply_change(position: &mut Position, change: i64, price: u32) {
	debug_assert!(price <= PAYOUT);
	let current = position.quantity as i128;
	let change = change as i128;
	let new_quantity = current + change;
	let price = price as i128;
	let total_cost = position.total_cost as i128;
	let mut realized = position.realized_pnl as i128;

	let (total, avg) = if current == 0 {
		let avg = if new_quantity == 0 { 0 } else { price };
		(change * price, avg)
	} else if new_quantity == 0 {
		realized += current * price - total_cost;
		(0, 0)
	} else if new_quantity.signum() == current.signum() && new_quantity.abs() > current.abs() {
		let total = total_cost + change * price;
		(total, total.abs() / new_quantity.abs())
	} else if new_quantity.signum() == current.signum() {
		let new_total = total_cost * new_quantity.abs() / current.abs();
		realized += (current - new_quantity) * price - (total_cost - new_total);
		(new_total, position.avg_price as i128)
	} else {
		realized += current * price - total_cost;
		(new_quantity * price, price)
	};

	position.quantity = saturate(new_quantity);
	position.total_cost = saturate(total);
	position.realized_pnl = saturate(realized);
	position.avg_price = u32::try_from(avg).unwrap_or(PAYOUT);
}

fn saturate(value: i128) -> i64 {
	i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}
