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

use oddsbook_sdk::types::{Action, ContractSide, SubmitOrderRequest};

pub const BENCH_MARKET: &str = "BENCH-MARKET";

#[derive(Clone, Copy)]
pub enum Scenario {
	/// Bids below 50 and asks above it; nothing ever trades
	NoCross,
	/// YES and NO buyers at the same complementary price
	CrossHeavy,
	/// Deep two-sided book with an occasional sweep across many levels
	DeepBook,
}

pub struct OrderGenerator {
	thread_id: usize,
	counter: u64,
	scenario: Scenario,
}

impl OrderGenerator {
	pub fn new(thread_id: usize, scenario: Scenario) -> Self {
		Self {
			thread_id,
			counter: 0,
			scenario,
		}
	}

	pub fn next_order(&mut self) -> SubmitOrderRequest {
		self.counter += 1;
		let user = format!("bench_{}", self.thread_id);
		let even = self.counter.is_multiple_of(2);

		match self.scenario {
			Scenario::NoCross => {
				let offset = (self.counter % 20) as u32;
				if even {
					request(user, ContractSide::Yes, Action::Buy, 25 + offset, 1)
				} else {
					// Buy NO at 45 - offset rests as a YES ask at 55 + offset
					request(user, ContractSide::No, Action::Buy, 45 - offset, 1)
				}
			}
			Scenario::CrossHeavy => {
				let side = if even {
					ContractSide::Yes
				} else {
					ContractSide::No
				};
				request(user, side, Action::Buy, 50, 10)
			}
			Scenario::DeepBook => {
				if self.counter.is_multiple_of(100) {
					// Sweep with the most aggressive limit allowed
					if (self.counter / 100).is_multiple_of(2) {
						request(user, ContractSide::Yes, Action::Buy, 99, 5_000)
					} else {
						request(user, ContractSide::Yes, Action::Sell, 1, 5_000)
					}
				} else {
					let level = (self.counter % 45) as u32;
					if even {
						request(user, ContractSide::Yes, Action::Buy, 49 - level, 100)
					} else {
						request(user, ContractSide::Yes, Action::Sell, 51 + level, 100)
					}
				}
			}
		}
	}

	pub fn warmup_orders(&self, count: usize) -> Vec<SubmitOrderRequest> {
		// Two-sided, non-crossing depth around 50
		(0..count)
			.map(|i| {
				let level = ((i / 2) % 45) as u32;
				if i.is_multiple_of(2) {
					request("warmup".to_string(), ContractSide::Yes, Action::Buy, 49 - level, 100)
				} else {
					request("warmup".to_string(), ContractSide::No, Action::Buy, 49 - level, 100)
				}
			})
			.collect()
	}
}

fn request(
	user_id: String,
	side: ContractSide,
	action: Action,
	price: u32,
	quantity: u64,
) -> SubmitOrderRequest {
	SubmitOrderRequest {
		market: BENCH_MARKET.to_string(),
		user_id,
		side,
		action,
		price: Some(price),
		quantity,
	}
}
