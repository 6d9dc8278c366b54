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

//! Exchange service entry point
//!
//! Wires up the components and drives a demo workload:
//! - Market catalog (which books to open)
//! - Order store and event writer (persistence hand-off)
//! - Exchange (books, matcher, position ledger)
//! - Book event listener (broadcast seam)
//! - One simulated order flow per market, run concurrently

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use oddsbook_matching::{
	BookEvent, ChannelListener, EngineConfig, EventBuffer, EventWriter, Exchange, Market,
	MarketCatalog, MemoryOrderStore, config::ExchangeConfig, logging,
};
use oddsbook_sdk::types::{Action, ContractSide, OrderStatus, SubmitOrderRequest};

#[tokio::main]
async fn main() -> Result<()> {
	// Initialize logging first
	logging::init_logging()?;

	let config = ExchangeConfig::from_env().unwrap_or_else(|e| {
		warn!(target: "server", error = %e, "Using default configuration");
		ExchangeConfig::default()
	});

	info!(target: "server", "Starting Oddsbook exchange");
	info!(target: "server", "Markets: {}", config.markets.join(", "));
	info!(target: "server", "Event buffer size: {}", config.event_buffer_size);

	let catalog = MarketCatalog::new();
	for ticker in &config.markets {
		catalog.upsert(Market::new(
			ticker.clone(),
			event_ticker(ticker),
			format!("Will {} resolve YES?", ticker),
		));
	}

	let (event_producer, event_consumer) = EventBuffer::new(config.event_buffer_size).split();
	let store = Arc::new(MemoryOrderStore::new());
	let event_writer = EventWriter::start(
		event_consumer,
		store.clone(),
		config.event_writer_config(),
	)
	.context("Failed to start event writer")?;

	let exchange = Arc::new(Exchange::new(
		store.clone(),
		event_producer,
		EngineConfig {
			verbose_logging: config.verbose_logging,
		},
	));
	let (listener, book_events) = ChannelListener::new(config.event_buffer_size);
	exchange.add_listener(Arc::new(listener));

	for market in catalog.list().into_iter().filter(Market::is_open) {
		exchange.create_market(&market.ticker)?;
	}

	let handles: Vec<_> = exchange
		.markets()
		.into_iter()
		.enumerate()
		.map(|(index, market)| {
			let exchange = exchange.clone();
			let orders = config.simulation_orders_per_market;
			tokio::task::spawn_blocking(move || simulate_market(&exchange, &market, index, orders))
		})
		.collect();

	let simulation = async {
		let mut totals = SimulationStats::default();
		for handle in handles {
			totals.merge(handle.await.context("Simulation task failed")??);
		}
		Ok::<_, anyhow::Error>(totals)
	};

	tokio::select! {
		result = simulation => {
			let totals = result?;
			info!(
				target: "server",
				submitted = totals.submitted,
				filled = totals.filled,
				canceled = totals.canceled,
				rejected = totals.rejected,
				"Simulation complete"
			);
		}
		_ = signal::ctrl_c() => {
			info!(target: "server", "Shutting down...");
		}
	}

	for market in exchange.markets() {
		let snapshot = exchange.orderbook_snapshot(&market, config.snapshot_depth)?;
		let dual = exchange.dual_sided_snapshot(&market, config.snapshot_depth)?;
		println!("{}", serde_json::to_string_pretty(&snapshot)?);
		println!("{}", serde_json::to_string_pretty(&dual)?);
	}

	let mut event_counts: HashMap<&'static str, usize> = HashMap::new();
	for event in book_events.try_iter() {
		*event_counts.entry(book_event_kind(&event)).or_default() += 1;
	}
	info!(target: "server", ?event_counts, "Book events observed");

	// Drains the buffer before returning
	event_writer.shutdown();
	info!(
		target: "server",
		orders = store.order_count(),
		trades = store.trades().len(),
		fills = store.fills().len(),
		positions = store.position_count(),
		"Persisted records"
	);
	for market in exchange.markets() {
		if let Some(last) = store.trades_for_market(&market, 1).first() {
			info!(
				target: "server",
				market = %market,
				yes_price = last.yes_price,
				no_price = last.no_price,
				"Last trade"
			);
		}
	}
	let trader_fills = store.fills_for_user("trader-0", None).len();
	info!(target: "server", trader_fills, "Fills for trader-0");

	info!(target: "server", "Shutdown complete");
	Ok(())
}

#[derive(Debug, Default)]
struct SimulationStats {
	submitted: usize,
	filled: usize,
	canceled: usize,
	rejected: usize,
}

impl SimulationStats {
	fn merge(&mut self, other: SimulationStats) {
		self.submitted += other.submitted;
		self.filled += other.filled;
		self.canceled += other.canceled;
		self.rejected += other.rejected;
	}
}

/// Deterministic two-sided order flow around a drifting fair value
///
/// Every fourth order is a NO order so both contracts trade against the
/// same book; every ninth step cancels the oldest still-resting order.
fn simulate_market(
	exchange: &Exchange,
	market: &str,
	seed: usize,
	orders: usize,
) -> Result<SimulationStats> {
	let mut stats = SimulationStats::default();
	let mut resting = Vec::new();
	let fair = 35 + (seed as u32 * 15) % 30;

	for i in 0..orders {
		let n = i + seed;
		let action = if n % 2 == 0 { Action::Buy } else { Action::Sell };
		let offset = (n % 7) as u32;
		// Buyers bid below fair and sellers ask above, with periodic crossing
		let yes_price = match action {
			Action::Buy => fair + 3 - offset,
			Action::Sell => fair - 3 + offset,
		};
		let (side, price) = if n % 4 == 3 {
			(ContractSide::No, 100 - yes_price)
		} else {
			(ContractSide::Yes, yes_price)
		};
		// A NO order at 100 - P with the opposite action sits where the YES order would
		let action = if side == ContractSide::No {
			match action {
				Action::Buy => Action::Sell,
				Action::Sell => Action::Buy,
			}
		} else {
			action
		};

		let request = SubmitOrderRequest {
			market: market.to_string(),
			user_id: format!("trader-{}", n % 5),
			side,
			action,
			price: Some(price),
			quantity: 1 + (n % 10) as u64,
		};

		match exchange.submit_order(request) {
			Ok(response) => {
				stats.submitted += 1;
				match response.status {
					OrderStatus::Filled => stats.filled += 1,
					_ => resting.push(response.order_id),
				}
			}
			Err(e) => {
				stats.rejected += 1;
				warn!(target: "server", market, error = %e, "Order rejected");
			}
		}

		if i % 9 == 8 && !resting.is_empty() {
			let order_id = resting.remove(0);
			// Already filled orders are simply gone
			if exchange.cancel_order(&order_id).is_ok() {
				stats.canceled += 1;
			}
		}
	}

	info!(
		target: "server",
		market,
		submitted = stats.submitted,
		resting = exchange.order_count(market)?,
		"Market simulation finished"
	);
	Ok(stats)
}

/// `FED-RATE-CUT-DEC` belongs to event `FED-RATE-CUT`
fn event_ticker(ticker: &str) -> String {
	ticker
		.rsplit_once('-')
		.map(|(event, _)| event.to_string())
		.unwrap_or_else(|| ticker.to_string())
}

fn book_event_kind(event: &BookEvent) -> &'static str {
	match event {
		BookEvent::OrderAdded { .. } => "added",
		BookEvent::OrderCanceled { .. } => "canceled",
		BookEvent::OrderExecuted { .. } => "executed",
		BookEvent::CrossDetected { .. } => "cross",
	}
}
