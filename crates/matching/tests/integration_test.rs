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

use std::{collections::HashMap, sync::Arc, thread};

use oddsbook_matching::{
	BookEvent, ChannelListener, EngineConfig, EventBuffer, EventConsumer, EventWriter,
	EventWriterConfig, Exchange, MatchingEngine, MemoryOrderStore, OrderBook, OrderEntry,
};
use oddsbook_sdk::types::{
	Action, ContractSide, OrderStatus, PriceLevelView, SubmitOrderRequest,
};

const MARKET: &str = "TEST-MARKET";

fn create_test_exchange(markets: &[&str]) -> (Arc<Exchange>, EventConsumer) {
	let (producer, consumer) = EventBuffer::new(100_000).split();
	let exchange = Exchange::new(
		Arc::new(MemoryOrderStore::new()),
		producer,
		EngineConfig::default(),
	);
	for market in markets {
		exchange.create_market(market).unwrap();
	}
	(Arc::new(exchange), consumer)
}

fn create_test_request(
	market: &str,
	user: &str,
	side: ContractSide,
	action: Action,
	price: u32,
	qty: u64,
) -> SubmitOrderRequest {
	SubmitOrderRequest {
		market: market.to_string(),
		user_id: user.to_string(),
		side,
		action,
		price: Some(price),
		quantity: qty,
	}
}

fn create_test_entry(
	order_id: &str,
	side: ContractSide,
	action: Action,
	price: u32,
	qty: u64,
) -> OrderEntry {
	OrderEntry::new(order_id, "user", side, action, price, qty, 1000).unwrap()
}

#[test]
fn test_buy_no_rests_as_yes_ask() {
	let (exchange, _events) = create_test_exchange(&[MARKET]);

	exchange
		.submit_order(create_test_request(MARKET, "u", ContractSide::No, Action::Buy, 35, 100))
		.unwrap();

	assert_eq!(exchange.best_ask(MARKET).unwrap(), Some(PriceLevelView(65, 100)));
	assert_eq!(exchange.best_bid(MARKET).unwrap(), None);
}

#[test]
fn test_single_match_empties_book() {
	let engine = MatchingEngine::new();
	let mut book = OrderBook::new(MARKET);
	book.add_order(create_test_entry("bid", ContractSide::Yes, Action::Buy, 65, 100));

	let mut sell = create_test_entry("sell", ContractSide::Yes, Action::Sell, 65, 100);
	let executions = engine.match_order(&mut sell, &mut book);

	assert_eq!(executions.len(), 1);
	assert_eq!(executions[0].quantity, 100);
	assert_eq!(executions[0].execution_price, 65);
	assert_eq!(book.best_bid(), None);
	assert_eq!(book.best_ask(), None);
}

#[test]
fn test_fifo_partial_fill() {
	let engine = MatchingEngine::new();
	let mut book = OrderBook::new(MARKET);
	book.add_order(create_test_entry("seq1", ContractSide::Yes, Action::Buy, 65, 50));
	book.add_order(create_test_entry("seq2", ContractSide::Yes, Action::Buy, 65, 50));

	let mut sell = create_test_entry("sell", ContractSide::Yes, Action::Sell, 65, 60);
	let executions = engine.match_order(&mut sell, &mut book);

	assert_eq!(executions.len(), 2);
	assert_eq!(executions[0].passive.order_id(), "seq1");
	assert_eq!(executions[0].quantity, 50);
	assert_eq!(executions[1].passive.order_id(), "seq2");
	assert_eq!(executions[1].quantity, 10);
	assert_eq!(book.get_order("seq2").unwrap().quantity(), 40);
	assert!(book.get_order("seq1").is_none());
}

#[test]
fn test_no_buyer_matches_yes_buyer_through_pipeline() {
	let (exchange, _events) = create_test_exchange(&[MARKET]);

	exchange
		.submit_order(create_test_request(MARKET, "yes", ContractSide::Yes, Action::Buy, 65, 100))
		.unwrap();
	let response = exchange
		.submit_order(create_test_request(MARKET, "no", ContractSide::No, Action::Buy, 40, 100))
		.unwrap();

	assert_eq!(response.status, OrderStatus::Filled);
	assert_eq!(response.filled_quantity, 100);
	// 65 YES is 35 NO; the NO buyer paid less than its 40 limit
	assert_eq!(response.avg_fill_price, Some(35));
	assert_eq!(exchange.best_bid(MARKET).unwrap(), None);
	assert_eq!(exchange.best_ask(MARKET).unwrap(), None);

	let yes = exchange.get_position("yes", MARKET, ContractSide::Yes).unwrap();
	let no = exchange.get_position("no", MARKET, ContractSide::No).unwrap();
	assert_eq!((yes.quantity, yes.avg_price), (100, 65));
	assert_eq!((no.quantity, no.avg_price), (100, 35));
}

#[test]
fn test_fifo_survives_interleaved_cancels() {
	let (exchange, _events) = create_test_exchange(&[MARKET]);

	let mut ids = Vec::new();
	for i in 0..5 {
		let response = exchange
			.submit_order(create_test_request(
				MARKET,
				&format!("maker{}", i),
				ContractSide::Yes,
				Action::Sell,
				60,
				10,
			))
			.unwrap();
		ids.push(response.order_id);
		// Unrelated liquidity elsewhere in the book
		let request = create_test_request(MARKET, "noise", ContractSide::Yes, Action::Buy, 40, 1);
		exchange.submit_order(request).unwrap();
	}
	exchange.cancel_order(&ids[1]).unwrap();
	exchange.cancel_order(&ids[3]).unwrap();

	exchange
		.submit_order(create_test_request(MARKET, "taker", ContractSide::Yes, Action::Buy, 60, 25))
		.unwrap();

	assert!(exchange.get_order(&ids[0]).is_none());
	assert!(exchange.get_order(&ids[2]).is_none());
	assert_eq!(exchange.get_order(&ids[4]).unwrap().remaining_quantity, 5);
	for user in ["maker0", "maker2", "maker4"] {
		assert!(exchange.get_position(user, MARKET, ContractSide::Yes).is_some());
	}
	assert!(exchange.get_position("maker1", MARKET, ContractSide::Yes).is_none());
}

#[test]
fn test_price_priority_across_levels() {
	let (exchange, _events) = create_test_exchange(&[MARKET]);
	for (user, price) in [("a", 58), ("b", 55), ("c", 57)] {
		let request = create_test_request(MARKET, user, ContractSide::Yes, Action::Buy, price, 10);
		exchange.submit_order(request).unwrap();
	}

	// Buy NO 46 is a normalized sell at 54
	let response = exchange
		.submit_order(create_test_request(MARKET, "s", ContractSide::No, Action::Buy, 46, 25))
		.unwrap();
	assert_eq!(response.status, OrderStatus::Filled);

	assert_eq!(exchange.get_position("a", MARKET, ContractSide::Yes).unwrap().quantity, 10);
	assert_eq!(exchange.get_position("c", MARKET, ContractSide::Yes).unwrap().quantity, 10);
	assert_eq!(exchange.get_position("b", MARKET, ContractSide::Yes).unwrap().quantity, 5);
	assert_eq!(exchange.best_bid(MARKET).unwrap(), Some(PriceLevelView(55, 5)));

	// NO frame: 42, 43, 45 across 10/10/5
	let no_buyer = exchange.get_position("s", MARKET, ContractSide::No).unwrap();
	assert_eq!(no_buyer.quantity, 25);
	assert_eq!(response.avg_fill_price, Some((42 * 10 + 43 * 10 + 45 * 5) / 25));
}

#[test]
fn test_idempotent_cancel() {
	let (exchange, _events) = create_test_exchange(&[MARKET]);
	let response = exchange
		.submit_order(create_test_request(MARKET, "u", ContractSide::Yes, Action::Buy, 45, 10))
		.unwrap();
	let before = exchange.orderbook_snapshot(MARKET, 10).unwrap();

	assert!(exchange.cancel_order("ORD-missing").is_err());
	assert_eq!(exchange.orderbook_snapshot(MARKET, 10).unwrap(), before);

	exchange.cancel_order(&response.order_id).unwrap();
	let after = exchange.orderbook_snapshot(MARKET, 10).unwrap();
	assert!(exchange.cancel_order(&response.order_id).is_err());
	assert_eq!(exchange.orderbook_snapshot(MARKET, 10).unwrap(), after);
}

#[test]
fn test_dual_sided_view_through_exchange() {
	let (exchange, _events) = create_test_exchange(&[MARKET]);
	let orders = [
		(ContractSide::Yes, Action::Buy, 45, 100),
		(ContractSide::No, Action::Sell, 45, 250),
		(ContractSide::No, Action::Buy, 40, 200),
		(ContractSide::No, Action::Buy, 30, 50),
		(ContractSide::Yes, Action::Sell, 80, 500),
	];
	for (side, action, price, qty) in orders {
		exchange
			.submit_order(create_test_request(MARKET, "u", side, action, price, qty))
			.unwrap();
	}

	let dual = exchange.dual_sided_snapshot(MARKET, 10).unwrap();
	assert_eq!(dual.yes, vec![PriceLevelView(55, 250), PriceLevelView(45, 100)]);
	assert_eq!(dual.no, vec![PriceLevelView(30, 50), PriceLevelView(40, 200)]);

	let unified = exchange.orderbook_snapshot(MARKET, 10).unwrap();
	assert_eq!(
		unified.asks,
		vec![
			PriceLevelView(60, 200),
			PriceLevelView(70, 50),
			PriceLevelView(80, 500),
		]
	);
}

#[test]
fn test_round_trip_position_closes_flat() {
	let (exchange, _events) = create_test_exchange(&[MARKET]);

	exchange
		.submit_order(create_test_request(MARKET, "mm", ContractSide::Yes, Action::Sell, 60, 100))
		.unwrap();
	let request = create_test_request(MARKET, "trader", ContractSide::Yes, Action::Buy, 60, 100);
	exchange.submit_order(request).unwrap();
	exchange
		.submit_order(create_test_request(MARKET, "mm", ContractSide::Yes, Action::Buy, 70, 100))
		.unwrap();
	let request = create_test_request(MARKET, "trader", ContractSide::Yes, Action::Sell, 70, 100);
	exchange.submit_order(request).unwrap();

	let position = exchange.get_position("trader", MARKET, ContractSide::Yes).unwrap();
	assert_eq!(position.quantity, 0);
	assert_eq!(position.total_cost, 0);
	assert_eq!(position.realized_pnl, 1000);
	assert!(exchange.positions_for_user("trader").is_empty());

	let mm = exchange.get_position("mm", MARKET, ContractSide::Yes).unwrap();
	assert_eq!(mm.quantity, 0);
	assert_eq!(mm.realized_pnl, -1000);
}

#[test]
fn test_book_events_reach_channel_listener() {
	let (exchange, _events) = create_test_exchange(&[MARKET]);
	let (listener, receiver) = ChannelListener::new(100);
	exchange.add_listener(Arc::new(listener));

	let resting = exchange
		.submit_order(create_test_request(MARKET, "u", ContractSide::Yes, Action::Sell, 60, 10))
		.unwrap();
	exchange
		.submit_order(create_test_request(MARKET, "v", ContractSide::No, Action::Sell, 40, 4))
		.unwrap();
	exchange.cancel_order(&resting.order_id).unwrap();

	let events: Vec<BookEvent> = receiver.try_iter().collect();
	assert_eq!(events.len(), 3);
	assert!(matches!(&events[0], BookEvent::OrderAdded { .. }));
	assert!(matches!(
		&events[1],
		BookEvent::OrderExecuted {
			executed_quantity: 4,
			..
		}
	));
	assert!(matches!(&events[2], BookEvent::OrderCanceled { .. }));
	assert!(events.iter().all(|e| e.order_id() == resting.order_id));
}

#[test]
fn test_concurrent_markets() {
	let markets = ["MKT-0", "MKT-1", "MKT-2", "MKT-3"];
	let (exchange, _events) = create_test_exchange(&markets);

	let handles: Vec<_> = markets
		.iter()
		.map(|market| {
			let exchange = exchange.clone();
			let market = market.to_string();
			thread::spawn(move || {
				for i in 0..200u32 {
					let price = 40 + i % 20;
					exchange
						.submit_order(create_test_request(
							&market,
							"maker",
							ContractSide::Yes,
							Action::Sell,
							price,
							5,
						))
						.unwrap();
					exchange
						.submit_order(create_test_request(
							&market,
							"taker",
							ContractSide::No,
							Action::Buy,
							100 - price,
							3,
						))
						.unwrap();
				}
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}

	for market in markets {
		// Buy NO at 100 - P is a YES ask at P as well, so nothing crosses
		assert_eq!(exchange.best_bid(market).unwrap(), None);
		assert_eq!(exchange.order_count(market).unwrap(), 400);
		assert!(exchange.get_position("maker", market, ContractSide::Yes).is_none());
	}
}

#[test]
fn test_concurrent_submits_conserve_quantity() {
	let (exchange, _events) = create_test_exchange(&[MARKET]);
	let threads = 8;
	let per_thread = 250u64;

	let handles: Vec<_> = (0..threads)
		.map(|t| {
			let exchange = exchange.clone();
			thread::spawn(move || {
				let mut filled = 0u64;
				for i in 0..per_thread {
					let (side, action, price) = if (t + i) % 2 == 0 {
						(ContractSide::Yes, Action::Buy, 50)
					} else {
						(ContractSide::No, Action::Buy, 50)
					};
					let response = exchange
						.submit_order(create_test_request(
							MARKET,
							&format!("user{}", t),
							side,
							action,
							price,
							2,
						))
						.unwrap();
					assert_eq!(response.filled_quantity + response.remaining_quantity, 2);
					filled += response.filled_quantity;
				}
				filled
			})
		})
		.collect();
	let taker_filled: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

	let snapshot = exchange.orderbook_snapshot(MARKET, 100).unwrap();
	let resting: u64 = snapshot.levels().iter().map(PriceLevelView::quantity).sum();
	// Each unit filled by a taker also filled one resting unit
	assert_eq!(resting + 2 * taker_filled, threads * per_thread * 2);
	assert!(snapshot.bids.is_empty() || snapshot.asks.is_empty());

	let net: i64 = (0..threads)
		.flat_map(|t| exchange.positions_for_user(&format!("user{}", t)))
		.map(|p| p.quantity)
		.sum();
	assert_eq!(net as u64, 2 * taker_filled);
}

#[test]
fn test_records_reach_store_through_writer() {
	let (producer, consumer) = EventBuffer::new(1_000).split();
	let store = Arc::new(MemoryOrderStore::new());
	let writer = EventWriter::start(consumer, store.clone(), EventWriterConfig::default()).unwrap();
	let exchange = Exchange::new(store.clone(), producer, EngineConfig::default());
	exchange.create_market(MARKET).unwrap();

	let maker = exchange
		.submit_order(create_test_request(MARKET, "maker", ContractSide::Yes, Action::Buy, 65, 100))
		.unwrap();
	let taker = exchange
		.submit_order(create_test_request(MARKET, "taker", ContractSide::No, Action::Buy, 35, 40))
		.unwrap();
	writer.shutdown();

	assert_eq!(store.trades().len(), 1);
	let trade = &store.trades()[0];
	assert_eq!((trade.yes_price, trade.no_price, trade.price), (65, 35, 35));
	assert_eq!(store.fills().len(), 2);
	assert_eq!(store.position_count(), 2);

	let maker_record = store.get_order(&maker.order_id).unwrap();
	assert_eq!(maker_record.status, OrderStatus::PartiallyFilled);
	assert_eq!(maker_record.remaining_quantity, 60);
	assert_eq!(
		store.get_order(&taker.order_id).unwrap().status,
		OrderStatus::Filled
	);

	// A fresh exchange over the same store picks up the resting maker
	let (producer, _consumer) = EventBuffer::new(10).split();
	let restarted = Exchange::new(store, producer, EngineConfig::default());
	assert_eq!(restarted.create_market(MARKET), Ok(1));
	assert_eq!(restarted.best_bid(MARKET).unwrap(), Some(PriceLevelView(65, 60)));

	let mut prices = HashMap::new();
	prices.insert(MARKET.to_string(), 70);
	assert_eq!(exchange.ledger().portfolio_value("taker", &prices), 40 * 30);
}
