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

//! Oddsbook Matching Engine
//!
//! Order book, matching engine and position ledger for binary-outcome
//! (YES/NO) markets.
//!
//! Architecture:
//! - One unified book per market: a NO order at P rests as a YES order at
//!   100 - P on the opposite side, so YES and NO liquidity match each other
//! - Stateless price-time priority matcher over that book
//! - One read-write lock per market; markets never lock each other
//! - Weighted-average-cost position ledger fed by fills
//! - Bounded event buffer and background writer for persistence hand-off

pub mod catalog;
pub mod config;
pub mod entry;
pub mod event;
pub mod exchange;
pub mod listener;
pub mod logging;
pub mod matcher;
pub mod orderbook;
pub mod position;
pub mod types;

pub use catalog::{Market, MarketCatalog, MarketStatus};
pub use entry::{EntryError, MAX_QUANTITY, OrderEntry, normalize};
pub use event::{
	EventBuffer, EventConsumer, EventProducer, EventWriter, EventWriterConfig, ExchangeEvent,
	MemoryOrderStore, OrderStore, StoreError,
};
pub use exchange::{EngineConfig, Exchange};
pub use listener::{BookEvent, ChannelListener, OrderBookListener};
pub use matcher::{Execution, MatchingEngine};
pub use orderbook::{BookSide, OrderBook, PriceLevel};
pub use position::{PositionLedger, unrealized_pnl};
pub use types::*;
