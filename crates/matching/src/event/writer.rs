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
	io,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};

use tracing::{debug, error, info, warn};

use super::{ExchangeEvent, OrderStore};
use crate::event::buffer::EventConsumer;

/// Configuration for the Event Writer
#[derive(Debug, Clone)]
pub struct EventWriterConfig {
	/// Maximum number of events to batch before committing
	pub batch_size: usize,
	/// Maximum time to wait before committing a partial batch (milliseconds)
	pub batch_timeout_ms: u64,
	/// Whether to log detailed batch information
	pub verbose_logging: bool,
}

impl Default for EventWriterConfig {
	fn default() -> Self {
		Self {
			batch_size: 100,
			batch_timeout_ms: 100,
			verbose_logging: false,
		}
	}
}

/// Event Writer - consumes exchange events and hands them to the store
///
/// Runs on its own thread so persistence never holds up matching. Events
/// are batched by size or timeout and persisted in the order they were
/// pushed. A record the store refuses is logged and skipped; it is neither
/// retried nor rolled back into the in-memory state.
///
/// On shutdown the writer drains whatever is still buffered before the
/// thread exits.
pub struct EventWriter {
	/// Handle to the writer thread
	thread_handle: Option<JoinHandle<()>>,
	/// Shutdown signal
	shutdown: Arc<AtomicBool>,
}

impl EventWriter {
	/// Start the event writer on a background thread
	pub fn start(
		consumer: EventConsumer,
		store: Arc<dyn OrderStore>,
		config: EventWriterConfig,
	) -> io::Result<Self> {
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let thread_handle = thread::Builder::new()
			.name("event-writer".to_string())
			.spawn(move || {
				info!(target: "event_writer", "Event writer started");
				Self::run_writer_loop(&consumer, store.as_ref(), &config, &shutdown_clone);
				info!(target: "event_writer", "Event writer stopped");
			})?;

		Ok(Self {
			thread_handle: Some(thread_handle),
			shutdown,
		})
	}

	/// Main event writer loop
	fn run_writer_loop(
		consumer: &EventConsumer,
		store: &dyn OrderStore,
		config: &EventWriterConfig,
		shutdown: &AtomicBool,
	) {
		let batch_size = config.batch_size.max(1);
		let batch_timeout = Duration::from_millis(config.batch_timeout_ms);
		let mut pending_events = Vec::with_capacity(batch_size);
		let mut last_commit_time = Instant::now();

		loop {
			if shutdown.load(Ordering::Acquire) {
				// Flush everything still buffered before exiting
				loop {
					pending_events.extend(consumer.drain(batch_size));
					if pending_events.is_empty() {
						break;
					}
					let flushed = pending_events.len();
					Self::commit_batch(store, &pending_events);
					pending_events.clear();
					info!(
						target: "event_writer",
						batch_size = flushed,
						"Flushed batch during shutdown"
					);
				}
				break;
			}

			let drained_count = {
				let drained = consumer.drain(batch_size - pending_events.len());
				let count = drained.len();
				pending_events.extend(drained);
				count
			};

			if drained_count > batch_size / 2 && config.verbose_logging {
				debug!(
					target: "event_writer",
					drained = drained_count,
					pending = pending_events.len(),
					"High event buffer pressure"
				);
			}

			let should_commit = pending_events.len() >= batch_size
				|| (!pending_events.is_empty() && last_commit_time.elapsed() >= batch_timeout);

			if should_commit {
				let committed = pending_events.len();
				let start = Instant::now();
				let failed = Self::commit_batch(store, &pending_events);

				if config.verbose_logging {
					debug!(
						target: "event_writer",
						batch_size = committed,
						failed,
						latency_us = start.elapsed().as_micros() as u64,
						"Batch committed"
					);
				} else if committed > 50 {
					info!(
						target: "event_writer",
						batch_size = committed,
						failed,
						latency_us = start.elapsed().as_micros() as u64,
						"Large batch committed"
					);
				}

				pending_events.clear();
				last_commit_time = Instant::now();
			} else if pending_events.is_empty() {
				thread::sleep(Duration::from_millis(5));
			}
		}
	}

	/// Persist a batch in order; returns how many records were refused
	fn commit_batch(store: &dyn OrderStore, events: &[ExchangeEvent]) -> usize {
		let mut failed = 0;
		for event in events {
			if let Err(e) = event.persist(store) {
				failed += 1;
				error!(
					target: "event_writer",
					kind = event.kind(),
					market = %event.market(),
					error = %e,
					"Failed to persist event"
				);
			}
		}
		failed
	}

	/// Shutdown the event writer gracefully
	pub fn shutdown(mut self) {
		info!(target: "event_writer", "Shutting down event writer");
		self.stop();
	}

	fn stop(&mut self) {
		self.shutdown.store(true, Ordering::Release);

		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "event_writer", error = ?e, "Event writer thread panicked");
		}
	}
}

impl Drop for EventWriter {
	fn drop(&mut self) {
		self.stop();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use super::*;
	use crate::event::{EventBuffer, MemoryOrderStore, StoreError};
	use oddsbook_sdk::types::{Action, ContractSide, Fill, Order, Position, Trade};

	fn create_test_event(n: u64) -> ExchangeEvent {
		ExchangeEvent::FillCreated(Fill {
			fill_id: format!("fill_{}", n),
			order_id: format!("order_{}", n),
			user_id: "user".to_string(),
			market: "TEST-MARKET".to_string(),
			side: ContractSide::Yes,
			action: Action::Buy,
			price: 50,
			count: 1,
			is_taker: true,
			trade_id: format!("trade_{}", n),
			created_time: 1000,
		})
	}

	/// Refuses every other fill
	#[derive(Default)]
	struct FlakyStore {
		seen: Mutex<u64>,
		accepted: Mutex<Vec<String>>,
	}

	impl OrderStore for FlakyStore {
		fn persist_order(&self, _order: &Order) -> Result<(), StoreError> {
			Ok(())
		}

		fn persist_fill(&self, fill: &Fill) -> Result<(), StoreError> {
			let mut seen = self.seen.lock().unwrap();
			*seen += 1;
			if *seen % 2 == 0 {
				return Err(StoreError::WriteFailed(fill.fill_id.clone()));
			}
			self.accepted.lock().unwrap().push(fill.fill_id.clone());
			Ok(())
		}

		fn persist_trade(&self, _trade: &Trade) -> Result<(), StoreError> {
			Ok(())
		}

		fn persist_position(&self, _position: &Position) -> Result<(), StoreError> {
			Ok(())
		}

		fn open_orders(&self, _market: &str) -> Result<Vec<Order>, StoreError> {
			Ok(Vec::new())
		}
	}

	#[test]
	fn test_event_writer_basic() {
		let (producer, consumer) = EventBuffer::new(100).split();
		let store = Arc::new(MemoryOrderStore::new());

		let config = EventWriterConfig {
			batch_size: 5,
			batch_timeout_ms: 50,
			verbose_logging: false,
		};
		let writer = EventWriter::start(consumer, store.clone(), config).unwrap();

		for i in 0..10 {
			producer.push(create_test_event(i)).unwrap();
		}

		// Give writer time to process
		thread::sleep(Duration::from_millis(200));
		assert_eq!(store.fills().len(), 10);

		writer.shutdown();
	}

	#[test]
	fn test_shutdown_drains_buffer_in_order() {
		let (producer, consumer) = EventBuffer::new(1000).split();
		let store = Arc::new(MemoryOrderStore::new());
		let config = EventWriterConfig {
			batch_size: 7,
			batch_timeout_ms: 10_000,
			verbose_logging: true,
		};
		let writer = EventWriter::start(consumer, store.clone(), config).unwrap();

		for i in 0..500 {
			producer.push(create_test_event(i)).unwrap();
		}
		writer.shutdown();

		let ids: Vec<String> = store.fills().into_iter().map(|f| f.fill_id).collect();
		let expected: Vec<String> = (0..500).map(|i| format!("fill_{}", i)).collect();
		assert_eq!(ids, expected);
	}

	#[test]
	fn test_store_failures_are_skipped() {
		let (producer, consumer) = EventBuffer::new(100).split();
		let store = Arc::new(FlakyStore::default());
		let writer =
			EventWriter::start(consumer, store.clone(), EventWriterConfig::default()).unwrap();

		for i in 0..4 {
			producer.push(create_test_event(i)).unwrap();
		}
		writer.shutdown();

		assert_eq!(*store.seen.lock().unwrap(), 4);
		assert_eq!(*store.accepted.lock().unwrap(), vec!["fill_0", "fill_2"]);
	}
}
