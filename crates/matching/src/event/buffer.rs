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

use crossbeam::channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use super::ExchangeEvent;

/// Bounded hand-off between the exchange and the event writer
///
/// Submit and cancel calls push after releasing the market lock; the writer
/// thread drains in batches. Pushing never blocks: a full buffer is reported
/// back to the caller, which logs and moves on.
///
/// Producers are cloneable so every market's submit path can push
/// concurrently; there is a single consumer.
pub struct EventBuffer {
	sender: Sender<ExchangeEvent>,
	receiver: Receiver<ExchangeEvent>,
}

impl EventBuffer {
	/// Create a new event buffer with the specified capacity
	pub fn new(capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity);
		Self { sender, receiver }
	}

	/// Split the buffer into producer and consumer ends
	pub fn split(self) -> (EventProducer, EventConsumer) {
		(
			EventProducer {
				sender: self.sender,
			},
			EventConsumer {
				receiver: self.receiver,
			},
		)
	}
}

/// Producer end of the event buffer
#[derive(Clone)]
pub struct EventProducer {
	sender: Sender<ExchangeEvent>,
}

impl EventProducer {
	/// Push an event to the buffer
	///
	/// Returns `Full` under backpressure and `Disconnected` once the writer
	/// has gone away.
	pub fn push(&self, event: ExchangeEvent) -> Result<(), EventBufferError> {
		self.sender.try_send(event).map_err(|e| match e {
			TrySendError::Full(_) => EventBufferError::Full,
			TrySendError::Disconnected(_) => EventBufferError::Disconnected,
		})
	}

	/// Check if the buffer is full
	pub fn is_full(&self) -> bool {
		self.sender.is_full()
	}

	/// Number of events waiting for the writer
	pub fn len(&self) -> usize {
		self.sender.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sender.is_empty()
	}
}

/// Consumer end of the event buffer (used by event writer)
pub struct EventConsumer {
	receiver: Receiver<ExchangeEvent>,
}

impl EventConsumer {
	/// Try to receive an event from the buffer (non-blocking)
	pub fn try_recv(&self) -> Result<ExchangeEvent, EventBufferError> {
		self.receiver.try_recv().map_err(|e| match e {
			TryRecvError::Empty => EventBufferError::Empty,
			TryRecvError::Disconnected => EventBufferError::Disconnected,
		})
	}

	/// Receive an event from the buffer (blocking)
	pub fn recv(&self) -> Result<ExchangeEvent, EventBufferError> {
		self.receiver
			.recv()
			.map_err(|_| EventBufferError::Disconnected)
	}

	/// Drain up to `max_count` events without blocking
	pub fn drain(&self, max_count: usize) -> Vec<ExchangeEvent> {
		let mut events = Vec::with_capacity(max_count);
		for _ in 0..max_count {
			match self.try_recv() {
				Ok(event) => events.push(event),
				Err(_) => break,
			}
		}
		events
	}

	pub fn is_empty(&self) -> bool {
		self.receiver.is_empty()
	}
}

/// Errors that can occur when interacting with the event buffer
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventBufferError {
	#[error("Event buffer is full")]
	Full,
	#[error("Event buffer is empty")]
	Empty,
	#[error("Event buffer disconnected")]
	Disconnected,
}
