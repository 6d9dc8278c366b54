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

use serde::{Deserialize, Serialize};

use crate::event::EventWriterConfig;

// Logging configuration constants
/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log directory component name
pub const LOG_COMPONENT_NAME: &str = "exchange";

/// Default console output enabled (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

/// Environment variable prefix, e.g. `EXCHANGE_SNAPSHOT_DEPTH=20`
pub const ENV_PREFIX: &str = "EXCHANGE";

/// Exchange service configuration
///
/// Every field has a default, so a partial environment or file only
/// overrides what it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
	/// Markets to open books for (comma-separated in the environment)
	pub markets: Vec<String>,
	/// Levels per side returned by snapshot queries
	pub snapshot_depth: usize,
	/// Capacity of the persistence hand-off buffer
	pub event_buffer_size: usize,
	/// Maximum number of events per store batch
	pub event_batch_size: usize,
	/// Maximum wait before a partial batch is committed (milliseconds)
	pub event_batch_timeout_ms: u64,
	/// Per-order debug logging in the matcher and event writer
	pub verbose_logging: bool,
	/// Orders generated per market by the demo binary
	pub simulation_orders_per_market: usize,
}

impl Default for ExchangeConfig {
	fn default() -> Self {
		Self {
			markets: vec![
				"PRES-2028-DEM".to_string(),
				"FED-RATE-CUT-DEC".to_string(),
				"RAIN-NYC-TOMORROW".to_string(),
			],
			snapshot_depth: 10,
			event_buffer_size: 10_000,
			event_batch_size: 100,
			event_batch_timeout_ms: 100,
			verbose_logging: false,
			simulation_orders_per_market: 1_000,
		}
	}
}

impl ExchangeConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(Self::environment())
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file, with environment overrides
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(Self::environment())
			.build()?;

		cfg.try_deserialize()
	}

	/// Settings for the background event writer
	pub fn event_writer_config(&self) -> EventWriterConfig {
		EventWriterConfig {
			batch_size: self.event_batch_size,
			batch_timeout_ms: self.event_batch_timeout_ms,
			verbose_logging: self.verbose_logging,
		}
	}

	fn environment() -> config::Environment {
		config::Environment::with_prefix(ENV_PREFIX)
			.try_parsing(true)
			.list_separator(",")
			.with_list_parse_key("markets")
	}
}
