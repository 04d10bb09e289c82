//! Configuration builder for tests and local development.
//!
//! The built configuration selects the `mock` price source and `memory`
//! storage, and points the HTTP implementations at local endpoints, so it
//! is valid without any external service.

use rust_decimal::Decimal;
use std::collections::HashMap;
use swap_types::RateLimitConfig;

use crate::{
	AccountConfig, AggregatorConfig, Config, DeliveryConfig, PricingConfig, RateLimitsConfig,
	StorageConfig, SwapConfig,
};

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	swap: SwapConfig,
	rate_limits: RateLimitsConfig,
	pricing_primary: String,
	cache_ttl_ms: u64,
	aggregator_url: String,
	wallet_bridge_url: String,
	rpc_url: String,
	storage_primary: String,
	storage_path: Option<String>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			swap: SwapConfig::default(),
			rate_limits: RateLimitsConfig::default(),
			pricing_primary: "mock".to_string(),
			cache_ttl_ms: 60_000,
			aggregator_url: "http://127.0.0.1:8080".to_string(),
			wallet_bridge_url: "http://127.0.0.1:8081".to_string(),
			rpc_url: "http://127.0.0.1:8899".to_string(),
			storage_primary: "memory".to_string(),
			storage_path: None,
		}
	}

	pub fn debounce_ms(mut self, debounce_ms: u64) -> Self {
		self.swap.debounce_ms = debounce_ms;
		self
	}

	pub fn default_slippage_pct(mut self, slippage: Decimal) -> Self {
		self.swap.default_slippage_pct = slippage;
		self
	}

	pub fn price_impact_warning_pct(mut self, pct: f64) -> Self {
		self.swap.price_impact_warning_pct = pct;
		self
	}

	pub fn quote_rate_limit(mut self, limit: RateLimitConfig) -> Self {
		self.rate_limits.quote = limit;
		self
	}

	pub fn price_rate_limit(mut self, limit: RateLimitConfig) -> Self {
		self.rate_limits.price = limit;
		self
	}

	/// Selects the price source; `jupiter` uses the aggregator URL.
	pub fn pricing_primary(mut self, primary: &str) -> Self {
		self.pricing_primary = primary.to_string();
		self
	}

	pub fn cache_ttl_ms(mut self, ttl: u64) -> Self {
		self.cache_ttl_ms = ttl;
		self
	}

	pub fn aggregator_url(mut self, url: &str) -> Self {
		self.aggregator_url = url.to_string();
		self
	}

	pub fn wallet_bridge_url(mut self, url: &str) -> Self {
		self.wallet_bridge_url = url.to_string();
		self
	}

	pub fn rpc_url(mut self, url: &str) -> Self {
		self.rpc_url = url.to_string();
		self
	}

	/// Switches storage to the file backend rooted at `path`.
	pub fn file_storage(mut self, path: &str) -> Self {
		self.storage_primary = "file".to_string();
		self.storage_path = Some(path.to_string());
		self
	}

	pub fn build(self) -> Config {
		let mut pricing_impls = HashMap::new();
		pricing_impls.insert("mock".to_string(), empty_table());
		pricing_impls.insert(
			"jupiter".to_string(),
			table(&[("base_url", &self.aggregator_url)]),
		);

		let mut storage_impls = HashMap::new();
		storage_impls.insert("memory".to_string(), empty_table());
		if let Some(path) = &self.storage_path {
			storage_impls.insert("file".to_string(), table(&[("storage_path", path)]));
		}

		Config {
			swap: self.swap,
			rate_limits: self.rate_limits,
			pricing: PricingConfig {
				primary: self.pricing_primary,
				cache_ttl_ms: self.cache_ttl_ms,
				refresh_interval_seconds: 30,
				implementations: pricing_impls,
			},
			aggregator: AggregatorConfig {
				primary: "jupiter".to_string(),
				implementations: single("jupiter", table(&[("base_url", &self.aggregator_url)])),
			},
			account: AccountConfig {
				primary: "bridge".to_string(),
				implementations: single("bridge", table(&[("url", &self.wallet_bridge_url)])),
			},
			delivery: DeliveryConfig {
				primary: "rpc".to_string(),
				implementations: single("rpc", table(&[("url", &self.rpc_url)])),
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: storage_impls,
			},
		}
	}
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}

fn table(entries: &[(&str, &str)]) -> toml::Value {
	let mut map = toml::map::Map::new();
	for (key, value) in entries {
		map.insert(key.to_string(), toml::Value::String(value.to_string()));
	}
	toml::Value::Table(map)
}

fn single(name: &str, value: toml::Value) -> HashMap<String, toml::Value> {
	HashMap::from([(name.to_string(), value)])
}
