//! Token pricing for the swap client.
//!
//! A [`PricingService`] fronts one price source with the shared price rate
//! limiter and a [`PriceCache`]. Callers that only display prices use
//! [`PricingService::get_cached_prices`], which never fails: a fetch error is
//! logged and yields an empty table, leaving the cache as it was.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use swap_types::{
	ConfigSchema, ImplementationRegistry, PriceEntry, PriceTable, PricingError, RateLimiter,
	TokenBalance,
};
use tracing::{debug, warn};

pub mod cache;

pub use cache::{PriceCache, DEFAULT_PRICE_TTL};

/// Re-export implementations
pub mod implementations {
	pub mod jupiter;
	pub mod mock;
}

/// A source of token prices.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PricingInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches current prices for `ids`.
	///
	/// Tokens the source does not price are absent from the result.
	async fn fetch_prices(&self, ids: &[String]) -> Result<PriceTable, PricingError>;
}

/// Type alias for pricing factory functions.
pub type PricingFactory = fn(&toml::Value) -> Result<Box<dyn PricingInterface>, PricingError>;

/// Registry trait for pricing implementations.
pub trait PricingRegistry: ImplementationRegistry<Factory = PricingFactory> {}

/// Get all registered pricing implementations.
pub fn get_all_implementations() -> Vec<(&'static str, PricingFactory)> {
	use implementations::{jupiter, mock};

	vec![
		(
			jupiter::JupiterPricingRegistry::NAME,
			jupiter::JupiterPricingRegistry::factory(),
		),
		(
			mock::MockPricingRegistry::NAME,
			mock::MockPricingRegistry::factory(),
		),
	]
}

/// Service combining a price source, the price rate limiter and a cache.
pub struct PricingService {
	implementation: Box<dyn PricingInterface>,
	cache: PriceCache,
	limiter: Arc<RateLimiter>,
}

impl PricingService {
	pub fn new(
		implementation: Box<dyn PricingInterface>,
		cache_ttl: Duration,
		limiter: Arc<RateLimiter>,
	) -> Self {
		Self {
			implementation,
			cache: PriceCache::new(cache_ttl),
			limiter,
		}
	}

	pub fn cache(&self) -> &PriceCache {
		&self.cache
	}

	pub fn limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Fetches prices through the rate limiter. Errors propagate.
	///
	/// An empty id list returns an empty table without a request.
	pub async fn get_prices(&self, ids: &[String]) -> Result<PriceTable, PricingError> {
		if ids.is_empty() {
			return Ok(PriceTable::new());
		}
		debug!(tokens = ids.len(), "Fetching token prices");
		self.limiter
			.execute(|| self.implementation.fetch_prices(ids))
			.await
	}

	/// Returns cached prices, fetching and caching on a miss.
	///
	/// A failed fetch is logged and returns an empty table.
	pub async fn get_cached_prices(&self, ids: &[String]) -> PriceTable {
		if ids.is_empty() {
			return PriceTable::new();
		}
		if let Some(table) = self.cache.get(ids).await {
			debug!(key = %PriceCache::cache_key(ids), "Price cache hit");
			return table;
		}

		match self.get_prices(ids).await {
			Ok(table) => {
				self.cache.set(ids, table.clone()).await;
				table
			},
			Err(e) => {
				warn!(error = %e, "Failed to fetch token prices, returning empty table");
				PriceTable::new()
			},
		}
	}

	/// Current price of a single token, or `None` if unavailable.
	pub async fn get_price(&self, id: &str) -> Option<PriceEntry> {
		let ids = [id.to_string()];
		match self.get_prices(&ids).await {
			Ok(mut table) => table.remove(id),
			Err(e) => {
				warn!(token = %id, error = %e, "Failed to fetch token price");
				None
			},
		}
	}
}

/// USD value of `amount` units of token `id`; zero when unpriced.
pub fn usd_value(amount: Decimal, id: &str, prices: &PriceTable) -> f64 {
	prices
		.get(id)
		.map(|entry| entry.value_of(amount))
		.unwrap_or(0.0)
}

/// Total USD value of a set of balances; unpriced tokens count as zero.
pub fn portfolio_value(balances: &[TokenBalance], prices: &PriceTable) -> f64 {
	balances
		.iter()
		.map(|balance| usd_value(balance.ui_amount(), &balance.mint, prices))
		.sum()
}

/// 24 hour price change of token `id` in percent; zero when unpriced.
pub fn price_change(id: &str, prices: &PriceTable) -> f64 {
	prices
		.get(id)
		.map(|entry| entry.price_change_24h)
		.unwrap_or(0.0)
}
