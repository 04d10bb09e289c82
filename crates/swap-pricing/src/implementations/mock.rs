//! Mock price source for development and testing.
//!
//! Serves fixed prices for a handful of well-known mints. Prices can be
//! overridden or extended through a `prices` table keyed by mint.

use async_trait::async_trait;
use std::collections::HashMap;
use swap_types::{
	current_timestamp_ms, ConfigSchema, ImplementationRegistry, PriceEntry, PriceTable,
	PricingError, ValidationError, SOL_MINT, USDC_MINT,
};

use crate::{PricingFactory, PricingInterface, PricingRegistry};

const MOCK_SOL_USD_PRICE: f64 = 150.0;
const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

/// Price source returning configured constants.
pub struct MockPricing {
	prices: HashMap<String, f64>,
}

impl MockPricing {
	pub fn new(config: &toml::Value) -> Result<Self, PricingError> {
		MockPricingSchema
			.validate(config)
			.map_err(|e| PricingError::Configuration(e.to_string()))?;

		let mut prices = HashMap::from([
			(SOL_MINT.to_string(), MOCK_SOL_USD_PRICE),
			(USDC_MINT.to_string(), 1.0),
			(USDT_MINT.to_string(), 1.0),
		]);

		if let Some(overrides) = config.get("prices").and_then(|v| v.as_table()) {
			for (mint, price) in overrides {
				if let Some(price) = price.as_float().or_else(|| price.as_integer().map(|i| i as f64)) {
					prices.insert(mint.clone(), price);
				}
			}
		}

		Ok(Self { prices })
	}
}

#[async_trait]
impl PricingInterface for MockPricing {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockPricingSchema)
	}

	async fn fetch_prices(&self, ids: &[String]) -> Result<PriceTable, PricingError> {
		let now = current_timestamp_ms();
		Ok(ids
			.iter()
			.filter_map(|id| {
				self.prices
					.get(id)
					.map(|price| (id.clone(), PriceEntry::new(*price, 0.0, now)))
			})
			.collect())
	}
}

/// Configuration schema for the mock price source.
pub struct MockPricingSchema;

impl ConfigSchema for MockPricingSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let Some(prices) = config.get("prices") else {
			return Ok(());
		};
		let table = prices.as_table().ok_or_else(|| ValidationError::TypeMismatch {
			field: "prices".to_string(),
			expected: "table".to_string(),
			actual: prices.type_str().to_string(),
		})?;

		for (mint, price) in table {
			let value = price
				.as_float()
				.or_else(|| price.as_integer().map(|i| i as f64))
				.ok_or_else(|| ValidationError::TypeMismatch {
					field: format!("prices.{mint}"),
					expected: "number".to_string(),
					actual: price.type_str().to_string(),
				})?;
			if value < 0.0 {
				return Err(ValidationError::InvalidValue {
					field: format!("prices.{mint}"),
					message: "Price cannot be negative".to_string(),
				});
			}
		}
		Ok(())
	}
}

/// Registry for the mock price source.
pub struct MockPricingRegistry;

impl ImplementationRegistry for MockPricingRegistry {
	const NAME: &'static str = "mock";
	type Factory = PricingFactory;

	fn factory() -> Self::Factory {
		create_mock_pricing
	}
}

impl PricingRegistry for MockPricingRegistry {}

/// Factory function for creating MockPricing instances.
pub fn create_mock_pricing(
	config: &toml::Value,
) -> Result<Box<dyn PricingInterface>, PricingError> {
	Ok(Box::new(MockPricing::new(config)?))
}
