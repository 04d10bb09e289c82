//! Jupiter price API implementation.
//!
//! Queries `GET {base_url}/price?ids=a,b,c` and converts the `data` map of
//! the response into a price table stamped with the local capture time.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use swap_types::{
	current_timestamp_ms, http_error_message, http_url_validator, ConfigSchema, Field, FieldType,
	ImplementationRegistry, PriceResponse, PriceTable, PricingError, Schema, ValidationError,
};
use tracing::debug;

use crate::{PricingFactory, PricingInterface, PricingRegistry};

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Price source backed by the Jupiter price endpoint.
pub struct JupiterPricing {
	client: Client,
	base_url: String,
}

impl JupiterPricing {
	pub fn new(config: &toml::Value) -> Result<Self, PricingError> {
		JupiterPricingSchema
			.validate(config)
			.map_err(|e| PricingError::Configuration(e.to_string()))?;

		let base_url = config
			.get("base_url")
			.and_then(|v| v.as_str())
			.unwrap_or_default()
			.trim_end_matches('/')
			.to_string();
		let timeout = config
			.get("timeout_seconds")
			.and_then(|v| v.as_integer())
			.map(|v| v as u64)
			.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

		let client = Client::builder()
			.timeout(Duration::from_secs(timeout))
			.build()
			.map_err(|e| PricingError::Network(format!("Failed to create HTTP client: {e}")))?;

		debug!(base_url = %base_url, timeout_seconds = timeout, "Jupiter pricing initialized");
		Ok(Self { client, base_url })
	}
}

#[async_trait]
impl PricingInterface for JupiterPricing {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(JupiterPricingSchema)
	}

	async fn fetch_prices(&self, ids: &[String]) -> Result<PriceTable, PricingError> {
		let url = format!("{}/price", self.base_url);
		let joined = ids.join(",");
		debug!(url = %url, ids = %joined, "Fetching prices from Jupiter");

		let response = self
			.client
			.get(&url)
			.query(&[("ids", joined.as_str())])
			.send()
			.await
			.map_err(|e| PricingError::Network(format!("Failed to fetch token prices: {e}")))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(PricingError::Network(format!(
				"Failed to fetch token prices: {}",
				http_error_message(status.as_u16(), status.canonical_reason(), &body)
			)));
		}

		let body: PriceResponse = response
			.json()
			.await
			.map_err(|e| PricingError::InvalidData(format!("Failed to parse price response: {e}")))?;
		Ok(body.into_table(current_timestamp_ms()))
	}
}

/// Configuration schema for the Jupiter price source.
pub struct JupiterPricingSchema;

impl ConfigSchema for JupiterPricingSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("base_url", FieldType::String).with_validator(http_url_validator)],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		)
		.validate(config)
	}
}

/// Registry for the Jupiter price source.
pub struct JupiterPricingRegistry;

impl ImplementationRegistry for JupiterPricingRegistry {
	const NAME: &'static str = "jupiter";
	type Factory = PricingFactory;

	fn factory() -> Self::Factory {
		create_jupiter_pricing
	}
}

impl PricingRegistry for JupiterPricingRegistry {}

/// Factory function for creating JupiterPricing instances.
pub fn create_jupiter_pricing(
	config: &toml::Value,
) -> Result<Box<dyn PricingInterface>, PricingError> {
	Ok(Box::new(JupiterPricing::new(config)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use swap_types::{SOL_MINT, USDC_MINT};
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn config_for(server: &MockServer) -> toml::Value {
		toml::Value::Table(toml::map::Map::from_iter([(
			"base_url".to_string(),
			toml::Value::String(server.uri()),
		)]))
	}

	#[tokio::test]
	async fn test_fetches_and_parses_prices() {
		let server = MockServer::start().await;
		let ids_param = format!("{SOL_MINT},{USDC_MINT}");
		Mock::given(method("GET"))
			.and(path("/price"))
			.and(query_param("ids", ids_param.as_str()))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"data": {
					SOL_MINT: { "id": SOL_MINT, "price": 151.5, "priceChange24h": 1.2 },
					USDC_MINT: { "id": USDC_MINT, "price": "1.0" }
				},
				"timeTaken": 0.002
			})))
			.expect(1)
			.mount(&server)
			.await;

		let pricing = JupiterPricing::new(&config_for(&server)).unwrap();
		let table = pricing
			.fetch_prices(&[SOL_MINT.to_string(), USDC_MINT.to_string()])
			.await
			.unwrap();

		assert_eq!(table[SOL_MINT].price, 151.5);
		assert_eq!(table[SOL_MINT].price_change_24h, 1.2);
		assert_eq!(table[USDC_MINT].price, 1.0);
		assert!(table[USDC_MINT].captured_at_ms > 0);
	}

	#[tokio::test]
	async fn test_error_body_is_surfaced() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/price"))
			.respond_with(
				ResponseTemplate::new(400).set_body_json(serde_json::json!({ "error": "Invalid ids" })),
			)
			.mount(&server)
			.await;

		let pricing = JupiterPricing::new(&config_for(&server)).unwrap();
		let err = pricing.fetch_prices(&[SOL_MINT.to_string()]).await.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Network error: Failed to fetch token prices: Invalid ids"
		);
	}

	#[tokio::test]
	async fn test_status_fallback_message() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(503))
			.mount(&server)
			.await;

		let pricing = JupiterPricing::new(&config_for(&server)).unwrap();
		let err = pricing.fetch_prices(&[SOL_MINT.to_string()]).await.unwrap_err();
		assert!(err.to_string().ends_with("HTTP 503: Service Unavailable"));
	}

	#[test]
	fn test_config_requires_base_url() {
		let empty = toml::Value::Table(toml::map::Map::new());
		assert!(matches!(
			JupiterPricing::new(&empty),
			Err(PricingError::Configuration(_))
		));
	}
}
