//! Jupiter aggregator implementation.
//!
//! Endpoints, relative to `base_url`:
//! - `GET /quote?inputMint=&outputMint=&amount=&slippageBps=`
//! - `POST /swap` with the quote response and the user's public key
//! - `GET /tokens`

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use swap_types::{
	http_error_message, http_url_validator, ConfigSchema, Field, FieldType,
	ImplementationRegistry, QuoteRequest, QuoteResponse, Schema, SwapTransactionRequest,
	UnsignedTransaction, ValidationError,
};
use tracing::debug;

use crate::{AggregatorError, AggregatorFactory, AggregatorInterface, AggregatorRegistry};

const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

/// Client for the Jupiter swap API.
pub struct JupiterAggregator {
	client: Client,
	base_url: String,
}

impl JupiterAggregator {
	pub fn new(config: &toml::Value) -> Result<Self, AggregatorError> {
		JupiterAggregatorSchema
			.validate(config)
			.map_err(|e| AggregatorError::Configuration(e.to_string()))?;

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
			.map_err(|e| AggregatorError::Network(format!("Failed to create HTTP client: {e}")))?;

		debug!(base_url = %base_url, "Jupiter aggregator initialized");
		Ok(Self { client, base_url })
	}

	/// Returns the JSON body of a successful response.
	async fn read_json(response: Response) -> Result<Value, AggregatorError> {
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(AggregatorError::Http {
				status: status.as_u16(),
				message: http_error_message(status.as_u16(), status.canonical_reason(), &body),
			});
		}
		response
			.json::<Value>()
			.await
			.map_err(|e| AggregatorError::InvalidResponse(e.to_string()))
	}
}

#[async_trait]
impl AggregatorInterface for JupiterAggregator {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(JupiterAggregatorSchema)
	}

	async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, AggregatorError> {
		let url = format!("{}/quote", self.base_url);
		debug!(url = %url, "Fetching quote from Jupiter");

		let response = self
			.client
			.get(&url)
			.query(&request.query_pairs())
			.send()
			.await
			.map_err(|e| AggregatorError::Network(e.to_string()))?;

		let body = Self::read_json(response).await?;
		QuoteResponse::from_value(body).map_err(|e| AggregatorError::InvalidResponse(e.to_string()))
	}

	async fn get_swap_transaction(
		&self,
		request: &SwapTransactionRequest,
	) -> Result<UnsignedTransaction, AggregatorError> {
		let url = format!("{}/swap", self.base_url);
		debug!(url = %url, "Requesting swap transaction from Jupiter");

		let response = self
			.client
			.post(&url)
			.json(request)
			.send()
			.await
			.map_err(|e| AggregatorError::Network(e.to_string()))?;

		let body = Self::read_json(response).await?;
		serde_json::from_value(body).map_err(|e| AggregatorError::InvalidResponse(e.to_string()))
	}

	async fn get_supported_tokens(&self) -> Result<Vec<String>, AggregatorError> {
		let url = format!("{}/tokens", self.base_url);
		debug!(url = %url, "Fetching supported tokens from Jupiter");

		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| AggregatorError::Network(e.to_string()))?;

		let body = Self::read_json(response).await?;
		serde_json::from_value(body).map_err(|e| AggregatorError::InvalidResponse(e.to_string()))
	}
}

/// Configuration schema for the Jupiter aggregator.
pub struct JupiterAggregatorSchema;

impl ConfigSchema for JupiterAggregatorSchema {
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

/// Registry for the Jupiter aggregator.
pub struct JupiterAggregatorRegistry;

impl ImplementationRegistry for JupiterAggregatorRegistry {
	const NAME: &'static str = "jupiter";
	type Factory = AggregatorFactory;

	fn factory() -> Self::Factory {
		create_jupiter_aggregator
	}
}

impl AggregatorRegistry for JupiterAggregatorRegistry {}

/// Factory function for creating JupiterAggregator instances.
pub fn create_jupiter_aggregator(
	config: &toml::Value,
) -> Result<Box<dyn AggregatorInterface>, AggregatorError> {
	Ok(Box::new(JupiterAggregator::new(config)?))
}
