//! Swap aggregator boundary for the swap client.
//!
//! The aggregator answers quote requests with a priced route and turns an
//! accepted quote into an unsigned transaction for the user's wallet. Every
//! call made through [`AggregatorService`] is gated by a rate limiter: quote
//! and swap-transaction requests share the quote family's limiter, the token
//! list uses the general one.

use async_trait::async_trait;
use std::sync::Arc;
use swap_types::{
	ConfigSchema, ImplementationRegistry, QuoteRequest, QuoteResponse, RateLimiter, SwapError,
	SwapTransactionRequest, UnsignedTransaction,
};
use thiserror::Error;
use tracing::debug;

/// Re-export implementations
pub mod implementations {
	pub mod jupiter;
}

/// Errors that can occur while talking to the aggregator.
#[derive(Debug, Error)]
pub enum AggregatorError {
	/// The request never produced an HTTP response.
	#[error("Network error: {0}")]
	Network(String),
	/// The aggregator answered with a non-success status.
	#[error("{message}")]
	Http { status: u16, message: String },
	/// The response body could not be interpreted.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl AggregatorError {
	/// HTTP status of the failed response, if there was one.
	pub fn status(&self) -> Option<u16> {
		match self {
			AggregatorError::Http { status, .. } => Some(*status),
			_ => None,
		}
	}
}

impl From<AggregatorError> for SwapError {
	fn from(err: AggregatorError) -> Self {
		SwapError::Network {
			status: err.status(),
			message: err.to_string(),
		}
	}
}

/// Trait defining the interface for swap aggregators.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AggregatorInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Requests a quote for swapping `request.amount` of the input token.
	async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, AggregatorError>;

	/// Requests the unsigned transaction executing a previously quoted swap.
	async fn get_swap_transaction(
		&self,
		request: &SwapTransactionRequest,
	) -> Result<UnsignedTransaction, AggregatorError>;

	/// Lists the mints the aggregator can route.
	async fn get_supported_tokens(&self) -> Result<Vec<String>, AggregatorError>;
}

/// Type alias for aggregator factory functions.
pub type AggregatorFactory =
	fn(&toml::Value) -> Result<Box<dyn AggregatorInterface>, AggregatorError>;

/// Registry trait for aggregator implementations.
pub trait AggregatorRegistry: ImplementationRegistry<Factory = AggregatorFactory> {}

/// Get all registered aggregator implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AggregatorFactory)> {
	use implementations::jupiter;

	vec![(
		jupiter::JupiterAggregatorRegistry::NAME,
		jupiter::JupiterAggregatorRegistry::factory(),
	)]
}

/// Rate-limited access to an aggregator implementation.
pub struct AggregatorService {
	implementation: Box<dyn AggregatorInterface>,
	quote_limiter: Arc<RateLimiter>,
	general_limiter: Arc<RateLimiter>,
}

impl AggregatorService {
	pub fn new(
		implementation: Box<dyn AggregatorInterface>,
		quote_limiter: Arc<RateLimiter>,
		general_limiter: Arc<RateLimiter>,
	) -> Self {
		Self {
			implementation,
			quote_limiter,
			general_limiter,
		}
	}

	pub fn quote_limiter(&self) -> &Arc<RateLimiter> {
		&self.quote_limiter
	}

	pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, AggregatorError> {
		debug!(
			input = %request.input_mint,
			output = %request.output_mint,
			amount = request.amount,
			slippage_bps = request.slippage_bps,
			"Requesting quote"
		);
		self.quote_limiter
			.execute(|| self.implementation.get_quote(request))
			.await
	}

	pub async fn swap_transaction(
		&self,
		request: &SwapTransactionRequest,
	) -> Result<UnsignedTransaction, AggregatorError> {
		debug!(user = %request.user_public_key, "Requesting swap transaction");
		self.quote_limiter
			.execute(|| self.implementation.get_swap_transaction(request))
			.await
	}

	pub async fn supported_tokens(&self) -> Result<Vec<String>, AggregatorError> {
		self.general_limiter
			.execute(|| self.implementation.get_supported_tokens())
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use swap_types::{utils::builders::QuoteBuilder, Address};

	fn limiter(name: &str, max: usize) -> Arc<RateLimiter> {
		Arc::new(RateLimiter::new(name, max, Duration::from_secs(60)))
	}

	#[tokio::test]
	async fn test_quote_and_swap_share_quote_limiter() {
		let mut mock = MockAggregatorInterface::new();
		mock.expect_get_quote()
			.times(1)
			.returning(|_| Box::pin(async { Ok(QuoteBuilder::new().build_response()) }));
		mock.expect_get_swap_transaction().times(1).returning(|_| {
			Box::pin(async {
				Ok(UnsignedTransaction {
					payload: "AQID".to_string(),
					last_valid_block_height: None,
				})
			})
		});
		mock.expect_get_supported_tokens()
			.times(1)
			.returning(|| Box::pin(async { Ok(vec!["mint".to_string()]) }));

		let service = AggregatorService::new(Box::new(mock), limiter("quote", 10), limiter("general", 15));
		let builder = QuoteBuilder::new();
		let response = service.quote(&builder.request()).await.unwrap();
		let request = SwapTransactionRequest::new(response.raw.clone(), &Address::from("user"));
		service.swap_transaction(&request).await.unwrap();
		service.supported_tokens().await.unwrap();

		assert_eq!(service.quote_limiter().stats().await.current_requests, 2);
		assert_eq!(service.general_limiter.stats().await.current_requests, 1);
	}

	#[test]
	fn test_conversion_keeps_status() {
		let err: SwapError = AggregatorError::Http {
			status: 503,
			message: "HTTP 503: Service Unavailable".to_string(),
		}
		.into();
		assert_eq!(err.status(), Some(503));
		assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");

		let err: SwapError = AggregatorError::Network("connection refused".to_string()).into();
		assert_eq!(err.status(), None);
		assert_eq!(err.to_string(), "Network error: connection refused");
	}

	#[tokio::test]
	async fn test_errors_pass_through_unchanged() {
		let mut mock = MockAggregatorInterface::new();
		mock.expect_get_quote().returning(|_| {
			Box::pin(async {
				Err(AggregatorError::Http {
					status: 429,
					message: "HTTP 429: Too Many Requests".to_string(),
				})
			})
		});

		let service = AggregatorService::new(Box::new(mock), limiter("quote", 10), limiter("general", 15));
		let err = service
			.quote(&QuoteBuilder::new().request())
			.await
			.unwrap_err();
		assert_eq!(err.status(), Some(429));
		assert_eq!(err.to_string(), "HTTP 429: Too Many Requests");
		assert_eq!(service.quote_limiter().stats().await.current_requests, 0);
	}
}
