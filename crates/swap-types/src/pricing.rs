//! Price entries, price tables and the price endpoint's wire format.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::utils::serde_utils::lenient_f64;

/// Errors that can occur during pricing operations.
#[derive(Debug, Error)]
pub enum PricingError {
	/// Error when a requested token price is not available.
	#[error("Price not available for token: {0}")]
	PriceNotAvailable(String),
	/// Error during network communication with the price source.
	#[error("Network error: {0}")]
	Network(String),
	/// Error when price data is invalid or corrupted.
	#[error("Invalid price data: {0}")]
	InvalidData(String),
	/// Error when the implementation configuration is unusable.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Last observed price of one token, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
	pub price: f64,
	/// Change over the last 24 hours in percent.
	pub price_change_24h: f64,
	/// Capture time in Unix milliseconds.
	pub captured_at_ms: u64,
}

impl PriceEntry {
	pub fn new(price: f64, price_change_24h: f64, captured_at_ms: u64) -> Self {
		Self {
			price,
			price_change_24h,
			captured_at_ms,
		}
	}

	/// Whether the entry is at most `ttl_ms` old at `now_ms`.
	pub fn is_fresh(&self, ttl_ms: u64, now_ms: u64) -> bool {
		now_ms.saturating_sub(self.captured_at_ms) <= ttl_ms
	}

	/// USD value of `amount` units of the token.
	pub fn value_of(&self, amount: Decimal) -> f64 {
		amount.to_f64().unwrap_or_default() * self.price
	}
}

/// Prices keyed by token mint.
pub type PriceTable = HashMap<String, PriceEntry>;

/// Per-token record of the price endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceData {
	#[serde(default, deserialize_with = "lenient_f64")]
	pub price: Option<f64>,
	#[serde(default, rename = "priceChange24h", deserialize_with = "lenient_f64")]
	pub price_change_24h: Option<f64>,
}

/// Body of the price endpoint: `{ "data": { mint: { "price": .. } } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceResponse {
	#[serde(default)]
	pub data: HashMap<String, Option<PriceData>>,
}

impl PriceResponse {
	/// Converts the response into a price table, dropping tokens without a price.
	pub fn into_table(self, captured_at_ms: u64) -> PriceTable {
		self.data
			.into_iter()
			.filter_map(|(mint, data)| {
				let data = data?;
				let price = data.price?;
				Some((
					mint,
					PriceEntry::new(price, data.price_change_24h.unwrap_or(0.0), captured_at_ms),
				))
			})
			.collect()
	}
}
