//! Configuration module for the swap client.
//!
//! Configuration is a single TOML document. Tunables of the swap flow live
//! under `[swap]` and `[rate_limits.*]`; every pluggable boundary (pricing,
//! aggregator, account, delivery, storage) names its `primary`
//! implementation and carries one raw table per implementation, which the
//! implementation's own schema validates when it is built.
//!
//! String values may reference environment variables as `${NAME}` or
//! `${NAME:-default}`.

pub mod builders;

pub use builders::config::ConfigBuilder;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use swap_types::{RateLimitConfig, DEFAULT_DEADLINE_MINUTES, DEFAULT_SLIPPAGE_PERCENT};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default rendering embeds the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the swap client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Tunables of the quote and swap flow.
	#[serde(default)]
	pub swap: SwapConfig,
	/// Per-family request limits.
	#[serde(default)]
	pub rate_limits: RateLimitsConfig,
	pub pricing: PricingConfig,
	pub aggregator: AggregatorConfig,
	pub account: AccountConfig,
	pub delivery: DeliveryConfig,
	pub storage: StorageConfig,
}

/// Tunables of the quote and swap flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwapConfig {
	/// Quiet period before a debounced quote request fires.
	#[serde(default = "default_debounce_ms")]
	pub debounce_ms: u64,
	/// Slippage applied when the user has not chosen one, in percent.
	#[serde(default = "default_slippage_pct")]
	pub default_slippage_pct: Decimal,
	/// Maximum fractional digits accepted in a typed amount.
	#[serde(default = "default_max_amount_decimals")]
	pub max_amount_decimals: u32,
	/// Price impact above which a quote carries a warning, in percent.
	#[serde(default = "default_price_impact_warning_pct")]
	pub price_impact_warning_pct: f64,
	/// Transaction deadline offered by default, in minutes.
	#[serde(default = "default_deadline_minutes")]
	pub default_deadline_minutes: u32,
}

impl Default for SwapConfig {
	fn default() -> Self {
		Self {
			debounce_ms: default_debounce_ms(),
			default_slippage_pct: default_slippage_pct(),
			max_amount_decimals: default_max_amount_decimals(),
			price_impact_warning_pct: default_price_impact_warning_pct(),
			default_deadline_minutes: default_deadline_minutes(),
		}
	}
}

fn default_debounce_ms() -> u64 {
	500
}

fn default_slippage_pct() -> Decimal {
	DEFAULT_SLIPPAGE_PERCENT
}

fn default_max_amount_decimals() -> u32 {
	18
}

fn default_price_impact_warning_pct() -> f64 {
	15.0
}

fn default_deadline_minutes() -> u32 {
	DEFAULT_DEADLINE_MINUTES
}

/// Request limits, one limiter per API family.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitsConfig {
	/// Quote and swap-transaction requests.
	#[serde(default = "RateLimitConfig::quote")]
	pub quote: RateLimitConfig,
	/// Price requests.
	#[serde(default = "RateLimitConfig::price")]
	pub price: RateLimitConfig,
	/// Token list and other requests.
	#[serde(default = "RateLimitConfig::general")]
	pub general: RateLimitConfig,
}

impl Default for RateLimitsConfig {
	fn default() -> Self {
		Self {
			quote: RateLimitConfig::quote(),
			price: RateLimitConfig::price(),
			general: RateLimitConfig::general(),
		}
	}
}

/// Configuration for the price source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
	pub primary: String,
	/// How long a cached price table stays fresh.
	#[serde(default = "default_cache_ttl_ms")]
	pub cache_ttl_ms: u64,
	/// Interval of the background price refresh.
	#[serde(default = "default_refresh_interval_seconds")]
	pub refresh_interval_seconds: u64,
	pub implementations: HashMap<String, toml::Value>,
}

fn default_cache_ttl_ms() -> u64 {
	60_000
}

fn default_refresh_interval_seconds() -> u64 {
	30
}

/// Configuration for the swap aggregator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the wallet connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for chain RPC access.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for local persistence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Resolves `${NAME}` and `${NAME:-default}` references.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {MAX_INPUT_SIZE} bytes)",
			input.len()
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {e}")))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(name.as_str()) {
			Ok(value) => value,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last..whole.start()]);
		result.push_str(&value);
		last = whole.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

fn check_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{section}.primary cannot be empty"
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"{section}.primary '{primary}' has no entry in {section}.implementations"
		)));
	}
	Ok(())
}

fn check_rate_limit(name: &str, limit: &RateLimitConfig) -> Result<(), ConfigError> {
	if limit.max_requests == 0 {
		return Err(ConfigError::Validation(format!(
			"rate_limits.{name}.max_requests must be at least 1"
		)));
	}
	if limit.window_ms == 0 {
		return Err(ConfigError::Validation(format!(
			"rate_limits.{name}.window_ms must be greater than 0"
		)));
	}
	Ok(())
}

impl Config {
	/// Loads and validates a configuration file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		debug!(path = %path.display(), "Loading configuration");
		let contents = tokio::fs::read_to_string(path).await?;
		contents.parse()
	}

	/// Checks value ranges and that every `primary` names a configured
	/// implementation.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let swap = &self.swap;
		if swap.default_slippage_pct < Decimal::ZERO
			|| swap.default_slippage_pct > swap_types::MAX_SLIPPAGE_PERCENT
		{
			return Err(ConfigError::Validation(format!(
				"swap.default_slippage_pct must be between 0 and {}",
				swap_types::MAX_SLIPPAGE_PERCENT
			)));
		}
		if swap.max_amount_decimals > 28 {
			return Err(ConfigError::Validation(
				"swap.max_amount_decimals cannot exceed 28".into(),
			));
		}
		if !swap.price_impact_warning_pct.is_finite() || swap.price_impact_warning_pct < 0.0 {
			return Err(ConfigError::Validation(
				"swap.price_impact_warning_pct must be a non-negative number".into(),
			));
		}

		check_rate_limit("quote", &self.rate_limits.quote)?;
		check_rate_limit("price", &self.rate_limits.price)?;
		check_rate_limit("general", &self.rate_limits.general)?;

		if self.pricing.cache_ttl_ms == 0 {
			return Err(ConfigError::Validation(
				"pricing.cache_ttl_ms must be greater than 0".into(),
			));
		}
		if self.pricing.refresh_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"pricing.refresh_interval_seconds must be greater than 0".into(),
			));
		}

		check_primary("pricing", &self.pricing.primary, &self.pricing.implementations)?;
		check_primary(
			"aggregator",
			&self.aggregator.primary,
			&self.aggregator.implementations,
		)?;
		check_primary("account", &self.account.primary, &self.account.implementations)?;
		check_primary("delivery", &self.delivery.primary, &self.delivery.implementations)?;
		check_primary("storage", &self.storage.primary, &self.storage.implementations)?;

		Ok(())
	}
}

/// Parses, resolves environment references and validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[pricing]
primary = "jupiter"
[pricing.implementations.jupiter]
base_url = "https://price.jup.ag/v4"

[aggregator]
primary = "jupiter"
[aggregator.implementations.jupiter]
base_url = "https://quote-api.jup.ag/v6"

[account]
primary = "bridge"
[account.implementations.bridge]
url = "http://127.0.0.1:8899"

[delivery]
primary = "rpc"
[delivery.implementations.rpc]
url = "https://api.mainnet-beta.solana.com"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_minimal_config_uses_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.swap.debounce_ms, 500);
		assert_eq!(config.swap.default_slippage_pct, DEFAULT_SLIPPAGE_PERCENT);
		assert_eq!(config.swap.max_amount_decimals, 18);
		assert_eq!(config.swap.price_impact_warning_pct, 15.0);
		assert_eq!(config.swap.default_deadline_minutes, 20);
		assert_eq!(config.rate_limits.quote, RateLimitConfig::quote());
		assert_eq!(config.rate_limits.price.max_requests, 20);
		assert_eq!(config.rate_limits.general.max_requests, 15);
		assert_eq!(config.pricing.cache_ttl_ms, 60_000);
		assert_eq!(config.pricing.refresh_interval_seconds, 30);
	}

	#[test]
	fn test_overrides() {
		let source = format!(
			r#"
[swap]
debounce_ms = 250
price_impact_warning_pct = 5.0
default_slippage_pct = "1.5"

[rate_limits.quote]
max_requests = 3
window_ms = 1000
{MINIMAL}"#
		);
		let config: Config = source.parse().unwrap();
		assert_eq!(config.swap.debounce_ms, 250);
		assert_eq!(config.swap.price_impact_warning_pct, 5.0);
		assert_eq!(config.swap.default_slippage_pct, Decimal::new(15, 1));
		assert_eq!(config.rate_limits.quote, RateLimitConfig::new(3, 1000));
		assert_eq!(config.rate_limits.price, RateLimitConfig::price());
	}

	#[test]
	fn test_primary_must_be_configured() {
		let source = MINIMAL.replace("primary = \"memory\"", "primary = \"file\"");
		let err = source.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("storage.primary 'file'"));
	}

	#[test]
	fn test_rejects_zero_rate_limit() {
		let source = format!("[rate_limits.price]\nmax_requests = 0\nwindow_ms = 10\n{MINIMAL}");
		let err = source.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("rate_limits.price.max_requests"));
	}

	#[test]
	fn test_rejects_out_of_range_slippage() {
		let source = format!("[swap]\ndefault_slippage_pct = \"75\"\n{MINIMAL}");
		assert!(matches!(
			source.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_parse_error_is_compact() {
		let err = "[pricing\nprimary = 1".parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("SWAP_CONFIG_TEST_RPC", "http://localhost:8899");
		let resolved =
			resolve_env_vars("url = \"${SWAP_CONFIG_TEST_RPC}\" # ${SWAP_CONFIG_UNSET:-fallback}")
				.unwrap();
		assert_eq!(resolved, "url = \"http://localhost:8899\" # fallback");
		std::env::remove_var("SWAP_CONFIG_TEST_RPC");

		let err = resolve_env_vars("url = \"${SWAP_CONFIG_MISSING}\"").unwrap_err();
		assert!(err.to_string().contains("SWAP_CONFIG_MISSING"));
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("swap.toml");
		tokio::fs::write(&path, MINIMAL).await.unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.aggregator.primary, "jupiter");

		let missing = Config::from_file(dir.path().join("absent.toml")).await;
		assert!(matches!(missing, Err(ConfigError::Io(_))));
	}
}
