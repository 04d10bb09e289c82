//! Solana JSON-RPC implementation.
//!
//! Every call is a JSON-RPC 2.0 `POST` to the configured node URL. A
//! response carrying an `error` member becomes [`DeliveryError::Rpc`].

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use swap_types::{
	http_error_message, http_url_validator, Address, ConfigSchema, Field, FieldType,
	ImplementationRegistry, Schema, SignedTransaction, TokenBalance, TransactionSignature,
	ValidationError,
};
use tracing::{debug, warn};

use crate::{DeliveryError, DeliveryFactory, DeliveryInterface, DeliveryRegistry};

/// SPL token program owning the accounts returned by `getTokenAccountsByOwner`.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGqPK1ZVQDDMKAx8yqDAJXYZ";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_COMMITMENT: &str = "confirmed";

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
	result: Option<T>,
	error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
	value: T,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
	account: AccountData,
}

#[derive(Debug, Deserialize)]
struct AccountData {
	data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
	parsed: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
	info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
	mint: String,
	token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
	amount: String,
	decimals: u8,
}

/// Chain access through a Solana JSON-RPC node.
pub struct RpcDelivery {
	client: Client,
	url: String,
	commitment: String,
	next_id: AtomicU64,
}

impl RpcDelivery {
	pub fn new(config: &toml::Value) -> Result<Self, DeliveryError> {
		RpcDeliverySchema
			.validate(config)
			.map_err(|e| DeliveryError::Configuration(e.to_string()))?;

		let url = config
			.get("url")
			.and_then(|v| v.as_str())
			.unwrap_or_default()
			.to_string();
		let commitment = config
			.get("commitment")
			.and_then(|v| v.as_str())
			.unwrap_or(DEFAULT_COMMITMENT)
			.to_string();
		let timeout = config
			.get("timeout_seconds")
			.and_then(|v| v.as_integer())
			.map(|v| v as u64)
			.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

		let client = Client::builder()
			.timeout(Duration::from_secs(timeout))
			.build()
			.map_err(|e| DeliveryError::Network(format!("Failed to create HTTP client: {e}")))?;

		debug!(url = %url, commitment = %commitment, "RPC delivery initialized");
		Ok(Self {
			client,
			url,
			commitment,
			next_id: AtomicU64::new(1),
		})
	}

	async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, DeliveryError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		debug!(method = %method, id, "Sending RPC request");

		let response = self
			.client
			.post(&self.url)
			.json(&json!({
				"jsonrpc": "2.0",
				"id": id,
				"method": method,
				"params": params,
			}))
			.send()
			.await
			.map_err(|e| DeliveryError::Network(format!("{method} failed: {e}")))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(DeliveryError::Network(format!(
				"{method} failed: {}",
				http_error_message(status.as_u16(), status.canonical_reason(), &body)
			)));
		}

		let body: RpcResponse<T> = response
			.json()
			.await
			.map_err(|e| DeliveryError::InvalidResponse(format!("{method}: {e}")))?;
		if let Some(error) = body.error {
			warn!(method = %method, code = error.code, message = %error.message, "RPC error");
			return Err(DeliveryError::Rpc {
				code: error.code,
				message: error.message,
			});
		}
		body.result
			.ok_or_else(|| DeliveryError::InvalidResponse(format!("{method}: missing result")))
	}
}

#[async_trait]
impl DeliveryInterface for RpcDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RpcDeliverySchema)
	}

	async fn send_transaction(
		&self,
		tx: &SignedTransaction,
	) -> Result<TransactionSignature, DeliveryError> {
		base64::engine::general_purpose::STANDARD
			.decode(&tx.payload)
			.map_err(|e| DeliveryError::InvalidTransaction(format!("payload is not base64: {e}")))?;

		let signature: String = self
			.call(
				"sendTransaction",
				json!([tx.payload, {
					"encoding": "base64",
					"preflightCommitment": self.commitment,
				}]),
			)
			.await?;
		Ok(TransactionSignature(signature))
	}

	async fn get_balance(&self, address: &Address) -> Result<u64, DeliveryError> {
		let balance: WithContext<u64> = self
			.call(
				"getBalance",
				json!([address.as_str(), { "commitment": self.commitment }]),
			)
			.await?;
		Ok(balance.value)
	}

	async fn get_token_balances(&self, owner: &Address) -> Result<Vec<TokenBalance>, DeliveryError> {
		let accounts: WithContext<Vec<KeyedAccount>> = self
			.call(
				"getTokenAccountsByOwner",
				json!([
					owner.as_str(),
					{ "programId": TOKEN_PROGRAM_ID },
					{ "encoding": "jsonParsed", "commitment": self.commitment },
				]),
			)
			.await?;

		accounts
			.value
			.into_iter()
			.map(|keyed| {
				let info = keyed.account.data.parsed.info;
				let amount = info.token_amount.amount.parse::<u64>().map_err(|e| {
					DeliveryError::InvalidResponse(format!(
						"token amount for {}: {e}",
						info.mint
					))
				})?;
				Ok(TokenBalance {
					mint: info.mint,
					amount,
					decimals: info.token_amount.decimals,
				})
			})
			.collect()
	}
}

fn commitment_validator(value: &toml::Value) -> Result<(), String> {
	match value.as_str() {
		Some("processed" | "confirmed" | "finalized") => Ok(()),
		_ => Err("must be one of processed, confirmed, finalized".to_string()),
	}
}

/// Configuration schema for the RPC delivery.
pub struct RpcDeliverySchema;

impl ConfigSchema for RpcDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("url", FieldType::String).with_validator(http_url_validator)],
			vec![
				Field::new("commitment", FieldType::String).with_validator(commitment_validator),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		)
		.validate(config)
	}
}

/// Registry for the RPC delivery.
pub struct RpcDeliveryRegistry;

impl ImplementationRegistry for RpcDeliveryRegistry {
	const NAME: &'static str = "rpc";
	type Factory = DeliveryFactory;

	fn factory() -> Self::Factory {
		create_rpc_delivery
	}
}

impl DeliveryRegistry for RpcDeliveryRegistry {}

/// Factory function for creating RpcDelivery instances.
pub fn create_rpc_delivery(config: &toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	Ok(Box::new(RpcDelivery::new(config)?))
}
