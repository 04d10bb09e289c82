//! Wallet bridge implementation.
//!
//! Talks to a local wallet bridge process over HTTP. The bridge owns the
//! keys and prompts the user; this side only relays requests:
//!
//! - `POST {url}/connect` returns `{ "publicKey": "..." }`
//! - `POST {url}/disconnect`
//! - `POST {url}/sign` with `{ "transaction": "<base64>" }` returns
//!   `{ "signedTransaction": "<base64>" }`

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use swap_types::{
	http_error_message, http_url_validator, Address, ConfigSchema, Field, FieldType,
	ImplementationRegistry, Schema, SignedTransaction, UnsignedTransaction, ValidationError,
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{WalletError, WalletFactory, WalletInterface, WalletRegistry};

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectResponse {
	public_key: String,
}

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
	transaction: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
	signed_transaction: String,
}

/// Wallet reached through an HTTP bridge.
pub struct BridgeWallet {
	client: Client,
	url: String,
	address: RwLock<Option<Address>>,
}

impl BridgeWallet {
	pub fn new(config: &toml::Value) -> Result<Self, WalletError> {
		BridgeWalletSchema
			.validate(config)
			.map_err(|e| WalletError::Configuration(e.to_string()))?;

		let url = config
			.get("url")
			.and_then(|v| v.as_str())
			.unwrap_or_default()
			.trim_end_matches('/')
			.to_string();
		// Signing waits on the user, so the default is generous.
		let timeout = config
			.get("timeout_seconds")
			.and_then(|v| v.as_integer())
			.map(|v| v as u64)
			.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

		let client = Client::builder()
			.timeout(Duration::from_secs(timeout))
			.build()
			.map_err(|e| WalletError::Network(format!("Failed to create HTTP client: {e}")))?;

		Ok(Self {
			client,
			url,
			address: RwLock::new(None),
		})
	}

	async fn post<B: Serialize + ?Sized>(
		&self,
		endpoint: &str,
		body: &B,
	) -> Result<Response, WalletError> {
		let url = format!("{}/{}", self.url, endpoint);
		debug!(url = %url, "Calling wallet bridge");
		self.client
			.post(&url)
			.json(body)
			.send()
			.await
			.map_err(|e| WalletError::Network(format!("Wallet bridge unreachable: {e}")))
	}
}

async fn failure_message(response: Response) -> String {
	let status = response.status();
	let body = response.text().await.unwrap_or_default();
	http_error_message(status.as_u16(), status.canonical_reason(), &body)
}

#[async_trait]
impl WalletInterface for BridgeWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(BridgeWalletSchema)
	}

	async fn connect(&self) -> Result<Address, WalletError> {
		let response = self.post("connect", &serde_json::json!({})).await?;
		if !response.status().is_success() {
			return Err(WalletError::ConnectionFailed(
				failure_message(response).await,
			));
		}

		let body: ConnectResponse = response.json().await.map_err(|e| {
			WalletError::ConnectionFailed(format!("Invalid connect response: {e}"))
		})?;
		let address = Address::new(body.public_key);
		if !address.is_valid() {
			return Err(WalletError::ConnectionFailed(format!(
				"Invalid public key: {address}"
			)));
		}

		*self.address.write().await = Some(address.clone());
		Ok(address)
	}

	async fn disconnect(&self) -> Result<(), WalletError> {
		let result = self.post("disconnect", &serde_json::json!({})).await;
		// Local state is cleared even when the bridge is gone.
		self.address.write().await.take();
		match result {
			Ok(response) if !response.status().is_success() => {
				let message = failure_message(response).await;
				warn!(error = %message, "Wallet bridge rejected disconnect");
				Ok(())
			},
			Ok(_) => Ok(()),
			Err(e) => {
				warn!(error = %e, "Wallet bridge disconnect failed");
				Ok(())
			},
		}
	}

	async fn address(&self) -> Option<Address> {
		self.address.read().await.clone()
	}

	async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, WalletError> {
		if self.address.read().await.is_none() {
			return Err(WalletError::NotConnected);
		}

		let response = self
			.post(
				"sign",
				&SignRequest {
					transaction: &tx.payload,
				},
			)
			.await?;
		if !response.status().is_success() {
			return Err(WalletError::SigningRejected(
				failure_message(response).await,
			));
		}

		let body: SignResponse = response.json().await.map_err(|e| {
			WalletError::SigningRejected(format!("Invalid signing response: {e}"))
		})?;
		Ok(SignedTransaction {
			payload: body.signed_transaction,
		})
	}
}

/// Configuration schema for the wallet bridge.
pub struct BridgeWalletSchema;

impl ConfigSchema for BridgeWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("url", FieldType::String).with_validator(http_url_validator)],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(600),
				},
			)],
		)
		.validate(config)
	}
}

/// Registry for the wallet bridge.
pub struct BridgeWalletRegistry;

impl ImplementationRegistry for BridgeWalletRegistry {
	const NAME: &'static str = "bridge";
	type Factory = WalletFactory;

	fn factory() -> Self::Factory {
		create_bridge_wallet
	}
}

impl WalletRegistry for BridgeWalletRegistry {}

/// Factory function for creating BridgeWallet instances.
pub fn create_bridge_wallet(config: &toml::Value) -> Result<Box<dyn WalletInterface>, WalletError> {
	Ok(Box::new(BridgeWallet::new(config)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const OWNER: &str = "So11111111111111111111111111111111111111112";

	fn config_for(server: &MockServer) -> toml::Value {
		toml::Value::Table(toml::map::Map::from_iter([(
			"url".to_string(),
			toml::Value::String(server.uri()),
		)]))
	}

	async fn mount_connect(server: &MockServer, public_key: &str) {
		Mock::given(method("POST"))
			.and(path("/connect"))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(serde_json::json!({ "publicKey": public_key })),
			)
			.mount(server)
			.await;
	}

	#[test]
	fn test_rejects_missing_url() {
		let config = toml::Value::Table(toml::map::Map::new());
		assert!(matches!(
			BridgeWallet::new(&config),
			Err(WalletError::Configuration(_))
		));
	}

	#[tokio::test]
	async fn test_connect_tracks_address() {
		let server = MockServer::start().await;
		mount_connect(&server, OWNER).await;
		let wallet = BridgeWallet::new(&config_for(&server)).unwrap();

		assert_eq!(wallet.address().await, None);
		let address = wallet.connect().await.unwrap();
		assert_eq!(address.as_str(), OWNER);
		assert_eq!(wallet.address().await, Some(address));
	}

	#[tokio::test]
	async fn test_connect_rejects_invalid_key() {
		let server = MockServer::start().await;
		mount_connect(&server, "not-a-key").await;
		let wallet = BridgeWallet::new(&config_for(&server)).unwrap();

		assert!(matches!(
			wallet.connect().await,
			Err(WalletError::ConnectionFailed(_))
		));
		assert_eq!(wallet.address().await, None);
	}

	#[tokio::test]
	async fn test_sign_sends_payload() {
		let server = MockServer::start().await;
		mount_connect(&server, OWNER).await;
		Mock::given(method("POST"))
			.and(path("/sign"))
			.and(body_json(serde_json::json!({ "transaction": "AQID" })))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(serde_json::json!({ "signedTransaction": "BAUG" })),
			)
			.expect(1)
			.mount(&server)
			.await;
		let wallet = BridgeWallet::new(&config_for(&server)).unwrap();
		wallet.connect().await.unwrap();

		let signed = wallet
			.sign_transaction(&UnsignedTransaction {
				payload: "AQID".to_string(),
				last_valid_block_height: None,
			})
			.await
			.unwrap();
		assert_eq!(signed.payload, "BAUG");
	}

	#[tokio::test]
	async fn test_user_rejection_maps_to_signing_rejected() {
		let server = MockServer::start().await;
		mount_connect(&server, OWNER).await;
		Mock::given(method("POST"))
			.and(path("/sign"))
			.respond_with(
				ResponseTemplate::new(403)
					.set_body_json(serde_json::json!({ "error": "User rejected the request" })),
			)
			.mount(&server)
			.await;
		let wallet = BridgeWallet::new(&config_for(&server)).unwrap();
		wallet.connect().await.unwrap();

		let err = wallet
			.sign_transaction(&UnsignedTransaction {
				payload: "AQID".to_string(),
				last_valid_block_height: None,
			})
			.await
			.unwrap_err();
		match err {
			WalletError::SigningRejected(message) => {
				assert_eq!(message, "User rejected the request")
			},
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_disconnect_clears_even_when_bridge_fails() {
		let server = MockServer::start().await;
		mount_connect(&server, OWNER).await;
		Mock::given(method("POST"))
			.and(path("/disconnect"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;
		let wallet = BridgeWallet::new(&config_for(&server)).unwrap();
		wallet.connect().await.unwrap();

		wallet.disconnect().await.unwrap();
		assert_eq!(wallet.address().await, None);
		assert!(matches!(
			wallet
				.sign_transaction(&UnsignedTransaction {
					payload: "AQID".to_string(),
					last_valid_block_height: None,
				})
				.await,
			Err(WalletError::NotConnected)
		));
	}
}
