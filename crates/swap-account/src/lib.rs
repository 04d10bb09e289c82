//! Wallet boundary for the swap client.
//!
//! Key custody and signing live in an external wallet. This module tracks
//! which account is connected, forwards unsigned transactions to the wallet
//! for signing, and announces connection changes as [`WalletEvent`]s.

use async_trait::async_trait;
use swap_types::{
	Address, ConfigSchema, ImplementationRegistry, SignedTransaction, SwapError,
	UnsignedTransaction, WalletEvent,
};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// Re-export implementations
pub mod implementations {
	pub mod bridge;
}

/// Capacity of the wallet event channel.
const EVENT_CAPACITY: usize = 64;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
	#[error("Wallet not connected")]
	NotConnected,
	#[error("Connection failed: {0}")]
	ConnectionFailed(String),
	/// The wallet refused or failed to sign.
	#[error("Signing rejected: {0}")]
	SigningRejected(String),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl From<WalletError> for SwapError {
	fn from(err: WalletError) -> Self {
		SwapError::SwapExecutionFailed(err.to_string())
	}
}

/// Trait defining the interface for wallet implementations.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait WalletInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Asks the wallet to connect and returns the approved account.
	async fn connect(&self) -> Result<Address, WalletError>;

	async fn disconnect(&self) -> Result<(), WalletError>;

	/// Account the wallet currently exposes, if connected.
	async fn address(&self) -> Option<Address>;

	/// Has the wallet sign a serialized transaction.
	async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, WalletError>;
}

/// Type alias for wallet factory functions.
pub type WalletFactory = fn(&toml::Value) -> Result<Box<dyn WalletInterface>, WalletError>;

/// Registry trait for wallet implementations.
pub trait WalletRegistry: ImplementationRegistry<Factory = WalletFactory> {}

/// Get all registered wallet implementations.
pub fn get_all_implementations() -> Vec<(&'static str, WalletFactory)> {
	use implementations::bridge;

	vec![(bridge::BridgeWalletRegistry::NAME, bridge::BridgeWalletRegistry::factory())]
}

/// Service that tracks the connected wallet and publishes connection events.
pub struct WalletService {
	implementation: Box<dyn WalletInterface>,
	address: RwLock<Option<Address>>,
	events: broadcast::Sender<WalletEvent>,
}

impl WalletService {
	pub fn new(implementation: Box<dyn WalletInterface>) -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			implementation,
			address: RwLock::new(None),
			events,
		}
	}

	/// Receives every wallet event published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
		self.events.subscribe()
	}

	fn publish(&self, event: WalletEvent) {
		// Nobody listening is fine.
		let _ = self.events.send(event);
	}

	pub async fn connect(&self) -> Result<Address, WalletError> {
		let address = self.implementation.connect().await?;
		*self.address.write().await = Some(address.clone());
		info!(address = %address, "Wallet connected");
		self.publish(WalletEvent::Connected {
			address: address.clone(),
		});
		Ok(address)
	}

	pub async fn disconnect(&self) -> Result<(), WalletError> {
		self.implementation.disconnect().await?;
		let previous = self.address.write().await.take();
		if previous.is_some() {
			info!("Wallet disconnected");
			self.publish(WalletEvent::Disconnected);
		}
		Ok(())
	}

	/// Connected account as last reported.
	pub async fn address(&self) -> Option<Address> {
		self.address.read().await.clone()
	}

	pub async fn is_connected(&self) -> bool {
		self.address.read().await.is_some()
	}

	/// Records an account switch made inside the wallet.
	pub async fn account_changed(&self, address: Address) {
		let mut current = self.address.write().await;
		if current.as_ref() == Some(&address) {
			return;
		}
		debug!(address = %address, "Wallet account changed");
		*current = Some(address.clone());
		drop(current);
		self.publish(WalletEvent::AccountChanged { address });
	}

	/// Re-reads the account from the wallet and publishes any difference.
	pub async fn refresh(&self) -> Option<Address> {
		let reported = self.implementation.address().await;
		match reported.clone() {
			Some(address) => self.account_changed(address).await,
			None => {
				if self.address.write().await.take().is_some() {
					self.publish(WalletEvent::Disconnected);
				}
			},
		}
		reported
	}

	/// Signs a transaction with the connected wallet.
	pub async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction, WalletError> {
		if !self.is_connected().await {
			return Err(WalletError::NotConnected);
		}
		self.implementation.sign_transaction(tx).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const OWNER: &str = "So11111111111111111111111111111111111111112";
	const OTHER: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

	fn unsigned() -> UnsignedTransaction {
		UnsignedTransaction {
			payload: "AQID".to_string(),
			last_valid_block_height: None,
		}
	}

	#[tokio::test]
	async fn test_connect_and_disconnect_publish_events() {
		let mut mock = MockWalletInterface::new();
		mock.expect_connect()
			.returning(|| Box::pin(async { Ok(Address::from(OWNER)) }));
		mock.expect_disconnect()
			.returning(|| Box::pin(async { Ok(()) }));
		let service = WalletService::new(Box::new(mock));
		let mut events = service.subscribe();

		let address = service.connect().await.unwrap();
		assert_eq!(address.as_str(), OWNER);
		assert!(service.is_connected().await);
		assert_eq!(
			events.recv().await.unwrap(),
			WalletEvent::Connected {
				address: Address::from(OWNER)
			}
		);

		service.disconnect().await.unwrap();
		assert_eq!(service.address().await, None);
		assert_eq!(events.recv().await.unwrap(), WalletEvent::Disconnected);
	}

	#[tokio::test]
	async fn test_sign_requires_connection() {
		let mut mock = MockWalletInterface::new();
		mock.expect_sign_transaction().times(0);
		let service = WalletService::new(Box::new(mock));

		assert!(matches!(
			service.sign(&unsigned()).await,
			Err(WalletError::NotConnected)
		));
	}

	#[tokio::test]
	async fn test_sign_delegates_when_connected() {
		let mut mock = MockWalletInterface::new();
		mock.expect_connect()
			.returning(|| Box::pin(async { Ok(Address::from(OWNER)) }));
		mock.expect_sign_transaction().times(1).returning(|tx| {
			let payload = format!("signed:{}", tx.payload);
			Box::pin(async move { Ok(SignedTransaction { payload }) })
		});
		let service = WalletService::new(Box::new(mock));
		service.connect().await.unwrap();

		let signed = service.sign(&unsigned()).await.unwrap();
		assert_eq!(signed.payload, "signed:AQID");
	}

	#[tokio::test]
	async fn test_account_change_and_refresh() {
		let mut mock = MockWalletInterface::new();
		mock.expect_connect()
			.returning(|| Box::pin(async { Ok(Address::from(OWNER)) }));
		mock.expect_address()
			.times(1)
			.returning(|| Box::pin(async { None }));
		let service = WalletService::new(Box::new(mock));
		service.connect().await.unwrap();
		let mut events = service.subscribe();

		// Same account: no event.
		service.account_changed(Address::from(OWNER)).await;
		service.account_changed(Address::from(OTHER)).await;
		assert_eq!(
			events.recv().await.unwrap(),
			WalletEvent::AccountChanged {
				address: Address::from(OTHER)
			}
		);

		assert_eq!(service.refresh().await, None);
		assert_eq!(events.recv().await.unwrap(), WalletEvent::Disconnected);
		assert!(!service.is_connected().await);
	}

	#[test]
	fn test_registered_implementations() {
		let impls = get_all_implementations();
		assert!(impls.iter().any(|(name, _)| *name == "bridge"));
	}
}
