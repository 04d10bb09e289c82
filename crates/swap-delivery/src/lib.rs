//! Chain RPC boundary for the swap client.
//!
//! Broadcasts wallet-signed transactions and reads balances for the
//! connected account. Confirmation tracking is left to the chain node.

use async_trait::async_trait;
use swap_types::{
	Address, ConfigSchema, ImplementationRegistry, SignedTransaction, SwapError, TokenBalance,
	TransactionSignature, SOL_MINT,
};
use thiserror::Error;
use tracing::{debug, info};

/// Re-export implementations
pub mod implementations {
	pub mod rpc;
}

/// Decimal precision of native SOL.
pub const NATIVE_DECIMALS: u8 = 9;

/// Errors that can occur while talking to the chain.
#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	/// The node answered with a JSON-RPC error object.
	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("Invalid transaction: {0}")]
	InvalidTransaction(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl From<DeliveryError> for SwapError {
	fn from(err: DeliveryError) -> Self {
		SwapError::SwapExecutionFailed(err.to_string())
	}
}

/// Trait defining the interface for chain RPC implementations.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait DeliveryInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Submits a signed transaction and returns its signature.
	async fn send_transaction(
		&self,
		tx: &SignedTransaction,
	) -> Result<TransactionSignature, DeliveryError>;

	/// Native balance of `address` in lamports.
	async fn get_balance(&self, address: &Address) -> Result<u64, DeliveryError>;

	/// SPL token balances held by `owner`.
	async fn get_token_balances(&self, owner: &Address) -> Result<Vec<TokenBalance>, DeliveryError>;
}

/// Type alias for delivery factory functions.
pub type DeliveryFactory = fn(&toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError>;

/// Registry trait for delivery implementations.
pub trait DeliveryRegistry: ImplementationRegistry<Factory = DeliveryFactory> {}

/// Get all registered delivery implementations.
pub fn get_all_implementations() -> Vec<(&'static str, DeliveryFactory)> {
	use implementations::rpc;

	vec![(rpc::RpcDeliveryRegistry::NAME, rpc::RpcDeliveryRegistry::factory())]
}

/// Service that broadcasts transactions and gathers wallet balances.
pub struct DeliveryService {
	implementation: Box<dyn DeliveryInterface>,
}

impl DeliveryService {
	pub fn new(implementation: Box<dyn DeliveryInterface>) -> Self {
		Self { implementation }
	}

	/// Broadcasts a signed transaction.
	pub async fn broadcast(
		&self,
		tx: &SignedTransaction,
	) -> Result<TransactionSignature, DeliveryError> {
		let signature = self.implementation.send_transaction(tx).await?;
		info!(signature = %signature, "Transaction broadcast");
		Ok(signature)
	}

	/// All balances of `owner`, native SOL first.
	///
	/// Empty token accounts are skipped.
	pub async fn balances(&self, owner: &Address) -> Result<Vec<TokenBalance>, DeliveryError> {
		let (lamports, tokens) = futures::try_join!(
			self.implementation.get_balance(owner),
			self.implementation.get_token_balances(owner),
		)?;

		let mut balances = Vec::with_capacity(tokens.len() + 1);
		balances.push(TokenBalance {
			mint: SOL_MINT.to_string(),
			amount: lamports,
			decimals: NATIVE_DECIMALS,
		});
		balances.extend(tokens.into_iter().filter(|balance| balance.amount > 0));
		debug!(owner = %owner, count = balances.len(), "Loaded wallet balances");
		Ok(balances)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use swap_types::USDC_MINT;

	const OWNER: &str = "So11111111111111111111111111111111111111112";

	#[tokio::test]
	async fn test_balances_merge_native_and_tokens() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_balance()
			.times(1)
			.returning(|_| Box::pin(async { Ok(2_500_000_000) }));
		mock.expect_get_token_balances().times(1).returning(|_| {
			Box::pin(async {
				Ok(vec![
					TokenBalance {
						mint: USDC_MINT.to_string(),
						amount: 10_000_000,
						decimals: 6,
					},
					TokenBalance {
						mint: "empty".to_string(),
						amount: 0,
						decimals: 6,
					},
				])
			})
		});
		let service = DeliveryService::new(Box::new(mock));

		let balances = service.balances(&Address::from(OWNER)).await.unwrap();
		assert_eq!(balances.len(), 2);
		assert_eq!(balances[0].mint, SOL_MINT);
		assert_eq!(balances[0].amount, 2_500_000_000);
		assert_eq!(balances[0].decimals, NATIVE_DECIMALS);
		assert_eq!(balances[1].mint, USDC_MINT);
	}

	#[tokio::test]
	async fn test_balances_propagate_rpc_errors() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_balance().returning(|_| {
			Box::pin(async {
				Err(DeliveryError::Rpc {
					code: -32602,
					message: "Invalid param".to_string(),
				})
			})
		});
		mock.expect_get_token_balances()
			.returning(|_| Box::pin(async { Ok(Vec::new()) }));
		let service = DeliveryService::new(Box::new(mock));

		assert!(matches!(
			service.balances(&Address::from(OWNER)).await,
			Err(DeliveryError::Rpc { code: -32602, .. })
		));
	}

	#[tokio::test]
	async fn test_broadcast_returns_signature() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_send_transaction()
			.withf(|tx| tx.payload == "AQID")
			.returning(|_| Box::pin(async { Ok(TransactionSignature("5sig".to_string())) }));
		let service = DeliveryService::new(Box::new(mock));

		let signature = service
			.broadcast(&SignedTransaction {
				payload: "AQID".to_string(),
			})
			.await
			.unwrap();
		assert_eq!(signature.0, "5sig");
	}
}
