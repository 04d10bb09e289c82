//! Transaction payloads and balances exchanged with the chain RPC.
//!
//! Transactions travel through the swap client as opaque base64 strings:
//! the aggregator produces an unsigned payload, the wallet turns it into a
//! signed one and the delivery layer broadcasts it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::from_smallest_unit;

/// Serialized, unsigned transaction returned by the aggregator's swap endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
	/// Base64-encoded versioned transaction.
	#[serde(rename = "swapTransaction")]
	pub payload: String,
	/// Block height after which the transaction's blockhash expires.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_valid_block_height: Option<u64>,
}

/// Serialized transaction carrying the wallet's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
	/// Base64-encoded signed transaction.
	pub payload: String,
}

/// Signature identifying a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionSignature(pub String);

impl fmt::Display for TransactionSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Balance of one token held by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
	/// Token mint address.
	pub mint: String,
	/// Balance in the token's smallest unit.
	pub amount: u64,
	/// Decimal precision of the token.
	pub decimals: u8,
}

impl TokenBalance {
	/// Balance in human units.
	pub fn ui_amount(&self) -> Decimal {
		from_smallest_unit(self.amount, self.decimals)
	}
}
