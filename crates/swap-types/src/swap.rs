//! Swap parameters, history records and the swap failure taxonomy.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{current_timestamp_ms, Address, TransactionSignature};

/// Default slippage tolerance in percent.
pub const DEFAULT_SLIPPAGE_PERCENT: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
/// Upper bound accepted for slippage tolerance in percent.
pub const MAX_SLIPPAGE_PERCENT: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
/// Default transaction deadline in minutes.
pub const DEFAULT_DEADLINE_MINUTES: u32 = 20;
/// Number of swaps kept in the recent-swap history.
pub const RECENT_SWAPS_LIMIT: usize = 10;

/// User-facing swap inputs as typed into the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParams {
	/// Mint of the token being sold.
	pub from: String,
	/// Mint of the token being bought.
	pub to: String,
	/// Human-readable input amount, e.g. `"1.5"`.
	pub amount: String,
	/// Slippage tolerance in percent.
	pub slippage_percent: Decimal,
}

impl SwapParams {
	pub fn new(
		from: impl Into<String>,
		to: impl Into<String>,
		amount: impl Into<String>,
		slippage_percent: Decimal,
	) -> Self {
		Self {
			from: from.into(),
			to: to.into(),
			amount: amount.into(),
			slippage_percent,
		}
	}
}

/// Body of the aggregator's swap-transaction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionRequest {
	/// The quote response exactly as the aggregator returned it.
	pub quote_response: Value,
	/// Wallet that signs and pays for the transaction.
	pub user_public_key: String,
	pub wrap_and_unwrap_sol: bool,
	pub dynamic_compute_unit_limit: bool,
	pub prioritization_fee_lamports: String,
}

impl SwapTransactionRequest {
	pub fn new(quote_response: Value, user: &Address) -> Self {
		Self {
			quote_response,
			user_public_key: user.to_string(),
			wrap_and_unwrap_sol: true,
			dynamic_compute_unit_limit: true,
			prioritization_fee_lamports: "auto".to_string(),
		}
	}
}

/// Lifecycle phase of the swap orchestrator.
///
/// Allowed transitions are enforced by the orchestrator's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapPhase {
	/// Nothing requested, or the inputs were invalid.
	Idle,
	/// Inputs are being checked locally.
	Validating,
	/// A quote request is in flight.
	Quoting,
	/// A usable quote is held.
	Quoted,
	/// A swap is being built, signed and broadcast.
	Swapping,
	/// The last swap was acknowledged by the network.
	Settled,
	/// The last swap failed.
	SwapFailed,
}

impl std::fmt::Display for SwapPhase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			SwapPhase::Idle => "idle",
			SwapPhase::Validating => "validating",
			SwapPhase::Quoting => "quoting",
			SwapPhase::Quoted => "quoted",
			SwapPhase::Swapping => "swapping",
			SwapPhase::Settled => "settled",
			SwapPhase::SwapFailed => "swap_failed",
		};
		f.write_str(name)
	}
}

/// Outcome recorded for a swap in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
	Success,
	Failed,
}

/// Entry of the recent-swap history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
	/// Creation time in milliseconds, unique enough to identify the entry.
	pub id: u64,
	pub signature: String,
	pub from_token: String,
	pub to_token: String,
	pub from_amount: String,
	pub to_amount: String,
	/// RFC 3339 creation time.
	pub timestamp: String,
	pub status: SwapStatus,
}

impl SwapRecord {
	/// Records a settled swap.
	pub fn success(signature: &TransactionSignature, params: &SwapParams, to_amount: String) -> Self {
		Self {
			id: current_timestamp_ms(),
			signature: signature.to_string(),
			from_token: params.from.clone(),
			to_token: params.to.clone(),
			from_amount: params.amount.clone(),
			to_amount,
			timestamp: Utc::now().to_rfc3339(),
			status: SwapStatus::Success,
		}
	}
}

/// Failures surfaced by the swap orchestrator.
///
/// Every variant renders as a message suitable for display; none of them
/// leaves the orchestrator unusable.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapError {
	/// The inputs failed local validation; no request was sent.
	#[error("{0}")]
	InvalidParameters(String),
	/// The aggregator answered with a quote that cannot be used.
	#[error("{0}")]
	QuoteRejected(String),
	/// A remote call failed.
	#[error("{message}")]
	Network {
		status: Option<u16>,
		message: String,
	},
	/// The swap could not start or building, signing or broadcasting it
	/// failed. Also returned for a quote request made while a swap runs.
	#[error("{0}")]
	SwapExecutionFailed(String),
}

impl SwapError {
	/// HTTP status behind a network failure, when known.
	pub fn status(&self) -> Option<u16> {
		match self {
			SwapError::Network { status, .. } => *status,
			_ => None,
		}
	}

	/// Prefixes the message with `context`, e.g. `"Failed to get quote"`.
	pub fn with_context(self, context: &str) -> Self {
		match self {
			SwapError::InvalidParameters(m) => SwapError::InvalidParameters(format!("{context}: {m}")),
			SwapError::QuoteRejected(m) => SwapError::QuoteRejected(format!("{context}: {m}")),
			SwapError::Network { status, message } => SwapError::Network {
				status,
				message: format!("{context}: {message}"),
			},
			SwapError::SwapExecutionFailed(m) => {
				SwapError::SwapExecutionFailed(format!("{context}: {m}"))
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_constants() {
		assert_eq!(DEFAULT_SLIPPAGE_PERCENT, Decimal::from_str("0.5").unwrap());
		assert_eq!(MAX_SLIPPAGE_PERCENT, Decimal::from(50));
	}

	#[test]
	fn test_swap_transaction_request_wire_format() {
		let quote = serde_json::json!({ "outAmount": "10" });
		let user = Address::from("So11111111111111111111111111111111111111112");
		let body = serde_json::to_value(SwapTransactionRequest::new(quote.clone(), &user)).unwrap();

		assert_eq!(body["quoteResponse"], quote);
		assert_eq!(body["userPublicKey"], user.as_str());
		assert_eq!(body["wrapAndUnwrapSol"], true);
		assert_eq!(body["dynamicComputeUnitLimit"], true);
		assert_eq!(body["prioritizationFeeLamports"], "auto");
	}

	#[test]
	fn test_swap_record_success() {
		let params = SwapParams::new("a", "b", "1.5", DEFAULT_SLIPPAGE_PERCENT);
		let signature = TransactionSignature("5sig".to_string());
		let record = SwapRecord::success(&signature, &params, "150.2".to_string());

		assert_eq!(record.signature, "5sig");
		assert_eq!(record.from_amount, "1.5");
		assert_eq!(record.status, SwapStatus::Success);
		assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
		assert_eq!(
			serde_json::to_value(record.status).unwrap(),
			serde_json::json!("success")
		);
	}

	#[test]
	fn test_error_messages() {
		let err = SwapError::InvalidParameters("Invalid amount".to_string());
		assert_eq!(err.to_string(), "Invalid amount");

		let err = SwapError::Network {
			status: Some(429),
			message: "Failed to get quote: HTTP 429: Too Many Requests".to_string(),
		};
		assert_eq!(err.status(), Some(429));
		assert!(err.to_string().contains("429"));
		assert_eq!(SwapError::QuoteRejected("No route found".into()).status(), None);

		let err = SwapError::Network {
			status: Some(500),
			message: "HTTP 500: Internal Server Error".to_string(),
		}
		.with_context("Failed to get quote");
		assert_eq!(
			err.to_string(),
			"Failed to get quote: HTTP 500: Internal Server Error"
		);
		assert_eq!(err.status(), Some(500));
	}
}
