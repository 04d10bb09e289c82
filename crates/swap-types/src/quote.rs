//! Quote requests, aggregator responses and route plans.
//!
//! A [`QuoteRequest`] doubles as the validity key of a quote: a quote answers
//! exactly one `(input, output, amount, slippage)` tuple and is discarded as
//! soon as any of them changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::serde_utils::{lenient_f64, lenient_u64};

/// Venue label used for route steps the aggregator did not name.
pub const UNKNOWN_VENUE: &str = "Unknown";

/// Parameters of a quote request, in smallest units and basis points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteRequest {
	/// Mint of the token being sold.
	pub input_mint: String,
	/// Mint of the token being bought.
	pub output_mint: String,
	/// Input amount in the input token's smallest unit.
	pub amount: u64,
	/// Maximum tolerated slippage in basis points.
	pub slippage_bps: u16,
}

impl QuoteRequest {
	pub fn new(
		input_mint: impl Into<String>,
		output_mint: impl Into<String>,
		amount: u64,
		slippage_bps: u16,
	) -> Self {
		Self {
			input_mint: input_mint.into(),
			output_mint: output_mint.into(),
			amount,
			slippage_bps,
		}
	}

	/// Query parameters in the aggregator's naming.
	pub fn query_pairs(&self) -> [(&'static str, String); 4] {
		[
			("inputMint", self.input_mint.clone()),
			("outputMint", self.output_mint.clone()),
			("amount", self.amount.to_string()),
			("slippageBps", self.slippage_bps.to_string()),
		]
	}
}

/// Venue details of a single route plan step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
	#[serde(default)]
	pub amm_key: Option<String>,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub input_mint: Option<String>,
	#[serde(default)]
	pub output_mint: Option<String>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub in_amount: Option<u64>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub out_amount: Option<u64>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub fee_amount: Option<u64>,
	#[serde(default)]
	pub fee_mint: Option<String>,
}

/// One hop of the aggregator's route plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
	#[serde(default)]
	pub swap_info: Option<SwapInfo>,
	/// Share of the amount routed through this step.
	#[serde(default)]
	pub percent: u8,
}

/// Quote response as returned by the aggregator.
///
/// Numeric fields are parsed leniently; missing or malformed values are
/// `None` and rejected later by quote validation. The untouched response is
/// kept in `raw` because the swap endpoint expects it back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
	#[serde(default)]
	pub input_mint: Option<String>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub in_amount: Option<u64>,
	#[serde(default)]
	pub output_mint: Option<String>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub out_amount: Option<u64>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub other_amount_threshold: Option<u64>,
	#[serde(default)]
	pub slippage_bps: Option<u16>,
	#[serde(default, deserialize_with = "lenient_f64")]
	pub price_impact_pct: Option<f64>,
	#[serde(default)]
	pub route_plan: Vec<RoutePlanStep>,
	#[serde(skip)]
	pub raw: Value,
}

impl QuoteResponse {
	/// Parses a response body, keeping the raw JSON alongside.
	pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
		let mut response: QuoteResponse = serde_json::from_value(value.clone())?;
		response.raw = value;
		Ok(response)
	}
}

/// A route step reduced to what the swap client displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
	/// Venue label, if the aggregator provided one.
	pub venue: Option<String>,
	/// Share of the amount routed through this step.
	pub percent: u8,
}

/// Summary of a quote's route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
	/// Number of hops.
	pub steps: usize,
	/// Distinct venue labels in route order.
	pub venues: Vec<String>,
}

/// A quote held by the swap client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
	/// The request this quote answers.
	pub request: QuoteRequest,
	/// Output amount in the output token's smallest unit.
	pub out_amount: u64,
	/// Estimated price impact in percent.
	pub price_impact_pct: f64,
	/// Ordered route steps.
	pub route: Vec<RouteStep>,
	/// Raw aggregator response, sent back when requesting the transaction.
	pub payload: Value,
}

impl Quote {
	/// Builds a quote from the aggregator's response to `request`.
	pub fn from_response(request: QuoteRequest, response: QuoteResponse) -> Self {
		let route = response
			.route_plan
			.iter()
			.map(|step| RouteStep {
				venue: step.swap_info.as_ref().and_then(|info| info.label.clone()),
				percent: step.percent,
			})
			.collect();
		Self {
			request,
			out_amount: response.out_amount.unwrap_or(0),
			price_impact_pct: response.price_impact_pct.unwrap_or(0.0),
			route,
			payload: response.raw,
		}
	}

	/// Whether this quote was produced for exactly `request`.
	pub fn matches(&self, request: &QuoteRequest) -> bool {
		&self.request == request
	}

	pub fn route_info(&self) -> RouteInfo {
		let mut venues: Vec<String> = Vec::new();
		for step in &self.route {
			let venue = step.venue.as_deref().unwrap_or(UNKNOWN_VENUE);
			if !venues.iter().any(|v| v == venue) {
				venues.push(venue.to_string());
			}
		}
		RouteInfo {
			steps: self.route.len(),
			venues,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn sample_response() -> Value {
		json!({
			"inputMint": "So11111111111111111111111111111111111111112",
			"inAmount": "1000000000",
			"outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
			"outAmount": "151234567",
			"otherAmountThreshold": "150478394",
			"swapMode": "ExactIn",
			"slippageBps": 50,
			"priceImpactPct": "0.012",
			"routePlan": [
				{ "swapInfo": { "ammKey": "a", "label": "Orca" }, "percent": 60 },
				{ "swapInfo": { "ammKey": "b", "label": "Raydium" }, "percent": 40 },
				{ "swapInfo": { "ammKey": "c", "label": "Orca" }, "percent": 100 },
				{ "percent": 100 }
			]
		})
	}

	#[test]
	fn test_response_parsing_is_lenient() {
		let response = QuoteResponse::from_value(sample_response()).unwrap();
		assert_eq!(response.out_amount, Some(151_234_567));
		assert_eq!(response.in_amount, Some(1_000_000_000));
		assert_eq!(response.price_impact_pct, Some(0.012));
		assert_eq!(response.route_plan.len(), 4);
		assert_eq!(response.raw["swapMode"], "ExactIn");
	}

	#[test]
	fn test_quote_keeps_raw_payload() {
		let request = QuoteRequest::new(
			"So11111111111111111111111111111111111111112",
			"EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
			1_000_000_000,
			50,
		);
		let response = QuoteResponse::from_value(sample_response()).unwrap();
		let quote = Quote::from_response(request.clone(), response);

		assert!(quote.matches(&request));
		assert_eq!(quote.payload, sample_response());
		assert_eq!(quote.out_amount, 151_234_567);
	}

	#[test]
	fn test_route_info_deduplicates_venues() {
		let request = QuoteRequest::new("a", "b", 1, 50);
		let response = QuoteResponse::from_value(sample_response()).unwrap();
		let info = Quote::from_response(request, response).route_info();

		assert_eq!(info.steps, 4);
		assert_eq!(info.venues, vec!["Orca", "Raydium", UNKNOWN_VENUE]);
	}

	#[test]
	fn test_missing_fields_default() {
		let response = QuoteResponse::from_value(json!({ "outAmount": "abc" })).unwrap();
		let quote = Quote::from_response(QuoteRequest::new("a", "b", 1, 0), response);
		assert_eq!(quote.out_amount, 0);
		assert_eq!(quote.price_impact_pct, 0.0);
		assert!(quote.route.is_empty());
		assert_eq!(quote.route_info(), RouteInfo::default());
	}

	#[test]
	fn test_query_pairs() {
		let request = QuoteRequest::new("in", "out", 1_000_000_000, 50);
		let pairs = request.query_pairs();
		assert_eq!(pairs[0], ("inputMint", "in".to_string()));
		assert_eq!(pairs[2], ("amount", "1000000000".to_string()));
		assert_eq!(pairs[3], ("slippageBps", "50".to_string()));
	}
}
