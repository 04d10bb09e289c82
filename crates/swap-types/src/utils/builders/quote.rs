//! Builder for aggregator quote responses and held quotes.

use serde_json::{json, Value};

use crate::quote::{Quote, QuoteRequest, QuoteResponse};
use crate::token::{SOL_MINT, USDC_MINT};

/// Fluent builder producing either a raw quote response body or a parsed
/// [`Quote`].
///
/// Defaults to 1 SOL → 150 USDC at 0.5% slippage through a single Orca hop.
#[derive(Debug, Clone)]
pub struct QuoteBuilder {
	input_mint: String,
	output_mint: String,
	amount: u64,
	slippage_bps: u16,
	out_amount: String,
	price_impact_pct: String,
	venues: Vec<Option<String>>,
}

impl Default for QuoteBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl QuoteBuilder {
	pub fn new() -> Self {
		Self {
			input_mint: SOL_MINT.to_string(),
			output_mint: USDC_MINT.to_string(),
			amount: 1_000_000_000,
			slippage_bps: 50,
			out_amount: "150000000".to_string(),
			price_impact_pct: "0.01".to_string(),
			venues: vec![Some("Orca".to_string())],
		}
	}

	/// Copies mints, amount and slippage from a request.
	pub fn for_request(mut self, request: &QuoteRequest) -> Self {
		self.input_mint = request.input_mint.clone();
		self.output_mint = request.output_mint.clone();
		self.amount = request.amount;
		self.slippage_bps = request.slippage_bps;
		self
	}

	pub fn input_mint(mut self, mint: &str) -> Self {
		self.input_mint = mint.to_string();
		self
	}

	pub fn output_mint(mut self, mint: &str) -> Self {
		self.output_mint = mint.to_string();
		self
	}

	pub fn amount(mut self, amount: u64) -> Self {
		self.amount = amount;
		self
	}

	pub fn slippage_bps(mut self, bps: u16) -> Self {
		self.slippage_bps = bps;
		self
	}

	/// Output amount exactly as the aggregator would send it.
	pub fn out_amount(mut self, out_amount: &str) -> Self {
		self.out_amount = out_amount.to_string();
		self
	}

	pub fn price_impact_pct(mut self, pct: f64) -> Self {
		self.price_impact_pct = pct.to_string();
		self
	}

	/// Replaces the route; `None` produces a step without a label.
	pub fn venues(mut self, venues: Vec<Option<&str>>) -> Self {
		self.venues = venues.into_iter().map(|v| v.map(str::to_string)).collect();
		self
	}

	pub fn no_route(mut self) -> Self {
		self.venues.clear();
		self
	}

	pub fn request(&self) -> QuoteRequest {
		QuoteRequest::new(
			self.input_mint.clone(),
			self.output_mint.clone(),
			self.amount,
			self.slippage_bps,
		)
	}

	/// Response body in the aggregator's wire format.
	pub fn build_json(&self) -> Value {
		let share = if self.venues.is_empty() {
			0
		} else {
			100 / self.venues.len()
		};
		let route_plan: Vec<Value> = self
			.venues
			.iter()
			.enumerate()
			.map(|(i, venue)| {
				let mut swap_info = json!({ "ammKey": format!("amm{i}") });
				if let Some(label) = venue {
					swap_info["label"] = json!(label);
				}
				json!({ "swapInfo": swap_info, "percent": share })
			})
			.collect();

		json!({
			"inputMint": self.input_mint,
			"inAmount": self.amount.to_string(),
			"outputMint": self.output_mint,
			"outAmount": self.out_amount,
			"otherAmountThreshold": self.out_amount,
			"swapMode": "ExactIn",
			"slippageBps": self.slippage_bps,
			"priceImpactPct": self.price_impact_pct,
			"routePlan": route_plan,
		})
	}

	pub fn build_response(&self) -> QuoteResponse {
		QuoteResponse::from_value(self.build_json()).unwrap_or_default()
	}

	pub fn build(&self) -> Quote {
		Quote::from_response(self.request(), self.build_response())
	}
}
