//! Input and quote validation.
//!
//! Swap parameters are checked locally before any request is sent; quotes
//! are checked before the orchestrator commits them.

use rust_decimal::Decimal;
use std::str::FromStr;
use swap_types::utils::decimal_places;
use swap_types::{is_valid_token_id, Quote, SwapParams, MAX_SLIPPAGE_PERCENT};

/// Checks swap inputs, collecting every failure.
///
/// Messages are joined by ", " when surfaced to the user.
pub fn validate_swap_params(params: &SwapParams, max_decimals: u32) -> Result<(), Vec<String>> {
	let mut errors = Vec::new();

	if !is_valid_token_id(&params.from) {
		errors.push("Invalid from token".to_string());
	}
	if !is_valid_token_id(&params.to) {
		errors.push("Invalid to token".to_string());
	}
	if params.from == params.to {
		errors.push("Cannot swap same token".to_string());
	}
	if !is_valid_amount(&params.amount, max_decimals) {
		errors.push("Invalid amount".to_string());
	}
	if !is_valid_slippage(params.slippage_percent) {
		errors.push(format!(
			"Slippage must be between 0 and {MAX_SLIPPAGE_PERCENT}%"
		));
	}

	if errors.is_empty() {
		Ok(())
	} else {
		Err(errors)
	}
}

/// A positive decimal number with at most `max_decimals` fractional digits.
pub fn is_valid_amount(amount: &str, max_decimals: u32) -> bool {
	let trimmed = amount.trim();
	if trimmed.is_empty() {
		return false;
	}
	match Decimal::from_str(trimmed) {
		Ok(value) if value > Decimal::ZERO => decimal_places(trimmed) <= max_decimals as usize,
		_ => false,
	}
}

pub fn is_valid_slippage(percent: Decimal) -> bool {
	percent >= Decimal::ZERO && percent <= MAX_SLIPPAGE_PERCENT
}

/// Checks a quote before it is committed.
///
/// Returns an advisory warning when the price impact exceeds
/// `impact_warning_pct`; such a quote is still usable.
pub fn validate_quote(quote: &Quote, impact_warning_pct: f64) -> Result<Option<String>, String> {
	if quote.out_amount == 0 {
		return Err("Invalid output amount".to_string());
	}
	if quote.route.is_empty() {
		return Err("No route found".to_string());
	}
	if quote.price_impact_pct > impact_warning_pct {
		return Ok(Some(format!(
			"High price impact: {:.2}%",
			quote.price_impact_pct
		)));
	}
	Ok(None)
}

#[cfg(test)]
mod tests {
	use super::*;
	use swap_types::utils::builders::QuoteBuilder;
	use swap_types::{DEFAULT_SLIPPAGE_PERCENT, SOL_MINT, USDC_MINT};

	fn params(from: &str, to: &str, amount: &str) -> SwapParams {
		SwapParams::new(from, to, amount, DEFAULT_SLIPPAGE_PERCENT)
	}

	#[test]
	fn test_valid_params() {
		assert!(validate_swap_params(&params(SOL_MINT, USDC_MINT, "1.5"), 18).is_ok());
	}

	#[test]
	fn test_same_token_rejected() {
		let errors = validate_swap_params(&params(SOL_MINT, SOL_MINT, "1"), 18).unwrap_err();
		assert_eq!(errors, vec!["Cannot swap same token"]);
	}

	#[test]
	fn test_collects_all_errors() {
		let errors = validate_swap_params(&params("bad", "worse", "0"), 18).unwrap_err();
		assert_eq!(
			errors,
			vec![
				"Invalid from token",
				"Invalid to token",
				"Invalid amount"
			]
		);
	}

	#[test]
	fn test_amount_rules() {
		assert!(is_valid_amount("0.000001", 18));
		assert!(!is_valid_amount("", 18));
		assert!(!is_valid_amount("abc", 18));
		assert!(!is_valid_amount("-1", 18));
		assert!(!is_valid_amount("0", 18));
		assert!(!is_valid_amount("1.123", 2));
		assert!(is_valid_amount("1.12", 2));
	}

	#[test]
	fn test_slippage_bounds() {
		let mut p = params(SOL_MINT, USDC_MINT, "1");
		p.slippage_percent = Decimal::from(50);
		assert!(validate_swap_params(&p, 18).is_ok());
		p.slippage_percent = Decimal::from(51);
		assert_eq!(
			validate_swap_params(&p, 18).unwrap_err(),
			vec!["Slippage must be between 0 and 50%"]
		);
		p.slippage_percent = Decimal::from(-1);
		assert!(validate_swap_params(&p, 18).is_err());
	}

	#[test]
	fn test_quote_checks() {
		assert_eq!(validate_quote(&QuoteBuilder::new().build(), 15.0), Ok(None));
		assert_eq!(
			validate_quote(&QuoteBuilder::new().out_amount("0").build(), 15.0),
			Err("Invalid output amount".to_string())
		);
		assert_eq!(
			validate_quote(&QuoteBuilder::new().no_route().build(), 15.0),
			Err("No route found".to_string())
		);
		assert_eq!(
			validate_quote(&QuoteBuilder::new().price_impact_pct(20.0).build(), 15.0),
			Ok(Some("High price impact: 20.00%".to_string()))
		);
		// The threshold itself does not warn.
		assert_eq!(
			validate_quote(&QuoteBuilder::new().price_impact_pct(15.0).build(), 15.0),
			Ok(None)
		);
	}
}
