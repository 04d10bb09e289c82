//! String formatting utilities for display.

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};

/// Truncates a long identifier (signature, mint) for display.
///
/// Shows only the first 8 characters followed by "..." for longer strings.
pub fn truncate_id(id: &str) -> String {
	if id.chars().count() <= 8 {
		id.to_string()
	} else {
		let prefix: String = id.chars().take(8).collect();
		format!("{prefix}...")
	}
}

/// Shortens a wallet address to `start...end`.
pub fn format_wallet_address(address: &str, start_chars: usize, end_chars: usize) -> String {
	let chars: Vec<char> = address.chars().collect();
	if chars.len() <= start_chars + end_chars {
		return address.to_string();
	}
	let head: String = chars[..start_chars].iter().collect();
	let tail: String = chars[chars.len() - end_chars..].iter().collect();
	format!("{head}...{tail}")
}

/// Formats a USD price with precision scaled to its magnitude.
pub fn format_price(price: f64) -> String {
	if price <= 0.0 || !price.is_finite() {
		return "$0.00".to_string();
	}
	if price < 0.001 {
		format!("${price:.8}")
	} else if price < 0.01 {
		format!("${price:.6}")
	} else if price < 1.0 {
		format!("${price:.4}")
	} else if price < 100.0 {
		format!("${price:.2}")
	} else {
		format!("${}", group_thousands(&format!("{price:.2}")))
	}
}

/// Formats a token amount with precision scaled to its magnitude.
pub fn format_token_amount(amount: Decimal) -> String {
	if amount.is_zero() {
		return "0".to_string();
	}
	let value = amount.to_f64().unwrap_or_default();
	if value < 0.0001 {
		format!("{value:.8}")
	} else if value < 1.0 {
		format!("{value:.6}")
	} else if value < 1000.0 {
		format!("{value:.4}")
	} else {
		group_thousands(
			&amount
				.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
				.normalize()
				.to_string(),
		)
	}
}

/// Formats a signed percentage change such as `+1.25%`.
pub fn format_percentage_change(change: f64) -> String {
	if change == 0.0 || !change.is_finite() {
		return "0.00%".to_string();
	}
	let sign = if change > 0.0 { "+" } else { "" };
	format!("{sign}{change:.2}%")
}

fn group_thousands(number: &str) -> String {
	let (integer, fraction) = match number.split_once('.') {
		Some((integer, fraction)) => (integer, Some(fraction)),
		None => (number, None),
	};
	let digits: Vec<char> = integer.chars().collect();
	let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
	for (i, digit) in digits.iter().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(*digit);
	}
	match fraction {
		Some(fraction) => format!("{grouped}.{fraction}"),
		None => grouped,
	}
}
