//! Conversions between human-readable amounts and on-chain smallest units.
//!
//! All arithmetic goes through `rust_decimal` so that "1.1" SOL becomes
//! exactly 1_100_000_000 lamports rather than whatever a binary float
//! happens to round to.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

/// Largest scale `rust_decimal` can represent.
const MAX_SCALE: u32 = 28;

/// Errors produced while converting amounts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Amount must be greater than zero")]
	NonPositive,
	#[error("Amount {0} does not fit in the token's smallest unit")]
	Overflow(String),
}

/// Number of digits after the decimal point in `amount` as typed.
pub fn decimal_places(amount: &str) -> usize {
	amount
		.trim()
		.split_once('.')
		.map(|(_, fraction)| fraction.len())
		.unwrap_or(0)
}

/// Converts a human amount to the token's smallest unit, rounding down.
///
/// Digits beyond the token's precision are truncated, never rounded up, so
/// the converted amount never exceeds what the user typed.
pub fn to_smallest_unit(amount: &str, decimals: u8) -> Result<u64, ConversionError> {
	let trimmed = amount.trim();
	let value = Decimal::from_str(trimmed)
		.map_err(|_| ConversionError::InvalidAmount(trimmed.to_string()))?;
	if value <= Decimal::ZERO {
		return Err(ConversionError::NonPositive);
	}

	if u32::from(decimals) > MAX_SCALE {
		return Err(ConversionError::Overflow(trimmed.to_string()));
	}
	let scale = Decimal::from_i128_with_scale(10i128.pow(u32::from(decimals)), 0);
	let scaled = value
		.checked_mul(scale)
		.ok_or_else(|| ConversionError::Overflow(trimmed.to_string()))?;

	scaled
		.round_dp_with_strategy(0, RoundingStrategy::ToZero)
		.to_u64()
		.ok_or_else(|| ConversionError::Overflow(trimmed.to_string()))
}

/// Converts a smallest-unit amount back to human units.
pub fn from_smallest_unit(amount: u64, decimals: u8) -> Decimal {
	let scale = u32::from(decimals).min(MAX_SCALE);
	Decimal::from_i128_with_scale(i128::from(amount), scale)
}

/// Converts a slippage percentage to basis points, rounding down.
///
/// Negative inputs map to zero; values above `u16::MAX` basis points saturate.
pub fn percent_to_bps(percent: Decimal) -> u16 {
	let saturated = if percent.is_sign_negative() { 0 } else { u16::MAX };
	percent
		.checked_mul(Decimal::ONE_HUNDRED)
		.and_then(|bps| bps.floor().to_u16())
		.unwrap_or(saturated)
}
