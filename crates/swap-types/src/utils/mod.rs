//! Utility functions for common conversions and display formatting.

#[cfg(any(test, feature = "testing"))]
pub mod builders;
pub mod conversion;
pub mod formatting;
pub mod helpers;
pub mod serde_utils;

pub use conversion::{
	decimal_places, from_smallest_unit, percent_to_bps, to_smallest_unit, ConversionError,
};
pub use formatting::{
	format_percentage_change, format_price, format_token_amount, format_wallet_address,
	truncate_id,
};
pub use helpers::{current_timestamp_ms, http_error_message};
