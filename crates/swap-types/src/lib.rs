//! Common types module for the swap client.
//!
//! This module defines the data types shared by every swap component: token
//! metadata, quotes and route plans, swap parameters and the failure taxonomy,
//! price tables, wallet and delivery payloads, and the events published to
//! subscribers. It also hosts the sliding-window rate limiter used to gate
//! every outbound API call.

/// Wallet identity types.
pub mod account;
/// Transaction payloads and balances exchanged with the chain RPC.
pub mod delivery;
/// Event types published to UI subscribers.
pub mod events;
/// Price entries and price tables.
pub mod pricing;
/// Quote requests, aggregator responses and route plans.
pub mod quote;
/// Sliding-window rate limiter shared by all API families.
pub mod rate_limit;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Swap parameters, history records and the swap failure taxonomy.
pub mod swap;
/// Static token registry and token identifier validation.
pub mod token;
/// Utility functions for unit conversion and display formatting.
pub mod utils;
/// Configuration validation types for implementation tables.
pub mod validation;

pub use account::*;
pub use delivery::*;
pub use events::*;
pub use pricing::*;
pub use quote::*;
pub use rate_limit::{RateLimitConfig, RateLimitStats, RateLimiter};
pub use registry::ImplementationRegistry;
pub use swap::*;
pub use token::*;
pub use utils::{
	current_timestamp_ms, format_percentage_change, format_price, format_token_amount,
	format_wallet_address, from_smallest_unit, http_error_message, percent_to_bps,
	to_smallest_unit, truncate_id, ConversionError,
};
pub use validation::*;
