//! Wallet identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A wallet public key in its base58 string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
	/// Creates an address from anything string-like.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the address as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Checks that the address decodes to a 32-byte public key.
	pub fn is_valid(&self) -> bool {
		crate::token::is_valid_token_id(&self.0)
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Address {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_address_validity() {
		assert!(Address::from("So11111111111111111111111111111111111111112").is_valid());
		assert!(!Address::from("not-a-key").is_valid());
		assert!(!Address::from("").is_valid());
	}

	#[test]
	fn test_address_serializes_as_plain_string() {
		let address = Address::from("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
		let json = serde_json::to_string(&address).unwrap();
		assert_eq!(json, "\"EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v\"");
	}
}
