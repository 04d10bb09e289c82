//! Token metadata registry.
//!
//! Token descriptors are immutable and come from a static table of popular
//! Solana mints. Lookups for unknown mints never fail: a fallback descriptor
//! is synthesized from the mint address itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wrapped SOL mint.
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
/// USD Coin mint.
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Decimal precision assumed for mints missing from the registry.
pub const FALLBACK_DECIMALS: u8 = 6;

const TOKEN_LIST_ASSETS: &str =
	"https://raw.githubusercontent.com/solana-labs/token-list/main/assets/mainnet";

/// (mint, symbol, name, decimals)
const POPULAR_TOKENS: &[(&str, &str, &str, u8)] = &[
	(SOL_MINT, "SOL", "Solana", 9),
	(USDC_MINT, "USDC", "USD Coin", 6),
	("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT", "Tether USD", 6),
	("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So", "mSOL", "Marinade staked SOL", 9),
	("7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs", "ETH", "Ethereum (Portal)", 8),
	(
		"A9mUU4qviSctJVPJdBJWkb28deg915LYJKrzQ19ji3FM",
		"USDCet",
		"USD Coin (Portal from Ethereum)",
		6,
	),
	("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "BONK", "Bonk", 5),
	("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", "JUP", "Jupiter", 6),
	("jtojtomepa8beP8AuQc6eXt5FriJwfFMwQx2v2f9mCL", "JITO", "Jito Staked SOL", 9),
	("rndrizKT3MK1iimdxRdWabcF7Zg7AR5T4nud4EkHBof", "RND", "Render Token", 8),
];

/// Metadata describing a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
	/// Mint address.
	pub id: String,
	/// Ticker symbol.
	pub symbol: String,
	/// Display name.
	pub name: String,
	/// Decimal precision of the smallest unit.
	pub decimals: u8,
	/// Icon reference.
	pub logo_uri: String,
}

impl TokenDescriptor {
	fn popular(id: &str, symbol: &str, name: &str, decimals: u8) -> Self {
		Self {
			id: id.to_string(),
			symbol: symbol.to_string(),
			name: name.to_string(),
			decimals,
			logo_uri: logo_uri_for(id),
		}
	}

	/// Builds the descriptor used for mints missing from the registry.
	pub fn fallback(id: &str) -> Self {
		let prefix: String = id.chars().take(8).collect();
		Self {
			id: id.to_string(),
			symbol: format!("{prefix}..."),
			name: "Unknown Token".to_string(),
			decimals: FALLBACK_DECIMALS,
			logo_uri: logo_uri_for(id),
		}
	}
}

fn logo_uri_for(id: &str) -> String {
	format!("{TOKEN_LIST_ASSETS}/{id}/logo.png")
}

/// Returns true when `id` is a base58 string decoding to a 32-byte key.
pub fn is_valid_token_id(id: &str) -> bool {
	if !(32..=44).contains(&id.len()) {
		return false;
	}
	matches!(bs58::decode(id).into_vec(), Ok(bytes) if bytes.len() == 32)
}

/// Lookup table from mint address to token descriptor.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
	tokens: HashMap<String, TokenDescriptor>,
}

impl TokenRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a registry holding the popular Solana tokens.
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		for (id, symbol, name, decimals) in POPULAR_TOKENS {
			registry.register(TokenDescriptor::popular(id, symbol, name, *decimals));
		}
		registry
	}

	/// Adds or replaces a descriptor.
	pub fn register(&mut self, token: TokenDescriptor) {
		self.tokens.insert(token.id.clone(), token);
	}

	/// Returns the registered descriptor, if any.
	pub fn get(&self, id: &str) -> Option<&TokenDescriptor> {
		self.tokens.get(id)
	}

	/// Returns the registered descriptor or a synthesized fallback.
	pub fn resolve(&self, id: &str) -> TokenDescriptor {
		self.get(id)
			.cloned()
			.unwrap_or_else(|| TokenDescriptor::fallback(id))
	}

	/// Whether the mint is present in the registry.
	pub fn is_supported(&self, id: &str) -> bool {
		self.tokens.contains_key(id)
	}

	/// All registered mint addresses, sorted.
	pub fn ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.tokens.keys().cloned().collect();
		ids.sort();
		ids
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_registry_contents() {
		let registry = TokenRegistry::with_defaults();
		assert_eq!(registry.len(), POPULAR_TOKENS.len());

		let sol = registry.resolve(SOL_MINT);
		assert_eq!(sol.symbol, "SOL");
		assert_eq!(sol.decimals, 9);

		let usdc = registry.resolve(USDC_MINT);
		assert_eq!(usdc.decimals, 6);
		assert!(usdc.logo_uri.ends_with(&format!("{USDC_MINT}/logo.png")));
	}

	#[test]
	fn test_unknown_mint_falls_back() {
		let registry = TokenRegistry::with_defaults();
		let mint = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
		assert!(!registry.is_supported(mint));

		let token = registry.resolve(mint);
		assert_eq!(token.symbol, "9xQeWvG8...");
		assert_eq!(token.name, "Unknown Token");
		assert_eq!(token.decimals, FALLBACK_DECIMALS);
	}

	#[test]
	fn test_token_id_validation() {
		for (id, _, _, _) in POPULAR_TOKENS {
			assert!(is_valid_token_id(id), "{id} should be valid");
		}
		assert!(!is_valid_token_id("SOL"));
		// '0' is outside the base58 alphabet
		assert!(!is_valid_token_id("0o11111111111111111111111111111111111111112"));
		assert!(!is_valid_token_id(""));
	}

	#[test]
	fn test_ids_are_sorted() {
		let ids = TokenRegistry::with_defaults().ids();
		let mut sorted = ids.clone();
		sorted.sort();
		assert_eq!(ids, sorted);
	}
}
