//! Persisted swap preferences.
//!
//! Holds the settings a user expects to find again on the next start: the
//! slippage and deadline, the last selected token pair, the recent-swap
//! history and the last connected wallet.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swap_types::{
	Address, SwapRecord, DEFAULT_DEADLINE_MINUTES, DEFAULT_SLIPPAGE_PERCENT, RECENT_SWAPS_LIMIT,
	SOL_MINT, USDC_MINT,
};
use tracing::warn;

use crate::{StorageError, StorageService};

const NAMESPACE: &str = "preferences";
const SWAP_ID: &str = "swap";
const WALLET_ID: &str = "wallet";

/// Settings persisted between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapPreferences {
	pub slippage_percent: Decimal,
	pub deadline_minutes: u32,
	pub from_token: String,
	pub to_token: String,
	/// Most recent first.
	pub recent_swaps: Vec<SwapRecord>,
}

impl Default for SwapPreferences {
	fn default() -> Self {
		Self {
			slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
			deadline_minutes: DEFAULT_DEADLINE_MINUTES,
			from_token: SOL_MINT.to_string(),
			to_token: USDC_MINT.to_string(),
			recent_swaps: Vec::new(),
		}
	}
}

impl SwapPreferences {
	/// Puts `record` first and drops the oldest entries past the limit.
	pub fn push_recent(&mut self, record: SwapRecord) {
		self.recent_swaps.insert(0, record);
		self.recent_swaps.truncate(RECENT_SWAPS_LIMIT);
	}
}

/// Reads and writes [`SwapPreferences`] through a [`StorageService`].
#[derive(Clone)]
pub struct PreferencesStore {
	storage: Arc<StorageService>,
}

impl PreferencesStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Loads saved preferences.
	///
	/// Missing or unreadable data yields the defaults; a damaged record is
	/// logged and replaced on the next save.
	pub async fn load(&self) -> SwapPreferences {
		self.load_or(SwapPreferences::default()).await
	}

	/// Like [`load`](Self::load), falling back to `defaults`.
	pub async fn load_or(&self, defaults: SwapPreferences) -> SwapPreferences {
		match self.storage.retrieve_optional(NAMESPACE, SWAP_ID).await {
			Ok(Some(preferences)) => preferences,
			Ok(None) => defaults,
			Err(e) => {
				warn!(error = %e, "Failed to load swap preferences, using defaults");
				defaults
			},
		}
	}

	pub async fn save(&self, preferences: &SwapPreferences) -> Result<(), StorageError> {
		self.storage.store(NAMESPACE, SWAP_ID, preferences).await
	}

	/// Adds a swap to the persisted history and returns the new history.
	pub async fn record_swap(&self, record: SwapRecord) -> Result<Vec<SwapRecord>, StorageError> {
		let mut preferences = self.load().await;
		preferences.push_recent(record);
		self.save(&preferences).await?;
		Ok(preferences.recent_swaps)
	}

	pub async fn recent_swaps(&self) -> Vec<SwapRecord> {
		self.load().await.recent_swaps
	}

	pub async fn clear_history(&self) -> Result<(), StorageError> {
		let mut preferences = self.load().await;
		preferences.recent_swaps.clear();
		self.save(&preferences).await
	}

	/// Wallet connected at the end of the previous session.
	pub async fn last_wallet(&self) -> Option<Address> {
		match self.storage.retrieve_optional(NAMESPACE, WALLET_ID).await {
			Ok(address) => address,
			Err(e) => {
				warn!(error = %e, "Failed to load last wallet");
				None
			},
		}
	}

	/// Remembers the connected wallet, or forgets it when `None`.
	pub async fn set_last_wallet(&self, address: Option<&Address>) -> Result<(), StorageError> {
		match address {
			Some(address) => self.storage.store(NAMESPACE, WALLET_ID, address).await,
			None => self.storage.remove(NAMESPACE, WALLET_ID).await,
		}
	}
}
