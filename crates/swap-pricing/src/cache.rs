//! Time-bounded cache of price tables.
//!
//! Entries are keyed by the canonical form of the requested token set, so a
//! table fetched for `[A, B]` serves `[B, A]` but never `[A]` alone.

use std::collections::HashMap;
use std::time::Duration;
use swap_types::PriceTable;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Default time-to-live of a cached table.
pub const DEFAULT_PRICE_TTL: Duration = Duration::from_millis(60_000);

struct CachedTable {
	table: PriceTable,
	stored_at: Instant,
}

/// Price tables keyed by token set, expiring after a fixed TTL.
pub struct PriceCache {
	ttl: Duration,
	entries: RwLock<HashMap<String, CachedTable>>,
}

impl Default for PriceCache {
	fn default() -> Self {
		Self::new(DEFAULT_PRICE_TTL)
	}
}

impl PriceCache {
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl,
			entries: RwLock::new(HashMap::new()),
		}
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Sorted, de-duplicated ids joined with `,`.
	pub fn cache_key(tokens: &[String]) -> String {
		let mut ids: Vec<&str> = tokens.iter().map(String::as_str).collect();
		ids.sort_unstable();
		ids.dedup();
		ids.join(",")
	}

	/// Returns the table for `tokens` if it is at most `ttl` old.
	///
	/// An expired entry is evicted.
	pub async fn get(&self, tokens: &[String]) -> Option<PriceTable> {
		let key = Self::cache_key(tokens);
		let mut entries = self.entries.write().await;
		let expired = match entries.get(&key) {
			Some(entry) if entry.stored_at.elapsed() <= self.ttl => {
				return Some(entry.table.clone());
			},
			Some(_) => true,
			None => false,
		};
		if expired {
			entries.remove(&key);
		}
		None
	}

	/// Stores `table` for `tokens`, replacing any previous entry.
	pub async fn set(&self, tokens: &[String], table: PriceTable) {
		let key = Self::cache_key(tokens);
		self.entries.write().await.insert(
			key,
			CachedTable {
				table,
				stored_at: Instant::now(),
			},
		);
	}

	/// Whether a fresh table exists for `tokens`.
	pub async fn has(&self, tokens: &[String]) -> bool {
		self.get(tokens).await.is_some()
	}

	pub async fn clear(&self) {
		self.entries.write().await.clear();
	}

	/// Number of stored entries, including ones not yet evicted.
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use swap_types::PriceEntry;

	fn ids(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	fn table(price: f64) -> PriceTable {
		PriceTable::from([("A".to_string(), PriceEntry::new(price, 0.0, 0))])
	}

	#[test]
	fn test_cache_key_is_canonical() {
		assert_eq!(PriceCache::cache_key(&ids(&["B", "A", "B"])), "A,B");
		assert_eq!(
			PriceCache::cache_key(&ids(&["A", "B"])),
			PriceCache::cache_key(&ids(&["B", "A"]))
		);
		assert_eq!(PriceCache::cache_key(&[]), "");
	}

	#[tokio::test(start_paused = true)]
	async fn test_round_trip_within_ttl() {
		let cache = PriceCache::new(Duration::from_secs(60));
		cache.set(&ids(&["A", "B"]), table(2.0)).await;

		tokio::time::advance(Duration::from_secs(60)).await;
		assert_eq!(cache.get(&ids(&["B", "A"])).await, Some(table(2.0)));
		assert!(cache.get(&ids(&["A"])).await.is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn test_expired_entry_is_evicted() {
		let cache = PriceCache::new(Duration::from_secs(60));
		cache.set(&ids(&["A"]), table(1.0)).await;
		assert_eq!(cache.len().await, 1);

		tokio::time::advance(Duration::from_millis(60_001)).await;
		assert!(!cache.has(&ids(&["A"])).await);
		assert!(cache.is_empty().await);
	}

	#[tokio::test]
	async fn test_set_overwrites_and_clear() {
		let cache = PriceCache::default();
		cache.set(&ids(&["A"]), table(1.0)).await;
		cache.set(&ids(&["A"]), table(3.0)).await;
		assert_eq!(cache.get(&ids(&["A"])).await, Some(table(3.0)));
		assert_eq!(cache.ttl(), DEFAULT_PRICE_TTL);

		cache.clear().await;
		assert!(cache.is_empty().await);
	}
}
