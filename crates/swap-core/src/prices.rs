//! Last-known token prices for display.
//!
//! The [`PriceTracker`] merges every successful fetch into one table, so a
//! failed refresh leaves the previous prices on screen. Entries keep their
//! capture time; callers choose between a fresh price and the last known one.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use swap_pricing::PricingService;
use swap_types::{current_timestamp_ms, PriceEntry, PriceEvent, PriceTable, TokenBalance};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Interval of the background refresh.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

const EVENT_CAPACITY: usize = 64;

#[derive(Default)]
struct TrackerState {
	prices: PriceTable,
	last_updated: Option<Instant>,
}

pub struct PriceTracker {
	pricing: Arc<PricingService>,
	ttl: Duration,
	state: RwLock<TrackerState>,
	events: broadcast::Sender<PriceEvent>,
}

impl PriceTracker {
	/// Creates a tracker whose entries are fresh for the pricing cache TTL.
	pub fn new(pricing: Arc<PricingService>) -> Self {
		let ttl = pricing.cache().ttl();
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			pricing,
			ttl,
			state: RwLock::new(TrackerState::default()),
			events,
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<PriceEvent> {
		self.events.subscribe()
	}

	/// Fetches prices for `ids` and merges them into the table.
	///
	/// Returns the fetched prices. An empty result counts as a failed refresh
	/// and keeps what was known before.
	pub async fn refresh(&self, ids: &[String]) -> PriceTable {
		if ids.is_empty() {
			return PriceTable::new();
		}

		let fetched = self.pricing.get_cached_prices(ids).await;
		if fetched.is_empty() {
			warn!(tokens = ids.len(), "Price refresh returned nothing, keeping last known prices");
			let _ = self.events.send(PriceEvent::RefreshFailed);
			return fetched;
		}

		{
			let mut state = self.state.write().await;
			state
				.prices
				.extend(fetched.iter().map(|(id, entry)| (id.clone(), *entry)));
			state.last_updated = Some(Instant::now());
		}
		debug!(tokens = fetched.len(), "Prices refreshed");
		let _ = self.events.send(PriceEvent::Updated {
			prices: fetched.clone(),
		});
		fetched
	}

	/// Price of `id` if captured within the TTL.
	pub async fn fresh_price(&self, id: &str) -> Option<PriceEntry> {
		let ttl_ms = self.ttl.as_millis() as u64;
		let now_ms = current_timestamp_ms();
		self.state
			.read()
			.await
			.prices
			.get(id)
			.filter(|entry| entry.is_fresh(ttl_ms, now_ms))
			.copied()
	}

	/// Price of `id` regardless of age.
	pub async fn last_known_price(&self, id: &str) -> Option<PriceEntry> {
		self.state.read().await.prices.get(id).copied()
	}

	/// True before the first successful refresh, or once the last one is
	/// older than twice the TTL.
	pub async fn is_stale(&self) -> bool {
		match self.state.read().await.last_updated {
			Some(at) => at.elapsed() > self.ttl * 2,
			None => true,
		}
	}

	pub async fn snapshot(&self) -> PriceTable {
		self.state.read().await.prices.clone()
	}

	pub async fn usd_value(&self, amount: Decimal, id: &str) -> f64 {
		swap_pricing::usd_value(amount, id, &self.state.read().await.prices)
	}

	pub async fn price_change(&self, id: &str) -> f64 {
		swap_pricing::price_change(id, &self.state.read().await.prices)
	}

	pub async fn portfolio_value(&self, balances: &[TokenBalance]) -> f64 {
		swap_pricing::portfolio_value(balances, &self.state.read().await.prices)
	}

	/// Refreshes `ids` now and then every `interval` until the handle is
	/// aborted.
	pub fn spawn_auto_refresh(self: &Arc<Self>, ids: Vec<String>, interval: Duration) -> JoinHandle<()> {
		let tracker = Arc::clone(self);
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				tracker.refresh(&ids).await;
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use swap_pricing::MockPricingInterface;
	use swap_types::{PricingError, RateLimiter, SOL_MINT, USDC_MINT};

	fn ids() -> Vec<String> {
		vec![SOL_MINT.to_string(), USDC_MINT.to_string()]
	}

	fn table(sol: f64) -> PriceTable {
		let now = current_timestamp_ms();
		PriceTable::from([
			(SOL_MINT.to_string(), PriceEntry::new(sol, 1.5, now)),
			(USDC_MINT.to_string(), PriceEntry::new(1.0, 0.0, now)),
		])
	}

	fn tracker(mock: MockPricingInterface, ttl: Duration) -> Arc<PriceTracker> {
		let pricing = PricingService::new(
			Box::new(mock),
			ttl,
			Arc::new(RateLimiter::new("price", 100, Duration::from_secs(60))),
		);
		Arc::new(PriceTracker::new(Arc::new(pricing)))
	}

	#[tokio::test]
	async fn test_refresh_merges_and_publishes() {
		let mut mock = MockPricingInterface::new();
		mock.expect_fetch_prices()
			.times(1)
			.returning(|_| Box::pin(async { Ok(table(150.0)) }));
		let tracker = tracker(mock, Duration::from_secs(60));
		let mut rx = tracker.subscribe();
		assert!(tracker.is_stale().await);

		let fetched = tracker.refresh(&ids()).await;
		assert_eq!(fetched.len(), 2);
		assert!(!tracker.is_stale().await);
		assert_eq!(tracker.fresh_price(SOL_MINT).await.unwrap().price, 150.0);
		assert_eq!(tracker.usd_value(Decimal::from(2), SOL_MINT).await, 300.0);
		assert_eq!(tracker.price_change(SOL_MINT).await, 1.5);
		assert!(matches!(rx.try_recv(), Ok(PriceEvent::Updated { prices }) if prices.len() == 2));

		let balances = vec![TokenBalance {
			mint: USDC_MINT.to_string(),
			amount: 2_500_000,
			decimals: 6,
		}];
		assert_eq!(tracker.portfolio_value(&balances).await, 2.5);
	}

	#[tokio::test]
	async fn test_failed_refresh_keeps_last_known() {
		let mut mock = MockPricingInterface::new();
		let mut calls = 0;
		mock.expect_fetch_prices().times(2).returning(move |_| {
			calls += 1;
			let result = if calls == 1 {
				Ok(table(150.0))
			} else {
				Err(PricingError::Network("HTTP 503: Service Unavailable".into()))
			};
			Box::pin(async move { result })
		});
		// Zero TTL makes every cached table expire immediately.
		let tracker = tracker(mock, Duration::ZERO);
		tracker.refresh(&ids()).await;
		let mut rx = tracker.subscribe();

		tokio::time::sleep(Duration::from_millis(5)).await;
		assert!(tracker.refresh(&ids()).await.is_empty());
		assert!(matches!(rx.try_recv(), Ok(PriceEvent::RefreshFailed)));
		assert_eq!(tracker.last_known_price(SOL_MINT).await.unwrap().price, 150.0);
		assert_eq!(tracker.snapshot().await.len(), 2);
	}

	#[tokio::test]
	async fn test_old_entries_are_not_fresh() {
		let mut mock = MockPricingInterface::new();
		mock.expect_fetch_prices().returning(|_| {
			let old = PriceTable::from([(SOL_MINT.to_string(), PriceEntry::new(140.0, 0.0, 1_000))]);
			Box::pin(async move { Ok(old) })
		});
		let tracker = tracker(mock, Duration::from_secs(60));
		tracker.refresh(&ids()).await;

		assert!(tracker.fresh_price(SOL_MINT).await.is_none());
		assert_eq!(tracker.last_known_price(SOL_MINT).await.unwrap().price, 140.0);
		assert!(tracker.fresh_price(USDC_MINT).await.is_none());
		assert_eq!(tracker.usd_value(Decimal::ONE, USDC_MINT).await, 0.0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_stale_after_twice_ttl() {
		let mut mock = MockPricingInterface::new();
		mock.expect_fetch_prices()
			.returning(|_| Box::pin(async { Ok(table(150.0)) }));
		let tracker = tracker(mock, Duration::from_secs(60));
		tracker.refresh(&ids()).await;

		tokio::time::advance(Duration::from_secs(119)).await;
		assert!(!tracker.is_stale().await);
		tokio::time::advance(Duration::from_secs(2)).await;
		assert!(tracker.is_stale().await);
	}

	#[tokio::test(start_paused = true)]
	async fn test_auto_refresh_fetches_immediately_then_periodically() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let mut mock = MockPricingInterface::new();
		mock.expect_fetch_prices().returning(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
			Box::pin(async { Ok(table(150.0)) })
		});
		let tracker = tracker(mock, Duration::from_secs(10));

		let handle = tracker.spawn_auto_refresh(ids(), DEFAULT_REFRESH_INTERVAL);
		tokio::time::sleep(Duration::from_millis(1)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		tokio::time::sleep(Duration::from_secs(30)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 2);

		handle.abort();
		tokio::time::sleep(Duration::from_secs(90)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}
}
