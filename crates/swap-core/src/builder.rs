//! Composition root for the swap client.
//!
//! Every boundary crate exposes its implementations through
//! `get_all_implementations()`. The [`FactoryRegistry`] collects them once;
//! [`SwapClient::from_config`] then instantiates the `primary` implementation
//! of each section and wires the services, the orchestrator, the session and
//! the price tracker together.

use crate::engine::event_bus::EventBus;
use crate::engine::{OrchestratorSettings, SwapOrchestrator, EVENT_CAPACITY};
use crate::prices::PriceTracker;
use crate::session::SwapSession;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;
use swap_account::{WalletError, WalletFactory, WalletService};
use swap_aggregator::{AggregatorFactory, AggregatorService};
use swap_config::Config;
use swap_delivery::{DeliveryError, DeliveryFactory, DeliveryService};
use swap_pricing::{PricingFactory, PricingService};
use swap_storage::{PreferencesStore, StorageFactory, StorageService, SwapPreferences};
use swap_types::{Address, RateLimiter, TokenBalance, TokenRegistry};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors that can occur while assembling the client.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Unknown {kind} implementation '{name}'. Available: [{available}]")]
	UnknownImplementation {
		kind: &'static str,
		name: String,
		available: String,
	},
	#[error("Failed to create {kind} implementation '{name}': {message}")]
	Implementation {
		kind: &'static str,
		name: String,
		message: String,
	},
}

/// Registry of every implementation factory, keyed by name.
#[derive(Default)]
pub struct FactoryRegistry {
	pub pricing: HashMap<String, PricingFactory>,
	pub aggregator: HashMap<String, AggregatorFactory>,
	pub account: HashMap<String, WalletFactory>,
	pub delivery: HashMap<String, DeliveryFactory>,
	pub storage: HashMap<String, StorageFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_pricing(&mut self, name: impl Into<String>, factory: PricingFactory) {
		self.pricing.insert(name.into(), factory);
	}

	pub fn register_aggregator(&mut self, name: impl Into<String>, factory: AggregatorFactory) {
		self.aggregator.insert(name.into(), factory);
	}

	pub fn register_account(&mut self, name: impl Into<String>, factory: WalletFactory) {
		self.account.insert(name.into(), factory);
	}

	pub fn register_delivery(&mut self, name: impl Into<String>, factory: DeliveryFactory) {
		self.delivery.insert(name.into(), factory);
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, filling it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in swap_pricing::get_all_implementations() {
			debug!("Registering pricing implementation: {}", name);
			registry.register_pricing(name, factory);
		}
		for (name, factory) in swap_aggregator::get_all_implementations() {
			debug!("Registering aggregator implementation: {}", name);
			registry.register_aggregator(name, factory);
		}
		for (name, factory) in swap_account::get_all_implementations() {
			debug!("Registering account implementation: {}", name);
			registry.register_account(name, factory);
		}
		for (name, factory) in swap_delivery::get_all_implementations() {
			debug!("Registering delivery implementation: {}", name);
			registry.register_delivery(name, factory);
		}
		for (name, factory) in swap_storage::get_all_implementations() {
			debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		registry
	})
}

/// Instantiates the `primary` implementation of one config section.
fn create<T: ?Sized, E: Display>(
	kind: &'static str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, fn(&toml::Value) -> Result<Box<T>, E>>,
) -> Result<Box<T>, BuilderError> {
	let factory = factories.get(primary).ok_or_else(|| {
		let mut available: Vec<&str> = factories.keys().map(String::as_str).collect();
		available.sort_unstable();
		BuilderError::UnknownImplementation {
			kind,
			name: primary.to_string(),
			available: available.join(", "),
		}
	})?;
	let config = implementations.get(primary).ok_or_else(|| {
		BuilderError::Config(format!("{kind}.primary '{primary}' has no configuration"))
	})?;

	let implementation = factory(config).map_err(|e| BuilderError::Implementation {
		kind,
		name: primary.to_string(),
		message: e.to_string(),
	})?;
	debug!(kind, name = %primary, "Created implementation");
	Ok(implementation)
}

/// Fully wired swap client.
pub struct SwapClient {
	config: Config,
	tokens: Arc<TokenRegistry>,
	pricing: Arc<PricingService>,
	aggregator: Arc<AggregatorService>,
	wallet: Arc<WalletService>,
	delivery: Arc<DeliveryService>,
	preferences: PreferencesStore,
	orchestrator: Arc<SwapOrchestrator>,
	session: Arc<SwapSession>,
	prices: Arc<PriceTracker>,
	price_refresh: Mutex<Option<JoinHandle<()>>>,
}

impl SwapClient {
	/// Validates `config` and builds every component from it.
	pub async fn from_config(config: Config) -> Result<Self, BuilderError> {
		config
			.validate()
			.map_err(|e| BuilderError::Config(e.to_string()))?;
		let registry = get_registry();

		let limits = &config.rate_limits;
		let quote_limiter = Arc::new(RateLimiter::from_config("quote", &limits.quote));
		let price_limiter = Arc::new(RateLimiter::from_config("price", &limits.price));
		let general_limiter = Arc::new(RateLimiter::from_config("general", &limits.general));

		let pricing = Arc::new(PricingService::new(
			create(
				"pricing",
				&config.pricing.primary,
				&config.pricing.implementations,
				&registry.pricing,
			)?,
			Duration::from_millis(config.pricing.cache_ttl_ms),
			price_limiter,
		));
		let aggregator = Arc::new(AggregatorService::new(
			create(
				"aggregator",
				&config.aggregator.primary,
				&config.aggregator.implementations,
				&registry.aggregator,
			)?,
			quote_limiter,
			general_limiter,
		));
		let wallet = Arc::new(WalletService::new(create(
			"account",
			&config.account.primary,
			&config.account.implementations,
			&registry.account,
		)?));
		let delivery = Arc::new(DeliveryService::new(create(
			"delivery",
			&config.delivery.primary,
			&config.delivery.implementations,
			&registry.delivery,
		)?));
		let storage = Arc::new(StorageService::new(create(
			"storage",
			&config.storage.primary,
			&config.storage.implementations,
			&registry.storage,
		)?));

		let tokens = Arc::new(TokenRegistry::with_defaults());
		let preferences = PreferencesStore::new(storage);
		let orchestrator = Arc::new(SwapOrchestrator::new(
			Arc::clone(&aggregator),
			Arc::clone(&wallet),
			Arc::clone(&delivery),
			Arc::clone(&tokens),
			OrchestratorSettings::from(&config.swap),
			EventBus::new(EVENT_CAPACITY),
		));

		let defaults = SwapPreferences {
			slippage_percent: config.swap.default_slippage_pct,
			deadline_minutes: config.swap.default_deadline_minutes,
			..SwapPreferences::default()
		};
		let session = Arc::new(
			SwapSession::load(Arc::clone(&orchestrator), preferences.clone(), defaults).await,
		);
		let prices = Arc::new(PriceTracker::new(Arc::clone(&pricing)));

		info!(
			pricing = %config.pricing.primary,
			aggregator = %config.aggregator.primary,
			account = %config.account.primary,
			delivery = %config.delivery.primary,
			storage = %config.storage.primary,
			"Swap client built"
		);

		Ok(Self {
			config,
			tokens,
			pricing,
			aggregator,
			wallet,
			delivery,
			preferences,
			orchestrator,
			session,
			prices,
			price_refresh: Mutex::new(None),
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn tokens(&self) -> &Arc<TokenRegistry> {
		&self.tokens
	}

	pub fn pricing(&self) -> &Arc<PricingService> {
		&self.pricing
	}

	pub fn aggregator(&self) -> &Arc<AggregatorService> {
		&self.aggregator
	}

	pub fn wallet(&self) -> &Arc<WalletService> {
		&self.wallet
	}

	pub fn delivery(&self) -> &Arc<DeliveryService> {
		&self.delivery
	}

	pub fn preferences(&self) -> &PreferencesStore {
		&self.preferences
	}

	pub fn orchestrator(&self) -> &Arc<SwapOrchestrator> {
		&self.orchestrator
	}

	pub fn session(&self) -> &Arc<SwapSession> {
		&self.session
	}

	pub fn prices(&self) -> &Arc<PriceTracker> {
		&self.prices
	}

	/// Connects the wallet and remembers it for the next start.
	pub async fn connect_wallet(&self) -> Result<Address, WalletError> {
		let address = self.wallet.connect().await?;
		if let Err(e) = self.preferences.set_last_wallet(Some(&address)).await {
			warn!(error = %e, "Failed to remember connected wallet");
		}
		Ok(address)
	}

	pub async fn disconnect_wallet(&self) -> Result<(), WalletError> {
		self.wallet.disconnect().await?;
		if let Err(e) = self.preferences.set_last_wallet(None).await {
			warn!(error = %e, "Failed to forget disconnected wallet");
		}
		self.orchestrator.clear_quote().await;
		Ok(())
	}

	/// Starts refreshing the registry's token prices in the background.
	///
	/// A running refresh is replaced.
	pub fn start_price_refresh(&self) {
		let interval = Duration::from_secs(self.config.pricing.refresh_interval_seconds);
		let handle = self.prices.spawn_auto_refresh(self.tokens.ids(), interval);
		let previous = self
			.price_refresh
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.replace(handle);
		if let Some(previous) = previous {
			previous.abort();
		}
	}

	/// Balances of the connected wallet and their total USD value.
	///
	/// Prices are refreshed alongside the balance lookup. Without a
	/// connected wallet the portfolio is empty.
	pub async fn portfolio(&self) -> Result<(Vec<TokenBalance>, f64), DeliveryError> {
		let Some(address) = self.wallet.address().await else {
			return Ok((Vec::new(), 0.0));
		};
		let ids = self.tokens.ids();
		let (balances, _) = futures::future::join(
			self.delivery.balances(&address),
			self.prices.refresh(&ids),
		)
		.await;
		let balances = balances?;
		let value = self.prices.portfolio_value(&balances).await;
		Ok((balances, value))
	}

	/// Stops background work. Later quote responses are ignored.
	pub async fn shutdown(&self) {
		let refresh = self
			.price_refresh
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		if let Some(refresh) = refresh {
			refresh.abort();
		}
		self.orchestrator.shutdown().await;
	}
}
