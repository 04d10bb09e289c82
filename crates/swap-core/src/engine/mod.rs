//! Quote and swap orchestration.
//!
//! The [`SwapOrchestrator`] owns the quote lifecycle: it validates inputs,
//! debounces quote requests, commits only the newest response, and runs a
//! swap through the aggregator, the wallet and the chain RPC. Every change a
//! view cares about is announced on the [`EventBus`].

pub mod debounce;
pub mod event_bus;

use self::debounce::Debouncer;
use self::event_bus::EventBus;
use crate::state::SwapStateMachine;
use crate::validation::{validate_quote, validate_swap_params};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use swap_account::WalletService;
use swap_aggregator::AggregatorService;
use swap_config::SwapConfig;
use swap_delivery::DeliveryService;
use swap_types::{
	from_smallest_unit, percent_to_bps, to_smallest_unit, Quote, QuoteRequest, RouteInfo,
	SwapError, SwapEvent, SwapParams, SwapPhase, SwapTransactionRequest, TokenRegistry,
	TransactionSignature,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

/// Capacity of the swap event channel.
pub const EVENT_CAPACITY: usize = 256;

/// Tunables of the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
	/// Quiet period before a debounced quote request is sent.
	pub debounce: Duration,
	/// Price impact in percent above which a quote carries a warning.
	pub price_impact_warning_pct: f64,
	/// Maximum fractional digits accepted in an input amount.
	pub max_amount_decimals: u32,
}

impl Default for OrchestratorSettings {
	fn default() -> Self {
		Self::from(&SwapConfig::default())
	}
}

impl From<&SwapConfig> for OrchestratorSettings {
	fn from(config: &SwapConfig) -> Self {
		Self {
			debounce: Duration::from_millis(config.debounce_ms),
			price_impact_warning_pct: config.price_impact_warning_pct,
			max_amount_decimals: config.max_amount_decimals,
		}
	}
}

/// The committed quote and its advisory warning.
#[derive(Debug, Clone, PartialEq)]
pub struct HeldQuote {
	pub quote: Quote,
	pub warning: Option<String>,
}

impl HeldQuote {
	/// Inputs the quote answers.
	pub fn key(&self) -> &QuoteRequest {
		&self.quote.request
	}
}

#[derive(Debug)]
struct OrchestratorState {
	phase: SwapPhase,
	held: Option<HeldQuote>,
	last_error: Option<String>,
	/// Bumped by every quote request; only the newest may commit.
	generation: u64,
	quote_in_flight: bool,
	swap_in_flight: bool,
	torn_down: bool,
}

impl Default for OrchestratorState {
	fn default() -> Self {
		Self {
			phase: SwapPhase::Idle,
			held: None,
			last_error: None,
			generation: 0,
			quote_in_flight: false,
			swap_in_flight: false,
			torn_down: false,
		}
	}
}

/// Coordinates quoting and swapping for one swap form.
pub struct SwapOrchestrator {
	aggregator: Arc<AggregatorService>,
	wallet: Arc<WalletService>,
	delivery: Arc<DeliveryService>,
	tokens: Arc<TokenRegistry>,
	settings: OrchestratorSettings,
	state: RwLock<OrchestratorState>,
	events: EventBus,
	debouncer: Debouncer,
}

impl SwapOrchestrator {
	pub fn new(
		aggregator: Arc<AggregatorService>,
		wallet: Arc<WalletService>,
		delivery: Arc<DeliveryService>,
		tokens: Arc<TokenRegistry>,
		settings: OrchestratorSettings,
		events: EventBus,
	) -> Self {
		let debouncer = Debouncer::new(settings.debounce);
		Self {
			aggregator,
			wallet,
			delivery,
			tokens,
			settings,
			state: RwLock::new(OrchestratorState::default()),
			events,
			debouncer,
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
		self.events.subscribe()
	}

	pub fn settings(&self) -> &OrchestratorSettings {
		&self.settings
	}

	fn publish(&self, event: SwapEvent) {
		// No subscribers is not an error here.
		let _ = self.events.publish(event);
	}

	/// Applies a phase change, publishing it. Invalid changes are logged
	/// and not applied.
	fn advance(&self, state: &mut OrchestratorState, to: SwapPhase) {
		match SwapStateMachine::transition(&mut state.phase, to) {
			Ok(from) if from != to => {
				debug!(from = %from, to = %to, "Swap phase changed");
				self.publish(SwapEvent::PhaseChanged { from, to });
			},
			Ok(_) => {},
			Err(e) => warn!(error = %e, "Ignoring phase change"),
		}
	}

	fn drop_quote(&self, state: &mut OrchestratorState) {
		if state.held.take().is_some() {
			self.publish(SwapEvent::QuoteCleared);
		}
	}

	/// Converts form inputs into the request a quote would answer.
	fn quote_key(&self, params: &SwapParams) -> Result<QuoteRequest, SwapError> {
		validate_swap_params(params, self.settings.max_amount_decimals)
			.map_err(|errors| SwapError::InvalidParameters(errors.join(", ")))?;

		let decimals = self.tokens.resolve(&params.from).decimals;
		let amount = to_smallest_unit(&params.amount, decimals)
			.map_err(|e| SwapError::InvalidParameters(e.to_string()))?;
		if amount == 0 {
			return Err(SwapError::InvalidParameters("Invalid amount".to_string()));
		}
		Ok(QuoteRequest::new(
			params.from.clone(),
			params.to.clone(),
			amount,
			percent_to_bps(params.slippage_percent),
		))
	}

	/// Requests a quote now.
	///
	/// A held quote for other inputs is discarded before the request is
	/// sent. While a swap runs no quote is requested and
	/// [`SwapError::SwapExecutionFailed`] is returned.
	///
	/// Returns `Ok(None)` when a newer request or shutdown superseded this
	/// one while it was in flight; its response is discarded.
	pub async fn request_quote(&self, params: &SwapParams) -> Result<Option<Quote>, SwapError> {
		let (request, generation) = {
			let mut state = self.state.write().await;
			if state.torn_down {
				return Ok(None);
			}
			if state.swap_in_flight {
				return Err(SwapError::SwapExecutionFailed(
					"A swap is already in progress".to_string(),
				));
			}
			self.advance(&mut state, SwapPhase::Validating);

			let request = match self.quote_key(params) {
				Ok(request) => request,
				Err(err) => {
					// Invalidate anything still in flight for the old inputs.
					state.generation += 1;
					state.quote_in_flight = false;
					self.drop_quote(&mut state);
					state.last_error = Some(err.to_string());
					self.advance(&mut state, SwapPhase::Idle);
					self.publish(SwapEvent::QuoteFailed {
						message: err.to_string(),
					});
					return Err(err);
				},
			};

			// A quote answers only the inputs it was requested for.
			if state.held.as_ref().is_some_and(|held| held.key() != &request) {
				self.drop_quote(&mut state);
			}
			state.generation += 1;
			state.quote_in_flight = true;
			state.last_error = None;
			self.advance(&mut state, SwapPhase::Quoting);
			(request, state.generation)
		};

		debug!(generation, amount = request.amount, "Quote request started");
		let result = self.aggregator.quote(&request).await;

		let mut state = self.state.write().await;
		if state.torn_down || state.generation != generation {
			debug!(
				generation,
				current = state.generation,
				"Dropping superseded quote response"
			);
			return Ok(None);
		}
		state.quote_in_flight = false;

		let outcome = result
			.map_err(|e| SwapError::from(e).with_context("Failed to get quote"))
			.and_then(|response| {
				let quote = Quote::from_response(request, response);
				validate_quote(&quote, self.settings.price_impact_warning_pct)
					.map(|warning| (quote, warning))
					.map_err(SwapError::QuoteRejected)
			});

		match outcome {
			Ok((quote, warning)) => {
				if let Some(warning) = &warning {
					warn!(generation, warning = %warning, "Quote accepted with warning");
				}
				state.held = Some(HeldQuote {
					quote: quote.clone(),
					warning: warning.clone(),
				});
				state.last_error = None;
				self.advance(&mut state, SwapPhase::Quoted);
				self.publish(SwapEvent::QuoteUpdated {
					quote: Box::new(quote.clone()),
					warning,
				});
				Ok(Some(quote))
			},
			Err(err) => {
				debug!(generation, error = %err, "Quote request failed");
				self.drop_quote(&mut state);
				state.last_error = Some(err.to_string());
				self.advance(&mut state, SwapPhase::Idle);
				self.publish(SwapEvent::QuoteFailed {
					message: err.to_string(),
				});
				Err(err)
			},
		}
	}

	/// Requests a quote once the inputs have been stable for the debounce
	/// period.
	///
	/// A held quote for different inputs is discarded immediately. An armed
	/// timer is replaced; a request already sent is left to complete and is
	/// superseded by generation instead.
	pub async fn debounced_request_quote(self: &Arc<Self>, params: SwapParams) {
		{
			let mut state = self.state.write().await;
			if state.torn_down {
				return;
			}
			let still_valid = match (&state.held, self.quote_key(&params)) {
				(Some(held), Ok(key)) => held.key() == &key,
				_ => false,
			};
			if !still_valid && state.held.is_some() {
				self.drop_quote(&mut state);
				if state.phase == SwapPhase::Quoted {
					self.advance(&mut state, SwapPhase::Idle);
				}
			}
		}

		let this = Arc::clone(self);
		self.debouncer.schedule(async move {
			if let Err(e) = this.request_quote(&params).await {
				debug!(error = %e, "Debounced quote request failed");
			}
		});
	}

	/// Builds, signs and broadcasts the swap for the held quote.
	pub async fn execute_swap(&self) -> Result<TransactionSignature, SwapError> {
		let address = self.wallet.address().await;

		let quote = {
			let mut state = self.state.write().await;
			if state.torn_down {
				return Err(SwapError::SwapExecutionFailed(
					"Swap client has been shut down".to_string(),
				));
			}
			if state.swap_in_flight {
				return Err(SwapError::SwapExecutionFailed(
					"A swap is already in progress".to_string(),
				));
			}
			let held = match (&state.held, &address) {
				(Some(held), Some(_)) => held.quote.clone(),
				_ => {
					let err = SwapError::SwapExecutionFailed(
						"Missing required parameters for swap".to_string(),
					);
					warn!(error = %err, "Swap refused");
					state.last_error = Some(err.to_string());
					self.advance(&mut state, SwapPhase::SwapFailed);
					self.publish(SwapEvent::SwapFailed {
						message: err.to_string(),
					});
					return Err(err);
				},
			};

			// Responses to quotes still in flight must not replace the one
			// being swapped.
			state.generation += 1;
			state.quote_in_flight = false;
			state.swap_in_flight = true;
			state.last_error = None;
			self.debouncer.cancel();
			self.advance(&mut state, SwapPhase::Swapping);
			held
		};

		let result = match &address {
			Some(address) => self.run_swap(&quote, address).await,
			None => Err(SwapError::SwapExecutionFailed(
				"Missing required parameters for swap".to_string(),
			)),
		};

		let mut state = self.state.write().await;
		state.swap_in_flight = false;
		if state.torn_down {
			return result;
		}

		match &result {
			Ok(signature) => {
				info!(signature = %signature, "Swap settled");
				state.held = None;
				self.advance(&mut state, SwapPhase::Settled);
				self.publish(SwapEvent::SwapSucceeded {
					signature: signature.clone(),
					quote: Box::new(quote),
				});
				self.publish(SwapEvent::BalancesStale);
			},
			Err(err) => {
				error!(error = %err, "Swap failed");
				state.last_error = Some(err.to_string());
				self.advance(&mut state, SwapPhase::SwapFailed);
				self.publish(SwapEvent::SwapFailed {
					message: err.to_string(),
				});
			},
		}
		result
	}

	async fn run_swap(
		&self,
		quote: &Quote,
		address: &swap_types::Address,
	) -> Result<TransactionSignature, SwapError> {
		let request = SwapTransactionRequest::new(quote.payload.clone(), address);
		let unsigned = self
			.aggregator
			.swap_transaction(&request)
			.await
			.map_err(|e| SwapError::from(e).with_context("Failed to get swap transaction"))?;
		if unsigned.payload.is_empty() {
			return Err(SwapError::SwapExecutionFailed(
				"Failed to get swap transaction".to_string(),
			));
		}

		let signed = self.wallet.sign(&unsigned).await?;
		let signature = self.delivery.broadcast(&signed).await?;
		Ok(signature)
	}

	/// Output of the held quote in units of `to`; zero without a matching
	/// quote.
	pub async fn output_amount(&self, to: &str) -> Decimal {
		let state = self.state.read().await;
		match &state.held {
			Some(held) if held.quote.request.output_mint == to => {
				from_smallest_unit(held.quote.out_amount, self.tokens.resolve(to).decimals)
			},
			_ => Decimal::ZERO,
		}
	}

	/// Least output the swap can settle for at `slippage_percent`.
	///
	/// Display only; the aggregator enforces its own threshold.
	pub async fn minimum_output(&self, to: &str, slippage_percent: Decimal) -> Decimal {
		let output = self.output_amount(to).await;
		let factor = Decimal::ONE - slippage_percent / Decimal::ONE_HUNDRED;
		(output * factor).max(Decimal::ZERO)
	}

	/// Price impact of the held quote in percent; zero without one.
	pub async fn price_impact(&self) -> f64 {
		self.state
			.read()
			.await
			.held
			.as_ref()
			.map(|held| held.quote.price_impact_pct)
			.unwrap_or(0.0)
	}

	pub async fn route_info(&self) -> RouteInfo {
		self.state
			.read()
			.await
			.held
			.as_ref()
			.map(|held| held.quote.route_info())
			.unwrap_or_default()
	}

	/// A quote is held, a wallet is connected and nothing is in flight.
	pub async fn is_swap_ready(&self) -> bool {
		let connected = self.wallet.is_connected().await;
		let state = self.state.read().await;
		connected
			&& state.held.is_some()
			&& !state.quote_in_flight
			&& !state.swap_in_flight
			&& !state.torn_down
	}

	/// Discards the held quote and the last error. Safe to call repeatedly.
	pub async fn clear_quote(&self) {
		self.debouncer.cancel();
		let mut state = self.state.write().await;
		if state.quote_in_flight {
			state.generation += 1;
			state.quote_in_flight = false;
		}
		self.drop_quote(&mut state);
		state.last_error = None;
		if matches!(
			state.phase,
			SwapPhase::Validating | SwapPhase::Quoting | SwapPhase::Quoted
		) {
			self.advance(&mut state, SwapPhase::Idle);
		}
	}

	/// Stops all pending work. Responses arriving afterwards are ignored.
	pub async fn shutdown(&self) {
		self.debouncer.cancel();
		let mut state = self.state.write().await;
		state.generation += 1;
		state.torn_down = true;
		info!("Swap orchestrator shut down");
	}

	pub async fn phase(&self) -> SwapPhase {
		self.state.read().await.phase
	}

	pub async fn held_quote(&self) -> Option<HeldQuote> {
		self.state.read().await.held.clone()
	}

	/// Error or advisory to show next to the form.
	pub async fn last_error(&self) -> Option<String> {
		let state = self.state.read().await;
		state
			.last_error
			.clone()
			.or_else(|| state.held.as_ref().and_then(|held| held.warning.clone()))
	}

	pub async fn is_quoting(&self) -> bool {
		self.state.read().await.quote_in_flight
	}

	pub async fn is_swapping(&self) -> bool {
		self.state.read().await.swap_in_flight
	}

	/// Whether a debounced quote request is still waiting to be sent.
	pub fn has_pending_quote(&self) -> bool {
		self.debouncer.is_pending()
	}
}
