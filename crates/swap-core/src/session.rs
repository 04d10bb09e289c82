//! Swap form state with persistence.
//!
//! A [`SwapSession`] holds what the user has typed into the swap form and
//! keeps the orchestrator's quote in step with it: every edit that changes
//! the quote inputs discards the held quote and asks for a new one once the
//! input settles. Token pair, slippage and deadline survive restarts through
//! the [`PreferencesStore`].

use crate::engine::SwapOrchestrator;
use crate::validation::validate_swap_params;
use rust_decimal::Decimal;
use std::sync::Arc;
use swap_storage::{PreferencesStore, SwapPreferences};
use swap_types::{SwapError, SwapParams, SwapRecord, TransactionSignature};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Values shown in the swap form.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapForm {
	pub from_token: String,
	pub to_token: String,
	/// Amount as typed; empty when nothing is entered.
	pub from_amount: String,
	/// Quoted output, six decimals; empty without a quote.
	pub to_amount: String,
	pub slippage_percent: Decimal,
	pub deadline_minutes: u32,
}

impl SwapForm {
	fn from_preferences(preferences: &SwapPreferences) -> Self {
		Self {
			from_token: preferences.from_token.clone(),
			to_token: preferences.to_token.clone(),
			from_amount: String::new(),
			to_amount: String::new(),
			slippage_percent: preferences.slippage_percent,
			deadline_minutes: preferences.deadline_minutes,
		}
	}

	pub fn params(&self) -> SwapParams {
		SwapParams::new(
			self.from_token.clone(),
			self.to_token.clone(),
			self.from_amount.clone(),
			self.slippage_percent,
		)
	}
}

struct SessionState {
	form: SwapForm,
	recent_swaps: Vec<SwapRecord>,
}

pub struct SwapSession {
	orchestrator: Arc<SwapOrchestrator>,
	preferences: PreferencesStore,
	state: RwLock<SessionState>,
}

fn format_output(amount: Decimal) -> String {
	if amount.is_zero() {
		String::new()
	} else {
		format!("{:.6}", amount.round_dp(6))
	}
}

impl SwapSession {
	/// Restores the saved form settings and history, starting from
	/// `defaults` when nothing was saved yet.
	pub async fn load(
		orchestrator: Arc<SwapOrchestrator>,
		preferences: PreferencesStore,
		defaults: SwapPreferences,
	) -> Self {
		let saved = preferences.load_or(defaults).await;
		debug!(
			from = %saved.from_token,
			to = %saved.to_token,
			recent = saved.recent_swaps.len(),
			"Swap session loaded"
		);
		Self {
			orchestrator,
			preferences,
			state: RwLock::new(SessionState {
				form: SwapForm::from_preferences(&saved),
				recent_swaps: saved.recent_swaps,
			}),
		}
	}

	pub async fn form(&self) -> SwapForm {
		self.state.read().await.form.clone()
	}

	pub async fn recent_swaps(&self) -> Vec<SwapRecord> {
		self.state.read().await.recent_swaps.clone()
	}

	async fn persist(&self) {
		let preferences = {
			let state = self.state.read().await;
			SwapPreferences {
				slippage_percent: state.form.slippage_percent,
				deadline_minutes: state.form.deadline_minutes,
				from_token: state.form.from_token.clone(),
				to_token: state.form.to_token.clone(),
				recent_swaps: state.recent_swaps.clone(),
			}
		};
		if let Err(e) = self.preferences.save(&preferences).await {
			warn!(error = %e, "Failed to save swap preferences");
		}
	}

	/// Applies an edit to the quote inputs, then persists and requotes.
	async fn edit<F>(&self, apply: F)
	where
		F: FnOnce(&mut SwapForm),
	{
		let params = {
			let mut state = self.state.write().await;
			apply(&mut state.form);
			state.form.params()
		};
		self.persist().await;

		if params.amount.trim().is_empty() {
			self.orchestrator.clear_quote().await;
		} else {
			self.orchestrator.debounced_request_quote(params).await;
		}
	}

	pub async fn set_from_token(&self, token: &str) {
		self.edit(|form| {
			form.from_token = token.to_string();
			form.to_amount.clear();
		})
		.await;
	}

	pub async fn set_to_token(&self, token: &str) {
		self.edit(|form| {
			form.to_token = token.to_string();
			form.to_amount.clear();
		})
		.await;
	}

	pub async fn set_from_amount(&self, amount: &str) {
		self.edit(|form| {
			form.from_amount = amount.to_string();
			form.to_amount.clear();
		})
		.await;
	}

	pub async fn set_slippage(&self, percent: Decimal) {
		self.edit(|form| {
			form.slippage_percent = percent;
			form.to_amount.clear();
		})
		.await;
	}

	/// Changes the deadline. The quote does not depend on it.
	pub async fn set_deadline(&self, minutes: u32) {
		self.state.write().await.form.deadline_minutes = minutes;
		self.persist().await;
	}

	/// Swaps the token pair together with the amounts.
	pub async fn switch_tokens(&self) {
		self.edit(|form| {
			std::mem::swap(&mut form.from_token, &mut form.to_token);
			std::mem::swap(&mut form.from_amount, &mut form.to_amount);
		})
		.await;
	}

	/// Copies the held quote's output into the form and returns it.
	pub async fn sync_quote_output(&self) -> String {
		let to = self.state.read().await.form.to_token.clone();
		let output = format_output(self.orchestrator.output_amount(&to).await);
		self.state.write().await.form.to_amount = output.clone();
		output
	}

	/// Tokens set and distinct, amount valid.
	pub async fn is_form_valid(&self) -> bool {
		let params = self.state.read().await.form.params();
		validate_swap_params(&params, self.orchestrator.settings().max_amount_decimals).is_ok()
	}

	pub async fn is_swap_ready(&self) -> bool {
		self.is_form_valid().await && self.orchestrator.is_swap_ready().await
	}

	/// Executes the swap for the held quote and records it in the history.
	///
	/// The amounts are cleared after a successful swap; on failure the form
	/// is left untouched so the user can retry.
	pub async fn execute(&self) -> Result<TransactionSignature, SwapError> {
		let params = self.state.read().await.form.params();
		let output = self.orchestrator.output_amount(&params.to).await;

		let signature = self.orchestrator.execute_swap().await?;

		let record = SwapRecord::success(&signature, &params, format!("{:.6}", output.round_dp(6)));
		let recent = match self.preferences.record_swap(record.clone()).await {
			Ok(recent) => recent,
			Err(e) => {
				warn!(error = %e, "Failed to record swap history");
				let mut recent = self.state.read().await.recent_swaps.clone();
				recent.insert(0, record);
				recent.truncate(swap_types::RECENT_SWAPS_LIMIT);
				recent
			},
		};

		{
			let mut state = self.state.write().await;
			state.recent_swaps = recent;
			state.form.from_amount.clear();
			state.form.to_amount.clear();
		}
		self.persist().await;
		Ok(signature)
	}

	/// Clears the amounts and the held quote.
	pub async fn reset_form(&self) {
		{
			let mut state = self.state.write().await;
			state.form.from_amount.clear();
			state.form.to_amount.clear();
		}
		self.orchestrator.clear_quote().await;
	}

	pub async fn clear_history(&self) {
		self.state.write().await.recent_swaps.clear();
		if let Err(e) = self.preferences.clear_history().await {
			warn!(error = %e, "Failed to clear swap history");
		}
	}
}
