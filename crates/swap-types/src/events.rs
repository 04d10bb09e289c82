//! Event types published to UI subscribers.
//!
//! The swap client has no ambient stores: every state change a view cares
//! about is announced on a broadcast channel as one of these events.

use serde::{Deserialize, Serialize};

use crate::{Address, PriceTable, Quote, SwapPhase, TransactionSignature};

/// Main event type encompassing all swap client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
	/// Events from the swap orchestrator.
	Swap(SwapEvent),
	/// Events from the wallet service.
	Wallet(WalletEvent),
	/// Events from the price tracker.
	Prices(PriceEvent),
}

/// Events related to quoting and swapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwapEvent {
	/// The orchestrator moved to a new phase.
	PhaseChanged { from: SwapPhase, to: SwapPhase },
	/// A new quote was committed, possibly with an advisory warning.
	QuoteUpdated {
		quote: Box<Quote>,
		warning: Option<String>,
	},
	/// A quote request failed; the held quote was cleared.
	QuoteFailed { message: String },
	/// The held quote was discarded.
	QuoteCleared,
	/// A swap was broadcast and acknowledged.
	SwapSucceeded {
		signature: TransactionSignature,
		quote: Box<Quote>,
	},
	/// A swap attempt failed.
	SwapFailed { message: String },
	/// Wallet balances changed on chain and should be reloaded.
	BalancesStale,
}

/// Wallet connection events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletEvent {
	Connected { address: Address },
	Disconnected,
	/// The wallet switched to another account without disconnecting.
	AccountChanged { address: Address },
}

/// Events from the price tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PriceEvent {
	/// Prices were refreshed; carries only the refreshed entries.
	Updated { prices: PriceTable },
	/// A refresh returned nothing and last-known prices were kept.
	RefreshFailed,
}
