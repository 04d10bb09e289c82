//! Swap phase state machine.
//!
//! The orchestrator moves through Idle -> Validating -> Quoting -> Quoted ->
//! Swapping -> Settled, with SwapFailed as the failure end of a swap. Every
//! phase change is checked against a static transition table.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use swap_types::SwapPhase;
use thiserror::Error;

/// Errors raised by the swap state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapStateError {
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: SwapPhase, to: SwapPhase },
}

static TRANSITIONS: Lazy<HashMap<SwapPhase, HashSet<SwapPhase>>> = Lazy::new(|| {
	use SwapPhase::*;

	let mut m = HashMap::new();
	// A swap refused for a missing quote or wallet fails from any resting phase.
	m.insert(Idle, HashSet::from([Validating, SwapFailed]));
	// A held quote stays swappable while a refresh for the same inputs runs.
	m.insert(Validating, HashSet::from([Idle, Quoting, Swapping, SwapFailed]));
	// A newer request may supersede one still in flight.
	m.insert(Quoting, HashSet::from([Quoted, Idle, Validating, Swapping, SwapFailed]));
	m.insert(Quoted, HashSet::from([Validating, Idle, Swapping, SwapFailed]));
	m.insert(Swapping, HashSet::from([Settled, SwapFailed]));
	m.insert(Settled, HashSet::from([Validating, Idle, SwapFailed]));
	// A quote requested before a refused swap may still land.
	m.insert(SwapFailed, HashSet::from([Validating, Quoted, Idle, Swapping]));
	m
});

/// Validates and applies phase changes.
pub struct SwapStateMachine;

impl SwapStateMachine {
	/// Checks if a transition is allowed. Staying in place always is.
	pub fn is_valid_transition(from: SwapPhase, to: SwapPhase) -> bool {
		from == to
			|| TRANSITIONS
				.get(&from)
				.is_some_and(|allowed| allowed.contains(&to))
	}

	/// Moves `phase` to `to`, returning the previous phase.
	///
	/// On an invalid transition `phase` is left untouched.
	pub fn transition(phase: &mut SwapPhase, to: SwapPhase) -> Result<SwapPhase, SwapStateError> {
		let from = *phase;
		if !Self::is_valid_transition(from, to) {
			return Err(SwapStateError::InvalidTransition { from, to });
		}
		*phase = to;
		Ok(from)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use SwapPhase::*;

	#[test]
	fn test_quote_lifecycle() {
		let mut phase = Idle;
		for next in [Validating, Quoting, Quoted, Swapping, Settled, Validating] {
			SwapStateMachine::transition(&mut phase, next).unwrap();
		}
		assert_eq!(phase, Validating);
	}

	#[test]
	fn test_invalid_transition_leaves_phase() {
		let mut phase = Idle;
		assert_eq!(
			SwapStateMachine::transition(&mut phase, Swapping),
			Err(SwapStateError::InvalidTransition {
				from: Idle,
				to: Swapping
			})
		);
		assert_eq!(phase, Idle);
	}

	#[test]
	fn test_swap_cannot_be_interrupted() {
		for to in [Idle, Validating, Quoting, Quoted] {
			assert!(!SwapStateMachine::is_valid_transition(Swapping, to));
		}
		assert!(SwapStateMachine::is_valid_transition(Swapping, SwapFailed));
		assert!(SwapStateMachine::is_valid_transition(SwapFailed, Swapping));
	}

	#[test]
	fn test_refused_swap_fails_from_resting_phases() {
		for from in [Idle, Quoting, Quoted, Settled] {
			let mut phase = from;
			SwapStateMachine::transition(&mut phase, SwapFailed).unwrap();
			assert_eq!(phase, SwapFailed);
		}
		assert!(SwapStateMachine::is_valid_transition(SwapFailed, Quoted));
	}

	#[test]
	fn test_every_phase_has_an_exit() {
		for phase in [Idle, Validating, Quoting, Quoted, Swapping, Settled, SwapFailed] {
			assert!(TRANSITIONS.get(&phase).is_some_and(|next| !next.is_empty()));
		}
	}
}
