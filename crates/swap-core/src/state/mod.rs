//! State management for the swap orchestrator.

pub mod swap;

pub use swap::{SwapStateError, SwapStateMachine};
