//! Core orchestration for the swap client.
//!
//! This crate ties the boundary crates together. The [`SwapOrchestrator`]
//! runs the quote and swap lifecycle and publishes [`swap_types::SwapEvent`]s,
//! the [`SwapSession`] keeps the persisted swap form in step with it, and the
//! [`PriceTracker`] maintains last-known token prices. [`SwapClient`] builds
//! all of them from a [`swap_config::Config`].

pub mod builder;
pub mod engine;
pub mod prices;
pub mod session;
pub mod state;
pub mod validation;

pub use builder::{get_registry, BuilderError, FactoryRegistry, SwapClient};
pub use engine::event_bus::EventBus;
pub use engine::{HeldQuote, OrchestratorSettings, SwapOrchestrator};
pub use prices::PriceTracker;
pub use session::{SwapForm, SwapSession};
pub use state::{SwapStateError, SwapStateMachine};
