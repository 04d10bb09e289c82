//! Builders for quotes and aggregator responses used in tests.

pub mod quote;

pub use quote::QuoteBuilder;
