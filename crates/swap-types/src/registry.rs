//! Registry trait for self-registering implementations.
//!
//! Every pluggable backend (pricing source, aggregator, wallet, delivery,
//! storage) exposes a zero-sized registry type naming the implementation
//! and handing out its factory, so services can be assembled from the
//! `primary` name found in configuration.

/// Associates an implementation name with its factory function.
pub trait ImplementationRegistry {
	/// Name used to select the implementation in configuration.
	const NAME: &'static str;

	/// Factory signature shared by all implementations of one boundary.
	type Factory;

	/// Returns the factory that builds this implementation.
	fn factory() -> Self::Factory;
}
