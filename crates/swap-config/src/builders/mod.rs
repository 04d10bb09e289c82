//! Builders for constructing configurations in tests and tooling.

pub mod config;
