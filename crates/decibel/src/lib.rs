//! Shared setup for the Decibel binaries.

pub mod dump;
pub mod observability;

pub use observability::{ObservabilityConfig, init_observability};
