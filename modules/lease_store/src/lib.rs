// === PUBLIC CONTRACT ===
// Only the contract module should be public for other crates to consume
pub mod contract;

// Re-export the public contract components
pub use contract::{client, error, model};

// === MODULE WIRING ===
// Builds a ready-to-use client from configuration
pub mod config;
pub mod module;
pub use domain::clock::{Clock, ManualClock, SystemClock};
pub use module::{build_client, LeaseStoreModule};

// === INTERNAL MODULES ===
// WARNING: These modules are internal implementation details!
// They are exposed only for comprehensive testing and for the demo binary.
// Only use the `contract` module for stable public APIs.
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
