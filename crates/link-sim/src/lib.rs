//! In-process simulated device link.
//!
//! [`SimLink`] implements [`sesame_core::DeviceLink`] against an in-memory
//! lock instead of a BLE radio. [`SimConfig`] controls injected
//! impairments:
//!
//! - Fail the first N discovery attempts
//! - Reject authentication outright
//! - Drop the link after N operations
//! - Connect/operation latency
//!
//! Used by the server's integration tests and by `sesamed --simulate`.

mod config;
mod link;

pub use config::SimConfig;
pub use link::{SimHandle, SimLink};
