//! Connection session management for a single SESAME lock.
//!
//! A SESAME device speaks over one exclusive, slow-to-establish BLE link.
//! This crate owns that link's lifecycle: it serializes concurrent command
//! requests against it, recovers from transient drops with bounded retry,
//! and releases the link after a configurable idle period so the radio is
//! not held hostage by a forgotten session.
//!
//! The low-level wire protocol and crypto handshake are not implemented
//! here. They sit behind the [`DeviceLink`] trait, which the
//! [`SessionManager`] drives.
//!
//! # Layering
//!
//! - [`types`] - pure data: models, operations, telemetry, identity
//! - [`error`] - failure taxonomy shared across the crate
//! - [`link`] - the opaque device capability boundary
//! - [`retry`] - pure retry/backoff decisions
//! - [`session`] - the session manager itself

pub mod error;
pub mod link;
pub mod retry;
pub mod session;
pub mod types;

pub use error::{Error, Result};
pub use link::DeviceLink;
pub use retry::{RetryDecision, RetryPolicy};
pub use session::{ConnectionInfo, ExecuteOutcome, SessionConfig, SessionManager, SessionPhase};
pub use types::{DeviceIdentity, DeviceStatus, Operation, ProductModel, Telemetry};
