//! The opaque device capability the session manager drives.
//!
//! Discovery, the BLE transport, and the SESAME login handshake live behind
//! this trait. The session manager never sees radio details; it sees a
//! handle it can run operations against and must eventually give back.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DeviceIdentity, Operation, Telemetry};

/// A factory for, and executor against, one physical device link.
///
/// Implementations must be safe to share across tasks; the session manager
/// guarantees that at most one `Handle` exists at a time and that `perform`
/// is never called concurrently.
#[async_trait]
pub trait DeviceLink: Send + Sync + 'static {
    /// Open link handle. Owned exclusively by the session manager and never
    /// exposed to callers.
    type Handle: Send + 'static;

    /// Scans for the device, opens the link, and completes the login
    /// handshake, all within `timeout`.
    ///
    /// Fails with [`Error::DeviceUnreachable`](crate::Error::DeviceUnreachable)
    /// when the device does not answer in time, or
    /// [`Error::AuthenticationFailed`](crate::Error::AuthenticationFailed)
    /// when it rejects the key material.
    async fn discover_and_open(
        &self,
        identity: &DeviceIdentity,
        timeout: Duration,
    ) -> Result<Self::Handle>;

    /// Runs one operation against an open link.
    ///
    /// `history_tag` is recorded in the device's operation history for
    /// mutating operations; implementations may ignore it for reads.
    async fn perform(
        &self,
        handle: &mut Self::Handle,
        operation: Operation,
        history_tag: &str,
    ) -> Result<Telemetry>;

    /// Releases the link. Idempotent and best-effort; called on every exit
    /// path, including failure paths.
    async fn close(&self, handle: Self::Handle);
}
