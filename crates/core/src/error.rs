//! Error types for lock session operations.

use thiserror::Error;

use crate::types::{Operation, ProductModel};

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures a session operation can surface.
///
/// The split that matters operationally is transient vs. permanent: the
/// reconnect machinery only spends attempt budget on transient failures,
/// everything else is surfaced to the caller immediately.
#[derive(Debug, Error)]
pub enum Error {
    /// Device was not found during scan, or the scan/connect timed out.
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),

    /// Device rejected the configured key material.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Link dropped or misbehaved mid-operation.
    #[error("transport error: {0}")]
    Transport(String),

    /// Operation is not valid for this device class.
    #[error("operation '{operation}' is not supported by {model}")]
    UnsupportedOperation {
        operation: Operation,
        model: ProductModel,
    },

    /// Device reported an internal fault while executing the operation.
    #[error("device fault: {0}")]
    DeviceFault(String),
}

impl Error {
    /// Returns true if retrying this failure could plausibly succeed.
    ///
    /// Scan timeouts and transport drops are retried within the attempt
    /// budget; credential rejections, unsupported operations, and device
    /// faults are terminal for the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::DeviceUnreachable(_) | Error::Transport(_))
    }

    /// Returns true if this failure should also poison the session, i.e.
    /// reconnecting with the same identity cannot help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}
