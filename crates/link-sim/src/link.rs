//! The simulated device and its link handles.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use sesame_core::error::{Error, Result};
use sesame_core::{DeviceIdentity, DeviceLink, DeviceStatus, Operation, Telemetry};

use crate::config::SimConfig;

// Cylinder angles reported by lock-class devices.
const LOCKED_POSITION: i32 = 20;
const UNLOCKED_POSITION: i32 = 180;

/// Handle to one simulated connection.
///
/// `generation` identifies the connection; a handle from a dropped
/// generation is dead and every operation over it fails.
#[derive(Debug)]
pub struct SimHandle {
    generation: u64,
    operations: u32,
    has_position: bool,
}

struct SimState {
    status: DeviceStatus,
    connect_attempts: u32,
    generation: u64,
    open_handles: u32,
}

/// An in-memory SESAME device behind the [`DeviceLink`] boundary.
pub struct SimLink {
    config: SimConfig,
    state: Mutex<SimState>,
}

impl SimLink {
    pub fn new(config: SimConfig) -> Self {
        let initial_status = config.initial_status;
        Self {
            config,
            state: Mutex::new(SimState {
                status: initial_status,
                connect_attempts: 0,
                generation: 0,
                open_handles: 0,
            }),
        }
    }

    /// Total discovery attempts seen, successful or not.
    pub fn connect_attempts(&self) -> u32 {
        self.state.lock().connect_attempts
    }

    /// Handles currently open. The session manager guarantees this never
    /// exceeds one; tests assert on it.
    pub fn open_handles(&self) -> u32 {
        self.state.lock().open_handles
    }

    fn telemetry(&self, status: DeviceStatus, has_position: bool) -> Telemetry {
        let position = if has_position {
            Some(match status {
                DeviceStatus::Locked => LOCKED_POSITION,
                DeviceStatus::Unlocked => UNLOCKED_POSITION,
                DeviceStatus::Moving => (LOCKED_POSITION + UNLOCKED_POSITION) / 2,
            })
        } else {
            None
        };
        Telemetry {
            status,
            battery_percentage: self.config.battery_percentage,
            battery_voltage: self.config.battery_voltage,
            is_in_lock_range: status == DeviceStatus::Locked,
            is_in_unlock_range: status == DeviceStatus::Unlocked,
            position,
        }
    }
}

impl Default for SimLink {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

#[async_trait]
impl DeviceLink for SimLink {
    type Handle = SimHandle;

    async fn discover_and_open(
        &self,
        identity: &DeviceIdentity,
        _timeout: Duration,
    ) -> Result<SimHandle> {
        if !self.config.connect_latency.is_zero() {
            tokio::time::sleep(self.config.connect_latency).await;
        }

        let mut state = self.state.lock();
        state.connect_attempts += 1;

        if state.connect_attempts <= self.config.fail_connects {
            return Err(Error::DeviceUnreachable(format!(
                "device {} not found during scan",
                identity.address
            )));
        }
        if self.config.reject_auth {
            return Err(Error::AuthenticationFailed(
                "device rejected the session key".into(),
            ));
        }

        state.generation += 1;
        state.open_handles += 1;
        debug!(
            target = "sesame.sim",
            generation = state.generation,
            address = %identity.address,
            "simulated link opened"
        );
        Ok(SimHandle {
            generation: state.generation,
            operations: 0,
            has_position: identity.model.has_position(),
        })
    }

    async fn perform(
        &self,
        handle: &mut SimHandle,
        operation: Operation,
        history_tag: &str,
    ) -> Result<Telemetry> {
        if !self.config.operation_latency.is_zero() {
            tokio::time::sleep(self.config.operation_latency).await;
        }

        let mut state = self.state.lock();
        if handle.generation != state.generation {
            return Err(Error::Transport("link handle is stale".into()));
        }
        if let Some(budget) = self.config.drop_after_operations {
            if handle.operations >= budget {
                return Err(Error::Transport("simulated link drop".into()));
            }
        }
        handle.operations += 1;

        state.status = match operation {
            Operation::Lock => DeviceStatus::Locked,
            Operation::Unlock => DeviceStatus::Unlocked,
            Operation::Toggle => match state.status {
                DeviceStatus::Locked => DeviceStatus::Unlocked,
                DeviceStatus::Unlocked | DeviceStatus::Moving => DeviceStatus::Locked,
            },
            // A bot click pushes the button; it has no lock state of its
            // own. Status is a pure read.
            Operation::Click | Operation::Status => state.status,
        };

        if operation.is_mutating() {
            debug!(
                target = "sesame.sim",
                operation = %operation,
                history_tag,
                status = %state.status,
                "simulated operation"
            );
        }

        Ok(self.telemetry(state.status, handle.has_position))
    }

    async fn close(&self, handle: SimHandle) {
        let mut state = self.state.lock();
        if state.open_handles > 0 {
            state.open_handles -= 1;
        }
        debug!(
            target = "sesame.sim",
            generation = handle.generation,
            "simulated link closed"
        );
    }
}
