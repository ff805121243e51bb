//! Impairment configuration for the simulated link.

use std::time::Duration;

use sesame_core::DeviceStatus;

/// Scripted behavior of a [`SimLink`](crate::SimLink).
///
/// The default is a healthy, instantly-reachable, locked device with a
/// full battery.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub initial_status: DeviceStatus,
    pub battery_percentage: u8,
    pub battery_voltage: f32,
    /// Latency added to every discovery + login.
    pub connect_latency: Duration,
    /// Latency added to every operation.
    pub operation_latency: Duration,
    /// The first N discovery attempts fail as not-found.
    pub fail_connects: u32,
    /// Every discovery attempt fails with a credential rejection.
    pub reject_auth: bool,
    /// The link drops with a transport error once this many operations
    /// have run over one handle.
    pub drop_after_operations: Option<u32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_status: DeviceStatus::Locked,
            battery_percentage: 100,
            battery_voltage: 6.2,
            connect_latency: Duration::ZERO,
            operation_latency: Duration::ZERO,
            fail_connects: 0,
            reject_auth: false,
            drop_after_operations: None,
        }
    }
}

impl SimConfig {
    /// A device that needs `n` scan attempts before it answers.
    pub fn slow_to_appear(n: u32) -> Self {
        Self {
            fail_connects: n,
            ..Self::default()
        }
    }

    /// A device whose link dies after `n` operations per connection.
    pub fn flaky_after(n: u32) -> Self {
        Self {
            drop_after_operations: Some(n),
            ..Self::default()
        }
    }

    /// A device that rejects the configured keys.
    pub fn wrong_keys() -> Self {
        Self {
            reject_auth: true,
            ..Self::default()
        }
    }
}
