//! Pure data types shared across the crate.
//!
//! These are the shapes the session manager and the API layer agree on:
//! device classes, commands, and the telemetry a device reports after a
//! successful operation. No behavior here beyond conversions and the
//! per-model operation matrix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// SESAME hardware classes this service can drive.
///
/// Sesame 2/4 are lock-cylinder devices; the Bot is a button-pusher and
/// only understands `click`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductModel {
    Sesame2,
    Sesame4,
    SesameBot,
}

impl ProductModel {
    /// Returns true if this device class accepts `operation`.
    ///
    /// `status` is a read and is valid everywhere. Lock-class devices take
    /// lock/unlock/toggle; the Bot only takes click.
    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Status => true,
            Operation::Click => matches!(self, ProductModel::SesameBot),
            Operation::Lock | Operation::Unlock | Operation::Toggle => {
                matches!(self, ProductModel::Sesame2 | ProductModel::Sesame4)
            }
        }
    }

    /// Returns true for devices that report a mechanical position.
    pub fn has_position(&self) -> bool {
        matches!(self, ProductModel::Sesame2 | ProductModel::Sesame4)
    }
}

impl fmt::Display for ProductModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProductModel::Sesame2 => "sesame2",
            ProductModel::Sesame4 => "sesame4",
            ProductModel::SesameBot => "sesamebot",
        };
        f.write_str(name)
    }
}

impl FromStr for ProductModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sesame2" | "ss2" => Ok(ProductModel::Sesame2),
            "sesame4" | "ss4" => Ok(ProductModel::Sesame4),
            "sesamebot" | "bot" => Ok(ProductModel::SesameBot),
            other => Err(format!(
                "unknown product model '{other}' (expected sesame2, sesame4, or sesamebot)"
            )),
        }
    }
}

/// Commands the session manager can run against a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Lock,
    Unlock,
    Toggle,
    Click,
    Status,
}

impl Operation {
    /// Returns true if the operation changes device state.
    ///
    /// Mutating operations are recorded in the device's history with the
    /// caller-supplied tag; reads are not.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Operation::Status)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Lock => "lock",
            Operation::Unlock => "unlock",
            Operation::Toggle => "toggle",
            Operation::Click => "click",
            Operation::Status => "status",
        };
        f.write_str(name)
    }
}

/// Lock state as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Locked,
    Unlocked,
    Moving,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceStatus::Locked => "locked",
            DeviceStatus::Unlocked => "unlocked",
            DeviceStatus::Moving => "moving",
        };
        f.write_str(name)
    }
}

/// Mechanical and battery telemetry returned by a successful operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub status: DeviceStatus,
    pub battery_percentage: u8,
    pub battery_voltage: f32,
    pub is_in_lock_range: bool,
    pub is_in_unlock_range: bool,
    /// Absolute cylinder angle. Absent for the Bot, which has no cylinder.
    pub position: Option<i32>,
}

/// Identity and credential material for the one device this process owns.
///
/// Set at construction and never mutated afterwards.
#[derive(Clone)]
pub struct DeviceIdentity {
    /// BLE address or UUID used for discovery.
    pub address: String,
    /// Device secret key (hex), from the owner QR code.
    pub secret_key: String,
    /// Device public key (hex), from the owner QR code.
    pub public_key: String,
    pub model: ProductModel,
}

// Key material must not leak into logs.
impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("address", &self.address)
            .field("secret_key", &"<redacted>")
            .field("public_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}
