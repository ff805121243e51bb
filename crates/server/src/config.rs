//! Server configuration from CLI flags and environment variables.

use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use sesame_core::{DeviceIdentity, ProductModel, SessionConfig};

/// All configuration for one `sesamed` process: which device it owns, the
/// session budgets, and where to listen.
#[derive(Debug, Parser)]
#[command(name = "sesamed", version, about = "REST API server for a SESAME smart lock")]
pub struct ServerConfig {
	/// BLE address or UUID of the device.
	#[arg(long, env = "SESAME_BLE_UUID", default_value = "")]
	pub ble_uuid: String,

	/// Device secret key (hex, from the owner QR code).
	#[arg(long, env = "SESAME_SECRET_KEY", default_value = "", hide_env_values = true)]
	pub secret_key: String,

	/// Device public key (hex, from the owner QR code).
	#[arg(long, env = "SESAME_PUBLIC_KEY", default_value = "", hide_env_values = true)]
	pub public_key: String,

	/// Device class: sesame2, sesame4, or sesamebot.
	#[arg(long, env = "SESAME_PRODUCT_MODEL", default_value = "sesame2")]
	pub product_model: ProductModel,

	/// Scan/connect budget in seconds.
	#[arg(long, env = "SESAME_SCAN_DURATION", default_value_t = 15)]
	pub scan_duration: u64,

	/// Per-operation budget in seconds.
	#[arg(long, env = "SESAME_OPERATION_TIMEOUT", default_value_t = 10)]
	pub operation_timeout: u64,

	/// Idle seconds before the link is released. 0 disables expiry.
	#[arg(long, env = "SESAME_IDLE_TIMEOUT", default_value_t = 1800)]
	pub idle_timeout: u64,

	/// Reconnect attempts allowed within one recovery episode.
	#[arg(long, env = "SESAME_MAX_RECONNECT_ATTEMPTS", default_value_t = 5)]
	pub max_reconnect_attempts: u32,

	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	#[arg(long, env = "PORT", default_value_t = 8000)]
	pub port: u16,

	/// Drive a simulated device instead of real hardware.
	#[arg(long)]
	pub simulate: bool,

	/// Increase log verbosity (-v debug, -vv trace).
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}

impl ServerConfig {
	/// Rejects configurations that cannot possibly reach a device.
	pub fn validate(&self) -> anyhow::Result<()> {
		if self.simulate {
			return Ok(());
		}
		if self.ble_uuid.is_empty() {
			bail!("SESAME_BLE_UUID is required (the BLE UUID of your SESAME device)");
		}
		if self.secret_key.is_empty() || self.public_key.is_empty() {
			bail!("SESAME_SECRET_KEY and SESAME_PUBLIC_KEY are required (readable from the owner QR code)");
		}
		Ok(())
	}

	pub fn identity(&self) -> DeviceIdentity {
		let address = if self.ble_uuid.is_empty() && self.simulate {
			"simulated-device".to_string()
		} else {
			self.ble_uuid.clone()
		};
		DeviceIdentity {
			address,
			secret_key: self.secret_key.clone(),
			public_key: self.public_key.clone(),
			model: self.product_model,
		}
	}

	pub fn session(&self) -> SessionConfig {
		SessionConfig {
			connect_timeout: Duration::from_secs(self.scan_duration),
			operation_timeout: Duration::from_secs(self.operation_timeout),
			idle_timeout: Duration::from_secs(self.idle_timeout),
			max_reconnect_attempts: self.max_reconnect_attempts,
		}
	}
}
