//! Response envelopes and error-to-status mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use sesame_core::{
	ConnectionInfo, DeviceIdentity, DeviceStatus, Error, ExecuteOutcome, ProductModel,
};

/// Success envelope for command endpoints. Fields that do not apply to the
/// endpoint or the device class are omitted from the JSON entirely.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
	pub success: bool,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub product_model: Option<ProductModel>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_status: Option<DeviceStatus>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub battery_percentage: Option<u8>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub battery_voltage: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub is_in_lock_range: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub is_in_unlock_range: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub position: Option<i32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub connection_reused: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reconnect_attempts: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub connection: Option<ConnectionInfo>,
}

impl CommandResponse {
	/// An envelope with only the success flag and message populated.
	pub fn minimal(message: impl Into<String>) -> Self {
		Self {
			success: true,
			message: message.into(),
			device_id: None,
			product_model: None,
			device_status: None,
			battery_percentage: None,
			battery_voltage: None,
			is_in_lock_range: None,
			is_in_unlock_range: None,
			position: None,
			connection_reused: None,
			reconnect_attempts: None,
			connection: None,
		}
	}

	/// The full envelope for a completed device operation.
	pub fn for_outcome(
		message: impl Into<String>,
		identity: &DeviceIdentity,
		outcome: &ExecuteOutcome,
	) -> Self {
		let telemetry = &outcome.telemetry;
		Self {
			device_id: Some(identity.address.clone()),
			product_model: Some(identity.model),
			device_status: Some(telemetry.status),
			battery_percentage: Some(telemetry.battery_percentage),
			battery_voltage: Some(telemetry.battery_voltage),
			is_in_lock_range: Some(telemetry.is_in_lock_range),
			is_in_unlock_range: Some(telemetry.is_in_unlock_range),
			position: telemetry.position,
			connection_reused: Some(outcome.connection_reused),
			reconnect_attempts: Some(outcome.reconnect_attempts),
			..Self::minimal(message)
		}
	}

	/// Envelope for connection-lifecycle endpoints.
	pub fn for_connection(
		message: impl Into<String>,
		identity: &DeviceIdentity,
		info: ConnectionInfo,
	) -> Self {
		Self {
			device_id: Some(identity.address.clone()),
			product_model: Some(identity.model),
			connection: Some(info),
			..Self::minimal(message)
		}
	}
}

/// A session failure rendered as an HTTP response: a status code and a
/// single descriptive error field.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		Self(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		// Caller mistakes are 400; everything device-side is an upstream
		// failure.
		let status = match &self.0 {
			Error::UnsupportedOperation { .. } => StatusCode::BAD_REQUEST,
			Error::DeviceUnreachable(_)
			| Error::AuthenticationFailed(_)
			| Error::Transport(_)
			| Error::DeviceFault(_) => StatusCode::BAD_GATEWAY,
		};
		(status, Json(json!({ "error": self.0.to_string() }))).into_response()
	}
}
