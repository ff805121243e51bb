//! Router construction and request handlers.
//!
//! The handlers are thin: translate the request into one session-manager
//! operation, render the result as an envelope. All queueing, recovery,
//! and idle accounting happens inside the manager.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::debug;

use sesame_core::{DeviceLink, Operation, SessionManager};

use crate::envelope::{ApiError, CommandResponse};

type Manager<L> = Arc<SessionManager<L>>;

/// Builds the full API router around one session manager.
pub fn app<L: DeviceLink>(manager: Manager<L>) -> Router {
	Router::new()
		.route("/", get(api_info))
		.route("/health", get(health))
		.route("/lock", post(lock::<L>))
		.route("/unlock", post(unlock::<L>))
		.route("/toggle", post(toggle::<L>))
		.route("/click", post(click::<L>))
		.route("/status", get(status::<L>))
		.route("/connect", post(connect::<L>))
		.route("/disconnect", post(disconnect::<L>))
		.route("/connection", get(connection::<L>))
		.route("/test-connection", get(test_connection::<L>))
		.with_state(manager)
}

async fn api_info() -> Json<Value> {
	Json(json!({
		"message": "SESAME Web API",
		"version": env!("CARGO_PKG_VERSION"),
		"endpoints": {
			"/lock": "Lock the device",
			"/unlock": "Unlock the device",
			"/toggle": "Toggle the lock state",
			"/click": "Click (SESAME Bot only)",
			"/status": "Read device status",
			"/connect": "Establish the device link",
			"/disconnect": "Release the device link",
			"/connection": "Session state, no device interaction",
			"/test-connection": "Probe the link with a status read",
			"/health": "Liveness check"
		}
	}))
}

// Liveness only; never touches the link.
async fn health() -> Json<Value> {
	Json(json!({ "status": "healthy", "message": "SESAME Web API is running" }))
}

async fn lock<L: DeviceLink>(
	State(manager): State<Manager<L>>,
) -> Result<Json<CommandResponse>, ApiError> {
	run_operation(&manager, Operation::Lock, "Web API Lock").await
}

async fn unlock<L: DeviceLink>(
	State(manager): State<Manager<L>>,
) -> Result<Json<CommandResponse>, ApiError> {
	run_operation(&manager, Operation::Unlock, "Web API Unlock").await
}

async fn toggle<L: DeviceLink>(
	State(manager): State<Manager<L>>,
) -> Result<Json<CommandResponse>, ApiError> {
	run_operation(&manager, Operation::Toggle, "Web API Toggle").await
}

async fn click<L: DeviceLink>(
	State(manager): State<Manager<L>>,
) -> Result<Json<CommandResponse>, ApiError> {
	run_operation(&manager, Operation::Click, "Web API Click").await
}

async fn status<L: DeviceLink>(
	State(manager): State<Manager<L>>,
) -> Result<Json<CommandResponse>, ApiError> {
	let outcome = manager.execute(Operation::Status, "Web API Status").await?;
	Ok(Json(CommandResponse::for_outcome(
		"Device status retrieved successfully",
		manager.identity(),
		&outcome,
	)))
}

async fn run_operation<L: DeviceLink>(
	manager: &SessionManager<L>,
	operation: Operation,
	history_tag: &str,
) -> Result<Json<CommandResponse>, ApiError> {
	debug!(target = "sesame.http", operation = %operation, "endpoint called");
	let outcome = manager.execute(operation, history_tag).await?;
	Ok(Json(CommandResponse::for_outcome(
		format!("Operation '{operation}' completed successfully"),
		manager.identity(),
		&outcome,
	)))
}

async fn connect<L: DeviceLink>(
	State(manager): State<Manager<L>>,
) -> Result<Json<CommandResponse>, ApiError> {
	let info = manager.connect().await?;
	Ok(Json(CommandResponse::for_connection(
		"Device connected",
		manager.identity(),
		info,
	)))
}

async fn disconnect<L: DeviceLink>(
	State(manager): State<Manager<L>>,
) -> Json<CommandResponse> {
	let info = manager.disconnect().await;
	Json(CommandResponse::for_connection(
		"Device disconnected",
		manager.identity(),
		info,
	))
}

async fn connection<L: DeviceLink>(State(manager): State<Manager<L>>) -> Json<CommandResponse> {
	Json(CommandResponse::for_connection(
		"Connection state",
		manager.identity(),
		manager.connection_info(),
	))
}

async fn test_connection<L: DeviceLink>(
	State(manager): State<Manager<L>>,
) -> Result<Json<CommandResponse>, ApiError> {
	let outcome = manager.test_connection().await?;
	Ok(Json(CommandResponse::for_outcome(
		"Connection test succeeded",
		manager.identity(),
		&outcome,
	)))
}
