use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sesame_core::SessionManager;
use sesame_link_sim::{SimConfig, SimLink};
use sesame_server::{config::ServerConfig, logging, routes};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let config = ServerConfig::parse();
	logging::init_logging(config.verbose);
	config.validate()?;

	// The BLE transport and SESAME handshake plug in behind the DeviceLink
	// trait; this binary currently ships with the simulator only.
	if !config.simulate {
		anyhow::bail!(
			"no hardware link is wired into this build yet; run with --simulate \
			 or embed sesame-core with your DeviceLink implementation"
		);
	}

	let identity = config.identity();
	info!(
		target = "sesame",
		device = %identity.address,
		model = %identity.model,
		"starting session manager"
	);

	let manager = Arc::new(SessionManager::new(
		SimLink::new(SimConfig::default()),
		identity,
		config.session(),
	));
	let _sweeper = Arc::clone(&manager).spawn_idle_sweeper();

	let app = routes::app(manager);
	let addr = format!("{}:{}", config.host, config.port);
	let listener = TcpListener::bind(&addr)
		.await
		.with_context(|| format!("Failed to bind {addr}"))?;
	info!(target = "sesame", addr, "sesame web api listening");

	axum::serve(listener, app.into_make_service())
		.await
		.context("Server error")
}
