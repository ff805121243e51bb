use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub fn init_logging(verbosity: u8) {
	// 0 = info for the service, warn below
	// 1 (-v) = debug for everything sesame
	// 2+ (-vv) = trace
	let filter = match verbosity {
		0 => "warn,sesame_server=info,sesame_core=info",
		1 => "info,sesame_server=debug,sesame_core=debug,sesame_link_sim=debug",
		_ => "trace",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
