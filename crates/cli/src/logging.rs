use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub fn init_logging(verbosity: u8) {
	// 0 = startup and warnings (per-request logs stay quiet)
	// 1 (-v) = info: connect attempts, session lifecycle
	// 2+ (-vv) = debug for chimp crates: every request, adb invocations at trace
	let filter = match verbosity {
		0 => "warn,chimp_rest=info",
		1 => "info",
		2 => "info,chimp_rest=debug,chimp=debug,chimp_runtime=debug",
		_ => "debug,chimp_runtime=trace",
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
