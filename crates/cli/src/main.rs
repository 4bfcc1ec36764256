use std::sync::Arc;

use anyhow::Result;
use chimp::adb::{AdbDriver, AdbDriverConfig};
use chimp_rest::{cli::Cli, config::ServerConfig, dispatcher::Dispatcher, logging, server};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		eprintln!("Error: {err:#}");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> Result<()> {
	let config = ServerConfig::resolve(&cli)?;
	let adb = chimp_runtime::locate::find_adb(config.adb.as_deref())?;
	info!(target = "chimp", adb = %adb.display(), "using adb");

	let mut driver_config = AdbDriverConfig::new(adb);
	if let Some(port) = config.monkey_port {
		driver_config.device_port = port;
	}
	driver_config.local_port = config.local_port;
	if let Some(timeout) = config.transfer_timeout {
		driver_config.transfer_timeout = timeout;
	}

	let dispatcher = Arc::new(Dispatcher::new(
		Arc::new(AdbDriver::new(driver_config)),
		config.init.clone(),
	));
	server::serve(&config, dispatcher).await
}
