use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "chimp-rest")]
#[command(about = "Control an Android device through REST calls")]
#[command(version)]
pub struct Cli {
	/// Address to bind (default 0.0.0.0)
	pub host: Option<String>,

	/// Port to listen on (default 8080)
	pub port: Option<u16>,

	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// JSON configuration file
	#[arg(long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Path to the adb executable (default: $ADB, the Android SDK, then PATH)
	#[arg(long, value_name = "PATH")]
	pub adb: Option<PathBuf>,

	/// Port the monkey service listens on inside the device
	#[arg(long, value_name = "PORT")]
	pub monkey_port: Option<u16>,

	/// Host port forwarded to the monkey port (default: any free port)
	#[arg(long, value_name = "PORT")]
	pub local_port: Option<u16>,

	/// Connect budget used when /init has no timeout parameter
	#[arg(long, value_name = "MS")]
	pub init_timeout_ms: Option<u64>,

	/// Pause between connection attempts before probing the device
	#[arg(long, value_name = "MS")]
	pub attempt_interval_ms: Option<u64>,

	/// System property that must be non-blank for a connection to count
	#[arg(long, value_name = "NAME")]
	pub probe_property: Option<String>,

	/// Budget for a single push or pull
	#[arg(long, value_name = "MS")]
	pub transfer_timeout_ms: Option<u64>,
}
