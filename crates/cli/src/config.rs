//! Server configuration: built-in defaults, an optional JSON file, then CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Cli;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_INIT_TIMEOUT_MS: u64 = 20_000;
/// Together with the default timeout this allows about three attempts.
pub const DEFAULT_ATTEMPT_INTERVAL_MS: u64 = 6_000;
pub const DEFAULT_PROBE_PROPERTY: &str = "ro.product.model";

/// How `init` establishes a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitPolicy {
	/// Budget used when the request carries no `timeout`.
	pub default_timeout: Duration,
	/// Pause after each connection attempt before probing.
	pub attempt_interval: Duration,
	/// System property that must read non-blank for a handle to count as live.
	pub probe_property: String,
}

impl Default for InitPolicy {
	fn default() -> Self {
		Self {
			default_timeout: Duration::from_millis(DEFAULT_INIT_TIMEOUT_MS),
			attempt_interval: Duration::from_millis(DEFAULT_ATTEMPT_INTERVAL_MS),
			probe_property: DEFAULT_PROBE_PROPERTY.to_string(),
		}
	}
}

/// On-disk configuration. Every field is optional.
///
/// ```json
/// {
///   "host": "127.0.0.1",
///   "port": 8080,
///   "adb": "/opt/android-sdk/platform-tools/adb",
///   "monkeyPort": 12345,
///   "init": { "timeoutMs": 20000, "attemptIntervalMs": 6000, "probeProperty": "ro.product.model" }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub adb: Option<PathBuf>,
	pub monkey_port: Option<u16>,
	pub local_port: Option<u16>,
	pub transfer_timeout_ms: Option<u64>,
	#[serde(default)]
	pub init: InitSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InitSection {
	pub timeout_ms: Option<u64>,
	pub attempt_interval_ms: Option<u64>,
	pub probe_property: Option<String>,
}

impl ConfigFile {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		serde_json::from_str(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
	}
}

/// Effective settings after merging every source.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
	/// Explicit adb path; discovered when `None`.
	pub adb: Option<PathBuf>,
	pub monkey_port: Option<u16>,
	pub local_port: Option<u16>,
	pub transfer_timeout: Option<Duration>,
	pub init: InitPolicy,
}

impl ServerConfig {
	/// Loads `--config` (if any) and applies CLI overrides.
	pub fn resolve(cli: &Cli) -> Result<Self> {
		let file = match &cli.config {
			Some(path) => ConfigFile::load(path)?,
			None => ConfigFile::default(),
		};
		Ok(Self::merge(cli, file))
	}

	pub fn merge(cli: &Cli, file: ConfigFile) -> Self {
		let defaults = InitPolicy::default();
		let init = InitPolicy {
			default_timeout: cli
				.init_timeout_ms
				.or(file.init.timeout_ms)
				.map(Duration::from_millis)
				.unwrap_or(defaults.default_timeout),
			attempt_interval: cli
				.attempt_interval_ms
				.or(file.init.attempt_interval_ms)
				.map(Duration::from_millis)
				.unwrap_or(defaults.attempt_interval),
			probe_property: cli
				.probe_property
				.clone()
				.or(file.init.probe_property)
				.unwrap_or(defaults.probe_property),
		};

		Self {
			host: cli.host.clone().or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
			port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
			adb: cli.adb.clone().or(file.adb),
			monkey_port: cli.monkey_port.or(file.monkey_port),
			local_port: cli.local_port.or(file.local_port),
			transfer_timeout: cli
				.transfer_timeout_ms
				.or(file.transfer_timeout_ms)
				.map(Duration::from_millis),
			init,
		}
	}
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;

	fn cli(args: &[&str]) -> Cli {
		Cli::parse_from(std::iter::once("chimp-rest").chain(args.iter().copied()))
	}

	#[test]
	fn defaults_bind_all_interfaces_on_8080() {
		let config = ServerConfig::merge(&cli(&[]), ConfigFile::default());
		assert_eq!(config.host, "0.0.0.0");
		assert_eq!(config.port, 8080);
		assert_eq!(config.init, InitPolicy::default());
		assert_eq!(config.init.default_timeout, Duration::from_secs(20));
		assert_eq!(config.init.probe_property, "ro.product.model");
	}

	#[test]
	fn flags_override_file_which_overrides_defaults() {
		let file: ConfigFile = serde_json::from_str(
			r#"{ "host": "10.0.0.2", "port": 9000, "init": { "timeoutMs": 5000, "probeProperty": "ro.serialno" } }"#,
		)
		.unwrap();
		let config = ServerConfig::merge(&cli(&["127.0.0.1", "--init-timeout-ms", "7000"]), file);

		assert_eq!(config.host, "127.0.0.1");
		assert_eq!(config.port, 9000);
		assert_eq!(config.init.default_timeout, Duration::from_millis(7000));
		assert_eq!(config.init.attempt_interval, Duration::from_millis(DEFAULT_ATTEMPT_INTERVAL_MS));
		assert_eq!(config.init.probe_property, "ro.serialno");
	}

	#[test]
	fn unknown_file_keys_are_rejected() {
		let parsed = serde_json::from_str::<ConfigFile>(r#"{ "prot": 80 }"#);
		assert!(parsed.is_err());
	}

	#[test]
	fn load_reports_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let err = ConfigFile::load(&dir.path().join("missing.json")).unwrap_err();
		assert!(err.to_string().contains("Failed to read config file"));
	}

	#[test]
	fn load_reads_json_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("chimp.json");
		std::fs::write(&path, r#"{ "monkeyPort": 23456, "transferTimeoutMs": 1000 }"#).unwrap();

		let file = ConfigFile::load(&path).unwrap();
		assert_eq!(file.monkey_port, Some(23456));
		assert_eq!(file.transfer_timeout_ms, Some(1000));
	}
}
