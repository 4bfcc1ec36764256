//! Thin async wrapper around the `adb` executable.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, trace};

use crate::devices::{DeviceEntry, parse_devices};
use crate::error::{Error, Result, TransferError};

/// Budget for short adb calls (`devices`, `forward`, `getprop`, ...).
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
/// Budget for installs, shell commands and screen captures.
pub const LONG_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);
/// Default budget for a single push or pull.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Captured result of one adb invocation.
#[derive(Debug)]
pub struct AdbOutput {
	pub status: ExitStatus,
	pub stdout: Vec<u8>,
	pub stderr: Vec<u8>,
}

impl AdbOutput {
	pub fn stdout_text(&self) -> String {
		String::from_utf8_lossy(&self.stdout).into_owned()
	}

	pub fn stderr_text(&self) -> String {
		String::from_utf8_lossy(&self.stderr).into_owned()
	}

	/// stdout followed by stderr, the way a terminal would show them.
	pub fn combined_text(&self) -> String {
		let mut text = self.stdout_text();
		text.push_str(&self.stderr_text());
		text
	}
}

/// Handle to the adb executable, optionally bound to one device serial.
#[derive(Debug, Clone)]
pub struct Adb {
	program: PathBuf,
	serial: Option<String>,
	transfer_timeout: Duration,
}

impl Adb {
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			serial: None,
			transfer_timeout: TRANSFER_TIMEOUT,
		}
	}

	/// Returns a copy whose commands target `serial` (`adb -s <serial>`).
	pub fn for_serial(&self, serial: impl Into<String>) -> Self {
		Self {
			program: self.program.clone(),
			serial: Some(serial.into()),
			transfer_timeout: self.transfer_timeout,
		}
	}

	pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
		self.transfer_timeout = timeout;
		self
	}

	fn command<I, S>(&self, args: I) -> Command
	where
		I: IntoIterator<Item = S>,
		S: AsRef<OsStr>,
	{
		let mut cmd = Command::new(&self.program);
		if let Some(serial) = &self.serial {
			cmd.arg("-s").arg(serial);
		}
		cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
		cmd
	}

	/// Runs adb and captures its output without judging the exit status.
	pub async fn output<I, S>(&self, args: I, timeout: Duration) -> Result<AdbOutput>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<OsStr>,
	{
		let mut cmd = self.command(args);
		let label = describe(&cmd);
		trace!(target = "chimp", command = %label, "running adb");

		let output = match tokio::time::timeout(timeout, cmd.output()).await {
			Ok(Ok(output)) => output,
			Ok(Err(e)) => return Err(Error::LaunchFailed(format!("{}: {e}", self.program.display()))),
			Err(_) => return Err(Error::Timeout(format!("{label} did not finish within {}ms", timeout.as_millis()))),
		};

		Ok(AdbOutput {
			status: output.status,
			stdout: output.stdout,
			stderr: output.stderr,
		})
	}

	/// Runs adb and fails on a non-zero exit status.
	pub async fn run<I, S>(&self, args: I, timeout: Duration) -> Result<AdbOutput>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<OsStr>,
	{
		let args: Vec<S> = args.into_iter().collect();
		let command = args
			.first()
			.map(|a| a.as_ref().to_string_lossy().into_owned())
			.unwrap_or_default();
		let output = self.output(args, timeout).await?;
		if output.status.success() {
			Ok(output)
		} else {
			Err(Error::CommandFailed {
				command,
				status: exit_code(&output.status),
				output: output.combined_text().trim().to_string(),
			})
		}
	}

	/// Lists attached devices.
	pub async fn devices(&self) -> Result<Vec<DeviceEntry>> {
		let output = self.run(["devices"], COMMAND_TIMEOUT).await?;
		Ok(parse_devices(&output.stdout_text()))
	}

	/// Runs a shell command on the device and returns its textual output.
	pub async fn shell(&self, command: &str) -> Result<String> {
		let output = self.output(["shell", command], LONG_COMMAND_TIMEOUT).await?;
		Ok(output.combined_text())
	}

	/// Reads a system property (`getprop`), without the trailing line break.
	pub async fn getprop(&self, name: &str) -> Result<String> {
		let output = self.run(["shell", "getprop", name], COMMAND_TIMEOUT).await?;
		Ok(output.stdout_text().trim_end_matches(['\r', '\n']).to_string())
	}

	pub async fn forward(&self, local_port: u16, remote_port: u16) -> Result<()> {
		self.run(
			["forward".to_string(), format!("tcp:{local_port}"), format!("tcp:{remote_port}")],
			COMMAND_TIMEOUT,
		)
		.await?;
		Ok(())
	}

	pub async fn remove_forward(&self, local_port: u16) -> Result<()> {
		self.run(["forward".to_string(), "--remove".to_string(), format!("tcp:{local_port}")], COMMAND_TIMEOUT)
			.await?;
		Ok(())
	}

	pub async fn reboot(&self, into: Option<&str>) -> Result<()> {
		let mut args = vec!["reboot"];
		args.extend(into);
		self.run(args, COMMAND_TIMEOUT).await?;
		Ok(())
	}

	/// Installs (or reinstalls) a package; true when adb reports `Success`.
	pub async fn install(&self, apk: &Path) -> Result<bool> {
		let output = self
			.output([OsStr::new("install"), OsStr::new("-r"), apk.as_os_str()], LONG_COMMAND_TIMEOUT)
			.await?;
		let text = output.combined_text();
		debug!(target = "chimp", apk = %apk.display(), output = %text.trim(), "adb install finished");
		Ok(output.status.success() && reports_success(&text))
	}

	/// Uninstalls a package; true when adb reports `Success`.
	pub async fn uninstall(&self, package: &str) -> Result<bool> {
		let output = self.output(["uninstall", package], LONG_COMMAND_TIMEOUT).await?;
		Ok(output.status.success() && reports_success(&output.combined_text()))
	}

	/// Captures the screen as PNG bytes.
	pub async fn screencap(&self) -> Result<Vec<u8>> {
		let output = self.run(["exec-out", "screencap", "-p"], LONG_COMMAND_TIMEOUT).await?;
		Ok(output.stdout)
	}

	/// Starts `monkey --port <port>` on the device. The child lives until killed.
	pub fn spawn_monkey(&self, device_port: u16) -> Result<Child> {
		let port = device_port.to_string();
		let mut cmd = self.command(["shell", "monkey", "--port", port.as_str()]);
		cmd.stdout(Stdio::null()).stderr(Stdio::null());
		cmd.spawn()
			.map_err(|e| Error::LaunchFailed(format!("{}: {e}", self.program.display())))
	}

	/// Copies a device file to the host.
	pub async fn pull(&self, remote: &str, local: &Path) -> std::result::Result<(), TransferError> {
		self.transfer([OsStr::new("pull"), OsStr::new(remote), local.as_os_str()]).await
	}

	/// Copies a host file to the device.
	pub async fn push(&self, local: &Path, remote: &str) -> std::result::Result<(), TransferError> {
		self.transfer([OsStr::new("push"), local.as_os_str(), OsStr::new(remote)]).await
	}

	async fn transfer(&self, args: [&OsStr; 3]) -> std::result::Result<(), TransferError> {
		match self.output(args, self.transfer_timeout).await {
			Ok(output) if output.status.success() => Ok(()),
			Ok(output) => Err(classify_transfer_failure(output.combined_text().trim())),
			Err(Error::Timeout(msg)) => Err(TransferError::Timeout(msg)),
			Err(err) => Err(TransferError::Io(err.to_string())),
		}
	}
}

fn describe(cmd: &Command) -> String {
	let std_cmd = cmd.as_std();
	std::iter::once(std_cmd.get_program())
		.chain(std_cmd.get_args())
		.map(|a| a.to_string_lossy())
		.collect::<Vec<_>>()
		.join(" ")
}

fn exit_code(status: &ExitStatus) -> String {
	status
		.code()
		.map(|c| c.to_string())
		.unwrap_or_else(|| "signal".to_string())
}

fn reports_success(text: &str) -> bool {
	text.lines().any(|line| line.trim() == "Success")
}

/// Maps the message of a failed `adb push`/`adb pull` to a failure category.
pub fn classify_transfer_failure(message: &str) -> TransferError {
	let lower = message.to_lowercase();
	let rejected = [
		"device offline",
		"unauthorized",
		"no devices",
		"not found",
		"more than one device",
		"insufficient permissions for device",
	];
	let message = message.to_string();
	if lower.contains("cannot stat") || lower.contains("no such file") || lower.contains("read-only") {
		// Path problems come back through the sync service even though they look like "not found".
		TransferError::Sync(message)
	} else if rejected.iter().any(|needle| lower.contains(needle)) {
		TransferError::CommandRejected(message)
	} else if lower.contains("timed out") || lower.contains("timeout") {
		TransferError::Timeout(message)
	} else {
		TransferError::Sync(message)
	}
}
