//! adb-backed implementation of the device capability traits.
//!
//! Connecting follows the same sequence as the Android SDK's monkeyrunner:
//! wait for the device in `adb devices`, forward a local port to the monkey
//! port on the device, start `monkey --port` through `adb shell`, then talk the
//! monkey line protocol over the forwarded socket. Properties, packages, files,
//! screenshots and shell commands go through adb directly.


use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chimp_protocol::{MonkeyCommand, PressType};
use chimp_runtime::monkey::DEFAULT_DEVICE_PORT;
use chimp_runtime::{Adb, MonkeyClient, TransferError};
use regex::Regex;
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::device::{Device, DeviceDriver, FileTransfer};
use crate::error::{Error, Result};
use crate::gesture::Drag;
use crate::snapshot::Snapshot;

const DEVICE_POLL_INTERVAL: Duration = Duration::from_millis(200);
const MONKEY_CONNECT_ATTEMPTS: u32 = 20;
const MONKEY_CONNECT_DELAY: Duration = Duration::from_millis(250);

/// Settings for [`AdbDriver`].
#[derive(Debug, Clone)]
pub struct AdbDriverConfig {
	/// Path to the adb executable.
	pub adb: PathBuf,
	/// Port monkey listens on inside the device.
	pub device_port: u16,
	/// Host port forwarded to `device_port`; an ephemeral port when `None`.
	pub local_port: Option<u16>,
	/// Budget for a single push or pull.
	pub transfer_timeout: Duration,
}

impl AdbDriverConfig {
	pub fn new(adb: impl Into<PathBuf>) -> Self {
		Self {
			adb: adb.into(),
			device_port: DEFAULT_DEVICE_PORT,
			local_port: None,
			transfer_timeout: chimp_runtime::adb::TRANSFER_TIMEOUT,
		}
	}
}

pub struct AdbDriver {
	adb: Adb,
	config: AdbDriverConfig,
}

impl AdbDriver {
	pub fn new(config: AdbDriverConfig) -> Self {
		let adb = Adb::new(&config.adb).with_transfer_timeout(config.transfer_timeout);
		Self { adb, config }
	}

	async fn find_device(&self, timeout: Duration, serial: &Regex) -> Result<String> {
		let deadline = Instant::now() + timeout;
		loop {
			match self.adb.devices().await {
				Ok(devices) => {
					if let Some(entry) = devices.into_iter().find(|d| d.is_online() && serial.is_match(&d.serial)) {
						return Ok(entry.serial);
					}
				}
				Err(e) => warn!(target = "chimp", error = %e, "adb devices failed"),
			}

			let now = Instant::now();
			if now >= deadline {
				return Err(Error::NoDevice {
					pattern: display_pattern(serial),
					timeout_ms: timeout.as_millis(),
				});
			}
			tokio::time::sleep(DEVICE_POLL_INTERVAL.min(deadline - now)).await;
		}
	}

	async fn open(&self, serial: String) -> Result<AdbDevice> {
		let adb = self.adb.for_serial(serial.clone());
		let local_port = match self.config.local_port {
			Some(port) => port,
			None => free_local_port()?,
		};

		adb.forward(local_port, self.config.device_port).await?;
		let mut child = match adb.spawn_monkey(self.config.device_port) {
			Ok(child) => child,
			Err(e) => {
				let _ = adb.remove_forward(local_port).await;
				return Err(e.into());
			}
		};

		let monkey = match MonkeyClient::connect(local_port, MONKEY_CONNECT_ATTEMPTS, MONKEY_CONNECT_DELAY).await {
			Ok(monkey) => monkey,
			Err(e) => {
				let _ = child.kill().await;
				let _ = adb.remove_forward(local_port).await;
				return Err(e.into());
			}
		};

		info!(target = "chimp", serial = %serial, local_port, "device session opened");
		Ok(AdbDevice {
			serial,
			sync: AdbFileTransfer { adb: adb.clone() },
			adb,
			monkey,
			monkey_process: Mutex::new(Some(child)),
			local_port,
		})
	}
}

#[async_trait]
impl DeviceDriver for AdbDriver {
	async fn wait_for_connection(&self, timeout: Duration, serial: &Regex) -> Result<Box<dyn Device>> {
		let serial = self.find_device(timeout, serial).await?;
		debug!(target = "chimp", serial = %serial, "device online");
		Ok(Box::new(self.open(serial).await?))
	}
}

/// Strips the anchors added by [`crate::serial_matcher`] for messages.
fn display_pattern(serial: &Regex) -> String {
	let raw = serial.as_str();
	raw.strip_prefix("^(?:")
		.and_then(|s| s.strip_suffix(")$"))
		.unwrap_or(raw)
		.to_string()
}

fn free_local_port() -> Result<u16> {
	let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
	Ok(listener.local_addr()?.port())
}

struct AdbFileTransfer {
	adb: Adb,
}

#[async_trait]
impl FileTransfer for AdbFileTransfer {
	async fn pull(&self, remote: &str, local: &Path) -> std::result::Result<(), TransferError> {
		self.adb.pull(remote, local).await
	}

	async fn push(&self, local: &Path, remote: &str) -> std::result::Result<(), TransferError> {
		self.adb.push(local, remote).await
	}
}

/// A device connected through adb with a live monkey session.
pub struct AdbDevice {
	serial: String,
	adb: Adb,
	sync: AdbFileTransfer,
	monkey: MonkeyClient,
	monkey_process: Mutex<Option<Child>>,
	local_port: u16,
}

impl AdbDevice {
	async fn send(&self, command: MonkeyCommand) -> Result<Option<String>> {
		Ok(self.monkey.send(&command).await?)
	}
}

/// Monkey cannot carry line breaks inside `type`, so they become Enter presses.
pub(crate) fn type_commands(text: &str) -> Vec<MonkeyCommand> {
	let mut commands = Vec::new();
	for (i, segment) in text.split('\n').enumerate() {
		if i > 0 {
			commands.push(MonkeyCommand::Press {
				key: "KEYCODE_ENTER".to_string(),
			});
		}
		if !segment.is_empty() {
			commands.push(MonkeyCommand::Type {
				text: segment.to_string(),
			});
		}
	}
	commands
}

/// Keys have no position, so `Move` maps to nothing.
pub(crate) fn key_command(key: &str, kind: PressType) -> Option<MonkeyCommand> {
	let key = key.to_string();
	match kind {
		PressType::Down => Some(MonkeyCommand::KeyDown { key }),
		PressType::Up => Some(MonkeyCommand::KeyUp { key }),
		PressType::DownAndUp => Some(MonkeyCommand::Press { key }),
		PressType::Move => None,
	}
}

pub(crate) fn touch_command(x: i32, y: i32, kind: PressType) -> MonkeyCommand {
	match kind {
		PressType::Down => MonkeyCommand::TouchDown { x, y },
		PressType::Up => MonkeyCommand::TouchUp { x, y },
		PressType::Move => MonkeyCommand::TouchMove { x, y },
		PressType::DownAndUp => MonkeyCommand::Tap { x, y },
	}
}

#[async_trait]
impl Device for AdbDevice {
	fn serial(&self) -> &str {
		&self.serial
	}

	async fn system_property(&self, name: &str) -> Result<String> {
		Ok(self.adb.getprop(name).await?)
	}

	async fn variable(&self, name: &str) -> Result<String> {
		let value = self
			.send(MonkeyCommand::GetVar {
				name: name.to_string(),
			})
			.await?;
		Ok(value.unwrap_or_default())
	}

	async fn reboot(&self, into: Option<&str>) -> Result<()> {
		Ok(self.adb.reboot(into).await?)
	}

	async fn wake(&self) -> Result<()> {
		self.send(MonkeyCommand::Wake).await?;
		Ok(())
	}

	async fn install_package(&self, apk: &Path) -> Result<bool> {
		Ok(self.adb.install(apk).await?)
	}

	async fn remove_package(&self, package: &str) -> Result<bool> {
		Ok(self.adb.uninstall(package).await?)
	}

	async fn type_text(&self, text: &str) -> Result<()> {
		for command in type_commands(text) {
			self.send(command).await?;
		}
		Ok(())
	}

	async fn press(&self, key: &str, kind: PressType) -> Result<()> {
		match key_command(key, kind) {
			Some(command) => {
				self.send(command).await?;
			}
			None => debug!(target = "chimp", key, "ignoring move for key press"),
		}
		Ok(())
	}

	async fn touch(&self, x: i32, y: i32, kind: PressType) -> Result<()> {
		self.send(touch_command(x, y, kind)).await?;
		Ok(())
	}

	async fn drag(&self, drag: Drag) -> Result<()> {
		let pause = drag.step_pause();
		self.send(MonkeyCommand::TouchDown {
			x: drag.start.x,
			y: drag.start.y,
		})
		.await?;
		for point in drag.points() {
			tokio::time::sleep(pause).await;
			self.send(MonkeyCommand::TouchMove { x: point.x, y: point.y }).await?;
		}
		self.send(MonkeyCommand::TouchUp {
			x: drag.end.x,
			y: drag.end.y,
		})
		.await?;
		Ok(())
	}

	async fn take_snapshot(&self) -> Result<Snapshot> {
		Ok(Snapshot::from_png(self.adb.screencap().await?))
	}

	async fn shell(&self, command: &str) -> Result<String> {
		Ok(self.adb.shell(command).await?)
	}

	fn file_transfer(&self) -> &dyn FileTransfer {
		&self.sync
	}

	async fn dispose(&self) {
		if let Err(e) = self.monkey.send(&MonkeyCommand::Quit).await {
			debug!(target = "chimp", serial = %self.serial, error = %e, "monkey quit failed");
		}
		if let Some(mut child) = self.monkey_process.lock().await.take() {
			let _ = child.kill().await;
		}
		if let Err(e) = self.adb.remove_forward(self.local_port).await {
			warn!(target = "chimp", serial = %self.serial, error = %e, "failed to remove port forward");
		}
		info!(target = "chimp", serial = %self.serial, "device session closed");
	}
}
