//! Capability interface of a connected device.
//!
//! These traits are the seam between request handling and the device transport:
//! - [`DeviceDriver`]: Establishes a connection to a device
//! - [`Device`]: Everything a connected device can do
//! - [`FileTransfer`]: File push/pull, reached through [`Device::file_transfer`]

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chimp_protocol::PressType;
use chimp_runtime::TransferError;
use regex::Regex;

use crate::error::Result;
use crate::gesture::Drag;
use crate::snapshot::Snapshot;

/// Establishes device connections.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
	/// Blocks until a device whose serial matches `serial` is available, or
	/// `timeout` elapses.
	///
	/// # Errors
	///
	/// Returns an error if no matching device shows up in time or the
	/// connection to it cannot be set up.
	async fn wait_for_connection(&self, timeout: Duration, serial: &Regex) -> Result<Box<dyn Device>>;
}

/// Operations available on a connected device.
#[async_trait]
pub trait Device: Send + Sync {
	/// Serial number of the connected device.
	fn serial(&self) -> &str;

	/// Reads a system property (`getprop`). Unknown properties read as empty.
	async fn system_property(&self, name: &str) -> Result<String>;

	/// Reads a monkey variable (`getvar`).
	async fn variable(&self, name: &str) -> Result<String>;

	/// Reboots into `into` (`bootloader`, `recovery`, ...) or normally when `None`.
	async fn reboot(&self, into: Option<&str>) -> Result<()>;

	async fn wake(&self) -> Result<()>;

	/// Installs a package archive from the host filesystem.
	async fn install_package(&self, apk: &Path) -> Result<bool>;

	/// Removes a package; `Ok(false)` when the device refused.
	async fn remove_package(&self, package: &str) -> Result<bool>;

	/// Types literal text as key events.
	async fn type_text(&self, text: &str) -> Result<()>;

	async fn press(&self, key: &str, kind: PressType) -> Result<()>;

	async fn touch(&self, x: i32, y: i32, kind: PressType) -> Result<()>;

	async fn drag(&self, drag: Drag) -> Result<()>;

	async fn take_snapshot(&self) -> Result<Snapshot>;

	/// Runs an arbitrary shell command and returns its raw output.
	async fn shell(&self, command: &str) -> Result<String>;

	/// File transfer capability for this device.
	fn file_transfer(&self) -> &dyn FileTransfer;

	/// Releases every resource held for this device. Called once.
	async fn dispose(&self);
}

/// Host/device file copies.
#[async_trait]
pub trait FileTransfer: Send + Sync {
	/// Copies `remote` on the device to `local` on the host.
	async fn pull(&self, remote: &str, local: &Path) -> std::result::Result<(), TransferError>;

	/// Copies `local` on the host to `remote` on the device.
	async fn push(&self, local: &Path, remote: &str) -> std::result::Result<(), TransferError>;
}

/// Compiles a serial-number pattern that must match the whole serial.
pub fn serial_matcher(pattern: &str) -> std::result::Result<Regex, regex::Error> {
	Regex::new(&format!("^(?:{pattern})$"))
}
