//! Test doubles for driving the dispatcher without a device.
//!
//! - [`FakeDriver`]: Hands out [`FakeDevice`] handles according to a script of
//!   [`ConnectOutcome`]s
//! - [`FakeDevice`]: Records every call as a [`DeviceAction`] and answers from
//!   configurable state
//!
//! # Example
//!
//! ```ignore
//! use chimp_rest::testing::{ConnectOutcome, FakeDriver};
//!
//! let driver = FakeDriver::scripted([ConnectOutcome::Blank, ConnectOutcome::Ready("Pixel 8".into())]);
//! let device = driver.device();
//! device.set_shell_output("hi\n");
//! // hand `driver` to a Dispatcher, then assert on `device.actions()`
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chimp::{Device, DeviceDriver, Drag, FileTransfer, PressType, Snapshot, TransferError};
use regex::Regex;

use crate::config::DEFAULT_PROBE_PROPERTY;

/// Serial reported by every fake device.
pub const FAKE_SERIAL: &str = "emulator-5554";

/// A call made on a [`FakeDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAction {
	Property(String),
	Variable(String),
	Reboot(Option<String>),
	Wake,
	Install(PathBuf),
	Remove(String),
	Type(String),
	Press { key: String, kind: PressType },
	Touch { x: i32, y: i32, kind: PressType },
	Drag(Drag),
	Snapshot,
	Shell(String),
	Pull { remote: String, local: PathBuf },
	Push { local: PathBuf, remote: String },
	Dispose,
}

struct DeviceState {
	actions: Mutex<Vec<DeviceAction>>,
	properties: Mutex<HashMap<String, String>>,
	variables: Mutex<HashMap<String, String>>,
	shell_output: Mutex<String>,
	shell_delay: Mutex<Duration>,
	remove_result: AtomicBool,
	fail_drag: AtomicBool,
	transfer_error: Mutex<Option<TransferError>>,
}

/// Scriptable in-memory device. Clones share state.
#[derive(Clone)]
pub struct FakeDevice {
	state: Arc<DeviceState>,
}

impl Default for FakeDevice {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeDevice {
	pub fn new() -> Self {
		Self {
			state: Arc::new(DeviceState {
				actions: Mutex::new(Vec::new()),
				properties: Mutex::new(HashMap::new()),
				variables: Mutex::new(HashMap::new()),
				shell_output: Mutex::new(String::new()),
				shell_delay: Mutex::new(Duration::ZERO),
				remove_result: AtomicBool::new(true),
				fail_drag: AtomicBool::new(false),
				transfer_error: Mutex::new(None),
			}),
		}
	}

	pub fn set_property(&self, name: &str, value: &str) {
		self.state.properties.lock().unwrap().insert(name.to_string(), value.to_string());
	}

	pub fn set_variable(&self, name: &str, value: &str) {
		self.state.variables.lock().unwrap().insert(name.to_string(), value.to_string());
	}

	pub fn set_shell_output(&self, output: &str) {
		*self.state.shell_output.lock().unwrap() = output.to_string();
	}

	/// Makes `shell` take `delay` before answering.
	pub fn set_shell_delay(&self, delay: Duration) {
		*self.state.shell_delay.lock().unwrap() = delay;
	}

	pub fn set_remove_result(&self, removed: bool) {
		self.state.remove_result.store(removed, Ordering::SeqCst);
	}

	pub fn set_fail_drag(&self, fail: bool) {
		self.state.fail_drag.store(fail, Ordering::SeqCst);
	}

	/// Makes every pull and push fail with `error`.
	pub fn set_transfer_error(&self, error: Option<TransferError>) {
		*self.state.transfer_error.lock().unwrap() = error;
	}

	pub fn actions(&self) -> Vec<DeviceAction> {
		self.state.actions.lock().unwrap().clone()
	}

	/// Number of recorded actions that are not probe reads.
	pub fn side_effects(&self) -> usize {
		self.actions()
			.iter()
			.filter(|action| !matches!(action, DeviceAction::Property(_)))
			.count()
	}

	pub fn dispose_count(&self) -> usize {
		self.actions()
			.iter()
			.filter(|action| **action == DeviceAction::Dispose)
			.count()
	}

	fn record(&self, action: DeviceAction) {
		self.state.actions.lock().unwrap().push(action);
	}
}

#[async_trait]
impl Device for FakeDevice {
	fn serial(&self) -> &str {
		FAKE_SERIAL
	}

	async fn system_property(&self, name: &str) -> chimp::Result<String> {
		self.record(DeviceAction::Property(name.to_string()));
		Ok(self.state.properties.lock().unwrap().get(name).cloned().unwrap_or_default())
	}

	async fn variable(&self, name: &str) -> chimp::Result<String> {
		self.record(DeviceAction::Variable(name.to_string()));
		Ok(self.state.variables.lock().unwrap().get(name).cloned().unwrap_or_default())
	}

	async fn reboot(&self, into: Option<&str>) -> chimp::Result<()> {
		self.record(DeviceAction::Reboot(into.map(str::to_string)));
		Ok(())
	}

	async fn wake(&self) -> chimp::Result<()> {
		self.record(DeviceAction::Wake);
		Ok(())
	}

	async fn install_package(&self, apk: &Path) -> chimp::Result<bool> {
		self.record(DeviceAction::Install(apk.to_path_buf()));
		Ok(true)
	}

	async fn remove_package(&self, package: &str) -> chimp::Result<bool> {
		self.record(DeviceAction::Remove(package.to_string()));
		Ok(self.state.remove_result.load(Ordering::SeqCst))
	}

	async fn type_text(&self, text: &str) -> chimp::Result<()> {
		self.record(DeviceAction::Type(text.to_string()));
		Ok(())
	}

	async fn press(&self, key: &str, kind: PressType) -> chimp::Result<()> {
		self.record(DeviceAction::Press {
			key: key.to_string(),
			kind,
		});
		Ok(())
	}

	async fn touch(&self, x: i32, y: i32, kind: PressType) -> chimp::Result<()> {
		self.record(DeviceAction::Touch { x, y, kind });
		Ok(())
	}

	async fn drag(&self, drag: Drag) -> chimp::Result<()> {
		self.record(DeviceAction::Drag(drag));
		if self.state.fail_drag.load(Ordering::SeqCst) {
			return Err(chimp::Error::Unsupported("drag rejected by fake device".to_string()));
		}
		Ok(())
	}

	async fn take_snapshot(&self) -> chimp::Result<Snapshot> {
		self.record(DeviceAction::Snapshot);
		// 2x2 opaque red.
		Snapshot::from_rgba(2, 2, [255, 0, 0, 255].repeat(4))
	}

	async fn shell(&self, command: &str) -> chimp::Result<String> {
		let delay = *self.state.shell_delay.lock().unwrap();
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
		self.record(DeviceAction::Shell(command.to_string()));
		Ok(self.state.shell_output.lock().unwrap().clone())
	}

	fn file_transfer(&self) -> &dyn FileTransfer {
		self
	}

	async fn dispose(&self) {
		self.record(DeviceAction::Dispose);
	}
}

#[async_trait]
impl FileTransfer for FakeDevice {
	async fn pull(&self, remote: &str, local: &Path) -> Result<(), TransferError> {
		self.record(DeviceAction::Pull {
			remote: remote.to_string(),
			local: local.to_path_buf(),
		});
		self.transfer_result()
	}

	async fn push(&self, local: &Path, remote: &str) -> Result<(), TransferError> {
		self.record(DeviceAction::Push {
			local: local.to_path_buf(),
			remote: remote.to_string(),
		});
		self.transfer_result()
	}
}

impl FakeDevice {
	fn transfer_result(&self) -> Result<(), TransferError> {
		match self.state.transfer_error.lock().unwrap().clone() {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}

/// Result of one `wait_for_connection` call on a [`FakeDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
	/// A handle whose probe property reads as the given value.
	Ready(String),
	/// A handle whose probe property reads blank.
	Blank,
	/// No device; the driver returns an error.
	Fail,
}

/// Driver that replays [`ConnectOutcome`]s. The last outcome repeats once the
/// script is exhausted.
pub struct FakeDriver {
	device: FakeDevice,
	script: Mutex<VecDeque<ConnectOutcome>>,
	last: Mutex<ConnectOutcome>,
	connects: AtomicUsize,
	probe_property: String,
}

impl Default for FakeDriver {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeDriver {
	/// A driver that always connects to a device reporting model `Pixel`.
	pub fn new() -> Self {
		Self::scripted([ConnectOutcome::Ready("Pixel".to_string())])
	}

	pub fn scripted(outcomes: impl IntoIterator<Item = ConnectOutcome>) -> Self {
		let script: VecDeque<_> = outcomes.into_iter().collect();
		let last = script.back().cloned().unwrap_or(ConnectOutcome::Fail);
		Self {
			device: FakeDevice::new(),
			script: Mutex::new(script),
			last: Mutex::new(last),
			connects: AtomicUsize::new(0),
			probe_property: DEFAULT_PROBE_PROPERTY.to_string(),
		}
	}

	/// The device every successful connection hands out.
	pub fn device(&self) -> FakeDevice {
		self.device.clone()
	}

	/// Number of `wait_for_connection` calls so far.
	pub fn connects(&self) -> usize {
		self.connects.load(Ordering::SeqCst)
	}

	fn next_outcome(&self) -> ConnectOutcome {
		let next = self.script.lock().unwrap().pop_front();
		match next {
			Some(outcome) => {
				*self.last.lock().unwrap() = outcome.clone();
				outcome
			}
			None => self.last.lock().unwrap().clone(),
		}
	}
}

#[async_trait]
impl DeviceDriver for FakeDriver {
	async fn wait_for_connection(&self, timeout: Duration, serial: &Regex) -> chimp::Result<Box<dyn Device>> {
		self.connects.fetch_add(1, Ordering::SeqCst);
		if !serial.is_match(FAKE_SERIAL) {
			return Err(chimp::Error::NoDevice {
				pattern: serial.as_str().to_string(),
				timeout_ms: timeout.as_millis(),
			});
		}

		let model = match self.next_outcome() {
			ConnectOutcome::Ready(model) => model,
			ConnectOutcome::Blank => String::new(),
			ConnectOutcome::Fail => {
				return Err(chimp::Error::NoDevice {
					pattern: serial.as_str().to_string(),
					timeout_ms: timeout.as_millis(),
				});
			}
		};
		self.device.set_property(&self.probe_property, &model);
		Ok(Box::new(self.device.clone()))
	}
}
